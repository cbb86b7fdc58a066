//! XOR parity codec
//!
//! RAID 5 parity is a plain byte-wise XOR over the data blocks of a stripe.
//! The same operation recovers any single missing block: XOR of the
//! surviving blocks and the parity yields the lost one.

/// XOR a set of byte blocks together.
///
/// The output length equals the longest input; shorter inputs behave as if
/// right-padded with zeros. The operation is deterministic, associative and
/// commutative over the inputs. An empty input set yields an empty block.
pub fn xor_blocks<B: AsRef<[u8]>>(blocks: &[B]) -> Vec<u8> {
    let max_len = blocks.iter().map(|b| b.as_ref().len()).max().unwrap_or(0);
    let mut parity = vec![0u8; max_len];

    for block in blocks {
        for (out, byte) in parity.iter_mut().zip(block.as_ref()) {
            *out ^= byte;
        }
    }

    parity
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input_yields_empty_block() {
        let blocks: [&[u8]; 0] = [];
        assert!(xor_blocks(&blocks).is_empty());
    }

    #[test]
    fn test_single_block_is_identity() {
        assert_eq!(xor_blocks(&[b"hello"]), b"hello");
    }

    #[test]
    fn test_xor_of_equal_blocks_is_zero() {
        let parity = xor_blocks(&[b"same", b"same"]);
        assert_eq!(parity, vec![0u8; 4]);
    }

    #[test]
    fn test_shorter_inputs_are_zero_padded() {
        let parity = xor_blocks(&[&b"\x01\x02\x03"[..], &b"\x01"[..]]);
        assert_eq!(parity, vec![0x00, 0x02, 0x03]);
    }

    #[test]
    fn test_commutative() {
        let a: &[u8] = b"abcdef";
        let b: &[u8] = b"123456";
        let c: &[u8] = b"zzzzzz";
        assert_eq!(xor_blocks(&[a, b, c]), xor_blocks(&[c, a, b]));
    }

    #[test]
    fn test_associative() {
        let a: &[u8] = b"abcdef";
        let b: &[u8] = b"123456";
        let c: &[u8] = b"zzzzzz";
        let left = xor_blocks(&[xor_blocks(&[a, b]).as_slice(), c]);
        let right = xor_blocks(&[a, xor_blocks(&[b, c]).as_slice()]);
        assert_eq!(left, right);
    }

    #[test]
    fn test_parity_recovers_missing_block() {
        let blocks: Vec<Vec<u8>> = vec![b"AAAAAAAA".to_vec(), b"BBBBBBBB".to_vec(), b"CCCCCCCC".to_vec()];
        let parity = xor_blocks(&blocks);

        // Drop block 1, recover it from the siblings plus parity
        let survivors = [blocks[0].as_slice(), blocks[2].as_slice(), parity.as_slice()];
        assert_eq!(xor_blocks(&survivors), blocks[1]);
    }
}
