//! Property-based tests for the parity codec and placement policy

use proptest::prelude::*;

use crate::raid::parity::xor_blocks;
use crate::raid::placement::{data_node_indices, parity_node_index};

proptest! {
    /// XOR of all data blocks plus the parity is always zero
    #[test]
    fn parity_xors_to_zero(blocks in prop::collection::vec(
        prop::collection::vec(any::<u8>(), 0..64), 1..6
    )) {
        let parity = xor_blocks(&blocks);
        let mut all: Vec<&[u8]> = blocks.iter().map(|b| b.as_slice()).collect();
        all.push(parity.as_slice());
        let folded = xor_blocks(&all);
        prop_assert!(folded.iter().all(|&b| b == 0));
    }

    /// Any single dropped block is recovered by XOR of the survivors
    #[test]
    fn any_single_block_recovers(
        blocks in prop::collection::vec(prop::collection::vec(any::<u8>(), 16..17), 2..6),
        lost_seed in any::<usize>(),
    ) {
        let lost = lost_seed % blocks.len();
        let parity = xor_blocks(&blocks);

        let mut survivors: Vec<&[u8]> = blocks
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != lost)
            .map(|(_, b)| b.as_slice())
            .collect();
        survivors.push(parity.as_slice());

        prop_assert_eq!(xor_blocks(&survivors), blocks[lost].clone());
    }

    /// Output length always equals the longest input
    #[test]
    fn output_length_is_max_input(blocks in prop::collection::vec(
        prop::collection::vec(any::<u8>(), 0..64), 0..6
    )) {
        let max_len = blocks.iter().map(Vec::len).max().unwrap_or(0);
        prop_assert_eq!(xor_blocks(&blocks).len(), max_len);
    }

    /// Every stripe layout uses each node exactly once
    #[test]
    fn placement_covers_all_nodes(stripe in any::<u64>(), num_nodes in 3usize..12) {
        let mut all = data_node_indices(stripe, num_nodes);
        all.push(parity_node_index(stripe, num_nodes));
        all.sort_unstable();
        let expected: Vec<usize> = (0..num_nodes).collect();
        prop_assert_eq!(all, expected);
    }
}
