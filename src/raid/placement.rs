//! Placement policy
//!
//! Maps a global stripe number to node indices and generates block ids.
//! Parity rotates over the nodes with the global stripe counter, which is
//! persisted with the metadata so rotation continues across restarts and
//! upload boundaries.

/// Node index that holds the parity block of global stripe `stripe_number`
pub fn parity_node_index(stripe_number: u64, num_nodes: usize) -> usize {
    (stripe_number % num_nodes as u64) as usize
}

/// Node indices that hold the data blocks of global stripe `stripe_number`,
/// in ascending order. The j-th data block of the stripe lands on the j-th
/// entry.
pub fn data_node_indices(stripe_number: u64, num_nodes: usize) -> Vec<usize> {
    let parity = parity_node_index(stripe_number, num_nodes);
    (0..num_nodes).filter(|&i| i != parity).collect()
}

/// Block id for the `data_index`-th data block of the file's
/// `stripe_index`-th stripe. Indices are per-file, not global.
pub fn data_block_id(file_id: &str, stripe_index: usize, data_index: usize) -> String {
    format!("{file_id}_block_{stripe_index}_{data_index}")
}

/// Block id for the parity block of the file's `stripe_index`-th stripe
pub fn parity_block_id(file_id: &str, stripe_index: usize) -> String {
    format!("{file_id}_block_parity_{stripe_index}")
}

// =============================================================================
// Tests
// =============================================================================
