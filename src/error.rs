//! Error types for the stripe store

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the stripe store
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Malformed request from a caller
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Hex payload on the node wire could not be decoded
    #[error("Invalid hex data: {0}")]
    InvalidHex(String),

    /// No file with the given id
    #[error("File not found: {0}")]
    FileNotFound(String),

    /// No block with the given id on the node that should hold it
    #[error("Block not found: {0}")]
    BlockNotFound(String),

    // =========================================================================
    // Node I/O Errors
    // =========================================================================
    /// A block node could not be reached or answered with a server error
    #[error("Node {node_id} unavailable: {reason}")]
    NodeUnavailable { node_id: String, reason: String },

    /// A block node rejected a store because it is out of space
    #[error("Node {node_id} has insufficient storage")]
    NodeFull { node_id: String },

    /// This node cannot fit the block (node-service side of `NodeFull`)
    #[error("Insufficient storage: need {needed} bytes, {available} available")]
    StorageFull { needed: u64, available: u64 },

    /// A block write failed during an upload
    #[error("Failed to write block {block_id} to node {node_id}: {reason}")]
    BlockWriteFailed {
        block_id: String,
        node_id: String,
        reason: String,
    },

    // =========================================================================
    // Degraded Read Errors
    // =========================================================================
    /// More than one block of a stripe is unavailable; XOR parity cannot help
    #[error("Stripe {stripe_index} has {missing} blocks unavailable, cannot reconstruct")]
    UnrecoverableStripe { stripe_index: usize, missing: usize },

    // =========================================================================
    // Metadata Errors
    // =========================================================================
    /// The metadata document exists but cannot be parsed; refuse to start
    #[error("Metadata document {path} is corrupt: {reason}")]
    MetadataCorrupt { path: String, reason: String },

    /// Operation exceeded its deadline
    #[error("Operation timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}
