//! Block node cluster
//!
//! The coordinator talks to block nodes through the [`BlockStore`] port; the
//! HTTP adapter lives in [`client`]. Tests plug in in-memory implementations
//! to drive the stripe engine without a network.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::Result;

pub mod client;

pub use client::HttpBlockNode;

// =============================================================================
// Retrieve Outcome
// =============================================================================

/// Result of fetching one block from a node.
///
/// `Missing` and `Unavailable` are both "the block is not here" to the
/// recovery path; they are kept apart so logs distinguish a 404 from a node
/// that could not be reached at all.
#[derive(Debug, Clone)]
pub enum RetrieveOutcome {
    /// The node returned the block payload
    Found(Bytes),
    /// The node is reachable but does not have the block (404)
    Missing,
    /// The node is offline or the call failed
    Unavailable,
}

impl RetrieveOutcome {
    /// Extract the payload if the block was found
    pub fn into_bytes(self) -> Option<Bytes> {
        match self {
            RetrieveOutcome::Found(bytes) => Some(bytes),
            _ => None,
        }
    }
}

// =============================================================================
// Node Space
// =============================================================================

/// Last observed capacity numbers for one node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeSpace {
    /// Declared capacity in bytes
    pub capacity: u64,
    /// Bytes in use
    pub used: u64,
}

impl NodeSpace {
    pub fn new(capacity: u64) -> Self {
        Self { capacity, used: 0 }
    }

    pub fn available(&self) -> u64 {
        self.capacity.saturating_sub(self.used)
    }
}

// =============================================================================
// Block Store Port
// =============================================================================

/// One remote block store, addressed by its node id.
///
/// Liveness is a runtime cache: implementations flip it offline when I/O
/// fails and may rehabilitate it with a successful [`probe`](Self::probe)
/// before the next use. It is never persisted.
#[async_trait]
pub trait BlockStore: Send + Sync {
    /// Stable node id this store belongs to
    fn node_id(&self) -> &str;

    /// Current liveness flag
    fn is_online(&self) -> bool;

    /// Last observed capacity/used numbers
    fn space(&self) -> NodeSpace;

    /// Store a block. Errors with `NodeFull` on 507 (node stays online) and
    /// `NodeUnavailable` on transport failures or server errors.
    async fn store(&self, block_id: &str, data: Bytes) -> Result<()>;

    /// Fetch a block; never errors, the outcome carries the classification
    async fn retrieve(&self, block_id: &str) -> RetrieveOutcome;

    /// Delete a block; a missing block counts as success
    async fn delete(&self, block_id: &str) -> Result<()>;

    /// Lightweight health probe; refreshes liveness and space, returns the
    /// resulting liveness
    async fn probe(&self) -> bool;
}

// =============================================================================
// Wire Types (shared by the client and the node service)
// =============================================================================

/// Body of `POST /store`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreBlockRequest {
    pub block_id: String,
    /// Hex-encoded payload
    pub data: String,
}

/// Body of a 201 response to `POST /store`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreBlockResponse {
    pub message: String,
    pub block_id: String,
}

/// Body of a 200 response to `GET /retrieve/{block_id}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrieveBlockResponse {
    pub block_id: String,
    /// Hex-encoded payload
    pub data: String,
}

/// Body of `GET /` on a block node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeInfoResponse {
    pub message: String,
    pub storage_path: String,
    pub capacity_bytes: u64,
    pub used_space_bytes: u64,
    pub available_space_bytes: u64,
}
