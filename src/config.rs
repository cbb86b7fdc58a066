//! Configuration for the coordinator and block node daemons
//!
//! Defaults match the reference four-node topology: nodes `disk_1..disk_4`
//! on `http://localhost:8001..8004`, 4 KiB blocks, metadata in
//! `metadata.json`.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default block payload size in bytes (4 KiB)
pub const DEFAULT_BLOCK_SIZE: usize = 4096;

/// Default number of block nodes
pub const DEFAULT_NUM_NODES: usize = 4;

/// Smallest cluster where rotating parity is meaningful
pub const MIN_NODES: usize = 3;

/// Default declared capacity per node (1 GiB)
pub const DEFAULT_NODE_CAPACITY: u64 = 1024 * 1024 * 1024;

/// Largest accepted upload (1 GiB)
pub const DEFAULT_MAX_FILE_SIZE: usize = 1024 * 1024 * 1024;

// =============================================================================
// Node Endpoints
// =============================================================================

/// Static description of one block node, as known at coordinator start
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeEndpoint {
    /// Stable node id, e.g. `disk_1`
    pub id: String,

    /// Base URL of the node's HTTP API, e.g. `http://localhost:8001`
    pub url: String,
}

impl NodeEndpoint {
    pub fn new(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
        }
    }
}

/// Parse a node list of the form `disk_1=http://host:8001,disk_2=http://host:8002`
pub fn parse_node_list(list: &str) -> Result<Vec<NodeEndpoint>> {
    let mut nodes = Vec::new();
    for entry in list.split(',') {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }
        let (id, url) = entry.split_once('=').ok_or_else(|| {
            Error::InvalidConfig(format!("node entry '{entry}' is not of the form id=url"))
        })?;
        if id.is_empty() || url.is_empty() {
            return Err(Error::InvalidConfig(format!(
                "node entry '{entry}' has an empty id or url"
            )));
        }
        nodes.push(NodeEndpoint::new(id, url.trim_end_matches('/')));
    }
    Ok(nodes)
}

// =============================================================================
// Coordinator Configuration
// =============================================================================

/// Configuration for the RAID-5 coordinator
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Fixed block payload size in bytes; immutable for the system lifetime
    pub block_size: usize,

    /// Block nodes, in placement order
    pub nodes: Vec<NodeEndpoint>,

    /// Declared capacity per node, used until a probe reports real numbers
    pub node_capacity: u64,

    /// Path of the durable metadata document
    pub metadata_path: PathBuf,

    /// HTTP bind host
    pub host: String,

    /// HTTP bind port
    pub port: u16,

    /// Largest accepted upload in bytes
    pub max_file_size: usize,

    /// Deadline for a single block store/retrieve/delete call
    pub block_timeout: Duration,

    /// Overall deadline for one inbound upload or download
    pub request_timeout: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        let nodes = (0..DEFAULT_NUM_NODES)
            .map(|i| NodeEndpoint::new(format!("disk_{}", i + 1), format!("http://localhost:{}", 8001 + i)))
            .collect();

        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            nodes,
            node_capacity: DEFAULT_NODE_CAPACITY,
            metadata_path: PathBuf::from("metadata.json"),
            host: "0.0.0.0".to_string(),
            port: 8000,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            block_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl CoordinatorConfig {
    /// Validate the configuration before bringing the system up
    pub fn validate(&self) -> Result<()> {
        if self.block_size == 0 {
            return Err(Error::InvalidConfig("block_size must be positive".into()));
        }
        if self.nodes.len() < MIN_NODES {
            return Err(Error::InvalidConfig(format!(
                "RAID 5 needs at least {} nodes, got {}",
                MIN_NODES,
                self.nodes.len()
            )));
        }
        let mut ids: Vec<&str> = self.nodes.iter().map(|n| n.id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        if ids.len() != self.nodes.len() {
            return Err(Error::InvalidConfig("node ids must be unique".into()));
        }
        Ok(())
    }

    /// Payload carried by one stripe: one block per node minus the parity block
    pub fn stripe_payload(&self) -> usize {
        self.block_size * (self.nodes.len() - 1)
    }
}

// =============================================================================
// Block Node Configuration
// =============================================================================

/// Configuration for a single block node daemon
#[derive(Debug, Clone)]
pub struct BlockNodeConfig {
    /// HTTP bind host
    pub host: String,

    /// HTTP bind port
    pub port: u16,

    /// Directory holding one file per block
    pub storage_dir: PathBuf,

    /// Declared capacity in bytes; stores beyond this answer 507
    pub capacity: u64,
}

impl Default for BlockNodeConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8001,
            storage_dir: PathBuf::from("blocks"),
            capacity: DEFAULT_NODE_CAPACITY,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
