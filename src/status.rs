//! Status and introspection
//!
//! Operator-facing views: cluster-level liveness and capacity, and the full
//! per-block placement of every file.

use std::collections::BTreeMap;

use futures::future::join_all;
use serde::{Deserialize, Serialize};

use crate::cluster::BlockStore;
use crate::metadata::BlockKind;
use crate::raid::StripeEngine;

// =============================================================================
// System Status
// =============================================================================

/// Aggregate view of the cluster
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemStatus {
    pub total_nodes: usize,
    pub online_nodes: usize,
    pub offline_nodes: usize,
    pub total_space: u64,
    pub used_space: u64,
    pub available_space: u64,
    /// Per-node liveness, `online` or `offline`
    pub node_status: BTreeMap<String, String>,
    pub raid_level: String,
}

// =============================================================================
// Block Status
// =============================================================================

/// Placement of one block
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockStatus {
    pub block_id: String,
    pub node_id: String,
    #[serde(rename = "type")]
    pub kind: BlockKind,
}

/// Full placement of one file, blocks sorted by id
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileBlockStatus {
    pub file_id: String,
    pub filename: String,
    pub blocks: Vec<BlockStatus>,
}

// =============================================================================
// Aggregation
// =============================================================================

impl StripeEngine {
    /// Probe every node, then aggregate liveness and space
    pub async fn system_status(&self) -> SystemStatus {
        join_all(self.nodes().iter().map(|node| node.probe())).await;

        let total_nodes = self.num_nodes();
        let online_nodes = self.nodes().iter().filter(|node| node.is_online()).count();

        let mut total_space = 0u64;
        let mut used_space = 0u64;
        let mut node_status = BTreeMap::new();
        for node in self.nodes() {
            let space = node.space();
            total_space += space.capacity;
            used_space += space.used;
            let liveness = if node.is_online() { "online" } else { "offline" };
            node_status.insert(node.node_id().to_string(), liveness.to_string());
        }

        SystemStatus {
            total_nodes,
            online_nodes,
            offline_nodes: total_nodes - online_nodes,
            total_space,
            used_space,
            available_space: total_space.saturating_sub(used_space),
            node_status,
            raid_level: "RAID 5".to_string(),
        }
    }

    /// Every file with its per-block placement, sorted by filename then
    /// file-id for stable output; blocks sorted by block-id
    pub async fn block_status(&self) -> Vec<FileBlockStatus> {
        let mut files = self.list_files().await;
        files.sort_by(|a, b| {
            a.filename
                .cmp(&b.filename)
                .then_with(|| a.file_id.cmp(&b.file_id))
        });

        files
            .into_iter()
            .map(|metadata| {
                let mut blocks: Vec<BlockStatus> = metadata
                    .all_blocks()
                    .map(|(location, kind)| BlockStatus {
                        block_id: location.block_id.clone(),
                        node_id: location.node_id.clone(),
                        kind,
                    })
                    .collect();
                blocks.sort_by(|a, b| a.block_id.cmp(&b.block_id));

                FileBlockStatus {
                    file_id: metadata.file_id,
                    filename: metadata.filename,
                    blocks,
                }
            })
            .collect()
    }
}

// =============================================================================
// Tests
// =============================================================================
