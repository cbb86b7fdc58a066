//! Stripe engine — write path
//!
//! Splits an uploaded file into stripes of `(N-1) * block_size` payload,
//! computes one parity block per stripe, fans the N block writes out to the
//! nodes in parallel, and commits metadata only after every stripe landed.
//! A file is visible if and only if its metadata commit succeeded; on any
//! block-write failure the engine deletes already-written blocks best-effort
//! and fails the upload as a whole.

use std::collections::BTreeMap;
use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use futures::future::join_all;
use tracing::{debug, info, instrument, warn};

use crate::cluster::BlockStore;
use crate::config::MIN_NODES;
use crate::error::{Error, Result};
use crate::metadata::{BlockLocation, FileMetadata, MetadataStore, StripeDescriptor};
use crate::raid::parity::xor_blocks;
use crate::raid::placement::{
    data_block_id, data_node_indices, parity_block_id, parity_node_index,
};

/// RAID-5 striping engine over a fixed set of block nodes
pub struct StripeEngine {
    block_size: usize,
    nodes: Vec<Arc<dyn BlockStore>>,
    node_index: BTreeMap<String, usize>,
    store: Arc<MetadataStore>,
}

impl StripeEngine {
    /// Create an engine over the given nodes, in placement order
    pub fn new(
        block_size: usize,
        nodes: Vec<Arc<dyn BlockStore>>,
        store: Arc<MetadataStore>,
    ) -> Result<Self> {
        if block_size == 0 {
            return Err(Error::InvalidConfig("block_size must be positive".into()));
        }
        if nodes.len() < MIN_NODES {
            return Err(Error::InvalidConfig(format!(
                "RAID 5 needs at least {MIN_NODES} nodes, got {}",
                nodes.len()
            )));
        }

        let node_index = nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (node.node_id().to_string(), i))
            .collect();

        Ok(Self {
            block_size,
            nodes,
            node_index,
            store,
        })
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Payload carried by one stripe
    pub fn stripe_payload(&self) -> usize {
        self.block_size * (self.nodes.len() - 1)
    }

    pub(crate) fn nodes(&self) -> &[Arc<dyn BlockStore>] {
        &self.nodes
    }

    pub(crate) fn node_by_id(&self, node_id: &str) -> Option<&Arc<dyn BlockStore>> {
        self.node_index.get(node_id).map(|&i| &self.nodes[i])
    }

    pub fn metadata_store(&self) -> &Arc<MetadataStore> {
        &self.store
    }

    // =========================================================================
    // Upload
    // =========================================================================

    /// Store a file: stripe, compute parity, fan out, commit metadata.
    /// Returns the committed record.
    #[instrument(skip(self, content), fields(size = content.len()))]
    pub async fn store_file(&self, filename: &str, content: &[u8]) -> Result<FileMetadata> {
        if filename.is_empty() {
            return Err(Error::InvalidRequest("file must have a name".into()));
        }

        let file_id = uuid::Uuid::new_v4().to_string();
        let payload = self.stripe_payload();
        let mut stripes: Vec<StripeDescriptor> = Vec::new();

        for (stripe_index, chunk) in content.chunks(payload).enumerate() {
            let data_blocks = split_stripe(chunk, self.block_size, self.nodes.len() - 1);
            let parity = Bytes::from(xor_blocks(&data_blocks));

            // The global counter drives parity rotation; it is persisted with
            // the metadata commit below, before the upload is acknowledged.
            let stripe_number = self.store.advance_stripe_counter().await;
            let parity_node = parity_node_index(stripe_number, self.nodes.len());
            let data_nodes = data_node_indices(stripe_number, self.nodes.len());

            let descriptor = StripeDescriptor {
                stripe_index,
                data: data_nodes
                    .iter()
                    .enumerate()
                    .map(|(j, &node)| {
                        BlockLocation::new(
                            data_block_id(&file_id, stripe_index, j),
                            self.nodes[node].node_id(),
                        )
                    })
                    .collect(),
                parity: BlockLocation::new(
                    parity_block_id(&file_id, stripe_index),
                    self.nodes[parity_node].node_id(),
                ),
            };

            let mut writes: Vec<(usize, String, Bytes)> = data_nodes
                .iter()
                .enumerate()
                .map(|(j, &node)| (node, descriptor.data[j].block_id.clone(), data_blocks[j].clone()))
                .collect();
            writes.push((parity_node, descriptor.parity.block_id.clone(), parity));

            stripes.push(descriptor);

            let results = join_all(writes.into_iter().map(|(node, block_id, payload)| {
                let node = Arc::clone(&self.nodes[node]);
                async move {
                    node.store(&block_id, payload).await.map_err(|e| match e {
                        Error::NodeFull { .. } => e,
                        Error::NodeUnavailable { node_id, reason } => Error::BlockWriteFailed {
                            block_id: block_id.clone(),
                            node_id,
                            reason,
                        },
                        other => other,
                    })
                }
            }))
            .await;

            if let Some(err) = first_write_error(results) {
                warn!(file = %file_id, stripe = stripe_index, error = %err,
                      "block write failed, abandoning upload");
                self.cleanup_blocks(&stripes).await;
                return Err(err);
            }

            debug!(file = %file_id, stripe = stripe_index, global_stripe = stripe_number,
                   parity_node = %self.nodes[parity_node].node_id(), "stripe written");
        }

        let metadata = FileMetadata::new(
            file_id,
            filename,
            content.len() as u64,
            Utc::now(),
            stripes,
        );
        self.store.commit_file(metadata.clone()).await?;

        info!(file = %metadata.file_id, filename = %metadata.filename,
              size = metadata.size, stripes = metadata.stripes.len(), "file stored");
        Ok(metadata)
    }

    // =========================================================================
    // Delete
    // =========================================================================

    /// Delete a file: attempt every block delete, then drop the metadata.
    /// Individual block deletes are best-effort; 404s count as success.
    #[instrument(skip(self))]
    pub async fn delete_file(&self, file_id: &str) -> Result<FileMetadata> {
        let metadata = self
            .store
            .get(file_id)
            .await
            .ok_or_else(|| Error::FileNotFound(file_id.to_string()))?;

        let deletes: Vec<_> = metadata.all_blocks().map(|(location, _)| location.clone()).collect();
        self.delete_block_locations(&deletes).await;

        self.store.remove(file_id).await?;
        info!(file = %file_id, blocks = deletes.len(), "file deleted");
        Ok(metadata)
    }

    pub async fn get_file(&self, file_id: &str) -> Option<FileMetadata> {
        self.store.get(file_id).await
    }

    pub async fn list_files(&self) -> Vec<FileMetadata> {
        self.store.list().await
    }

    pub async fn search_files(&self, query: &str) -> Vec<FileMetadata> {
        self.store.search(query).await
    }

    // =========================================================================
    // Cleanup
    // =========================================================================

    /// Best-effort removal of every block of the given stripes, after an
    /// abandoned upload. Failures are logged and ignored; blocks on
    /// unreachable nodes become orphans, which is acceptable because the
    /// file's metadata was never committed.
    async fn cleanup_blocks(&self, stripes: &[StripeDescriptor]) {
        let locations: Vec<BlockLocation> = stripes
            .iter()
            .flat_map(|stripe| {
                stripe
                    .data
                    .iter()
                    .chain(std::iter::once(&stripe.parity))
                    .cloned()
            })
            .collect();
        self.delete_block_locations(&locations).await;
    }

    async fn delete_block_locations(&self, locations: &[BlockLocation]) {
        let deletes = locations.iter().filter_map(|location| {
            let node = match self.node_by_id(&location.node_id) {
                Some(node) => Arc::clone(node),
                None => {
                    warn!(node = %location.node_id, block = %location.block_id,
                          "block references unknown node, skipping delete");
                    return None;
                }
            };
            let block_id = location.block_id.clone();
            Some(async move {
                if let Err(e) = node.delete(&block_id).await {
                    debug!(block = %block_id, error = %e, "block delete failed");
                }
            })
        });
        join_all(deletes).await;
    }
}

/// Split one stripe payload into `data_blocks` blocks of exactly
/// `block_size` bytes, right-zero-padding as needed
fn split_stripe(chunk: &[u8], block_size: usize, data_blocks: usize) -> Vec<Bytes> {
    (0..data_blocks)
        .map(|j| {
            let start = (j * block_size).min(chunk.len());
            let end = ((j + 1) * block_size).min(chunk.len());
            let mut block = chunk[start..end].to_vec();
            block.resize(block_size, 0);
            Bytes::from(block)
        })
        .collect()
}

/// Pick the error an abandoned upload reports: a storage-full signal wins
/// over transport noise so operators see the actionable cause
fn first_write_error(results: Vec<Result<()>>) -> Option<Error> {
    let mut first = None;
    for result in results {
        match result {
            Ok(()) => {}
            Err(e @ Error::NodeFull { .. }) => return Some(e),
            Err(e) => {
                if first.is_none() {
                    first = Some(e);
                }
            }
        }
    }
    first
}

// =============================================================================
// Tests
// =============================================================================
