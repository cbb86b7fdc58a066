//! File metadata records and the durable metadata store
//!
//! The store owns the `{file-id -> layout}` map and the global stripe
//! counter. Both live under one writer-exclusive lock and are persisted
//! together as a single pretty-printed JSON document, rewritten through a
//! temp file + rename on every mutation so a crash mid-write never leaves a
//! torn document behind.
//!
//! The stripe layout is authoritative in [`FileMetadata::stripes`]; the flat
//! `blocks` / `parity_blocks` maps are derived once at construction and kept
//! for the public API and document schema. Nothing ever re-parses a block id
//! to discover its stripe or kind.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::{Error, Result};

// =============================================================================
// Records
// =============================================================================

/// Whether a block carries file payload or stripe parity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockKind {
    Data,
    Parity,
}

/// Where one block lives
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockLocation {
    pub block_id: String,
    pub node_id: String,
}

impl BlockLocation {
    pub fn new(block_id: impl Into<String>, node_id: impl Into<String>) -> Self {
        Self {
            block_id: block_id.into(),
            node_id: node_id.into(),
        }
    }
}

/// Layout of one stripe: N-1 ordered data blocks plus one parity block,
/// each on a distinct node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StripeDescriptor {
    /// Position of the stripe within the file (0-based)
    pub stripe_index: usize,

    /// Data block locations in payload order
    pub data: Vec<BlockLocation>,

    /// Parity block location
    pub parity: BlockLocation,
}

/// Metadata for one committed file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileMetadata {
    pub file_id: String,
    pub filename: String,
    /// Original size in bytes, before padding
    pub size: u64,
    pub uploaded_at: DateTime<Utc>,

    /// Authoritative per-stripe layout
    pub stripes: Vec<StripeDescriptor>,

    /// Derived map block-id -> node-id over all data blocks
    pub blocks: BTreeMap<String, String>,

    /// Derived map block-id -> node-id over all parity blocks
    pub parity_blocks: BTreeMap<String, String>,
}

impl FileMetadata {
    /// Build a record from its stripe layout, deriving the flat maps
    pub fn new(
        file_id: impl Into<String>,
        filename: impl Into<String>,
        size: u64,
        uploaded_at: DateTime<Utc>,
        stripes: Vec<StripeDescriptor>,
    ) -> Self {
        let mut blocks = BTreeMap::new();
        let mut parity_blocks = BTreeMap::new();
        for stripe in &stripes {
            for location in &stripe.data {
                blocks.insert(location.block_id.clone(), location.node_id.clone());
            }
            parity_blocks.insert(stripe.parity.block_id.clone(), stripe.parity.node_id.clone());
        }

        Self {
            file_id: file_id.into(),
            filename: filename.into(),
            size,
            uploaded_at,
            stripes,
            blocks,
            parity_blocks,
        }
    }

    /// Every block of the file with its kind, in (stripe, data-index) order
    /// with parity last per stripe
    pub fn all_blocks(&self) -> impl Iterator<Item = (&BlockLocation, BlockKind)> {
        self.stripes.iter().flat_map(|stripe| {
            stripe
                .data
                .iter()
                .map(|location| (location, BlockKind::Data))
                .chain(std::iter::once((&stripe.parity, BlockKind::Parity)))
        })
    }
}

// =============================================================================
// Metadata Store
// =============================================================================

/// In-memory map plus stripe counter, mirrored to a JSON document
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreInner {
    files: BTreeMap<String, FileMetadata>,
    next_stripe_number: u64,
}

/// Durable mapping from file-id to file metadata, plus the global stripe
/// counter. The coordinator is the single writer.
#[derive(Debug)]
pub struct MetadataStore {
    path: PathBuf,
    inner: RwLock<StoreInner>,
}

impl MetadataStore {
    /// Open the store at `path`. An absent document is an empty store; a
    /// document that exists but cannot be parsed refuses to open.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let inner = match tokio::fs::read(&path).await {
            Ok(raw) => {
                let inner: StoreInner =
                    serde_json::from_slice(&raw).map_err(|e| Error::MetadataCorrupt {
                        path: path.display().to_string(),
                        reason: e.to_string(),
                    })?;
                info!(
                    files = inner.files.len(),
                    next_stripe = inner.next_stripe_number,
                    "loaded metadata document"
                );
                inner
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no metadata document, starting empty");
                StoreInner::default()
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path,
            inner: RwLock::new(inner),
        })
    }

    /// Return the current global stripe number and advance the counter.
    ///
    /// The new value is persisted with the next metadata commit; an upload is
    /// only acknowledged after that commit, so the persisted counter strictly
    /// bounds every committed stripe number.
    pub async fn advance_stripe_counter(&self) -> u64 {
        let mut inner = self.inner.write().await;
        let current = inner.next_stripe_number;
        inner.next_stripe_number += 1;
        current
    }

    /// Insert-or-replace a file record and persist the document
    pub async fn commit_file(&self, metadata: FileMetadata) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.files.insert(metadata.file_id.clone(), metadata);
        self.persist(&inner).await
    }

    /// Remove a file record. Idempotent; persists only when something was
    /// actually removed.
    pub async fn remove(&self, file_id: &str) -> Result<Option<FileMetadata>> {
        let mut inner = self.inner.write().await;
        let removed = inner.files.remove(file_id);
        if removed.is_some() {
            self.persist(&inner).await?;
        }
        Ok(removed)
    }

    pub async fn get(&self, file_id: &str) -> Option<FileMetadata> {
        self.inner.read().await.files.get(file_id).cloned()
    }

    pub async fn list(&self) -> Vec<FileMetadata> {
        self.inner.read().await.files.values().cloned().collect()
    }

    /// Case-insensitive substring match over filenames
    pub async fn search(&self, query: &str) -> Vec<FileMetadata> {
        let query = query.to_lowercase();
        self.inner
            .read()
            .await
            .files
            .values()
            .filter(|metadata| metadata.filename.to_lowercase().contains(&query))
            .cloned()
            .collect()
    }

    /// Current counter value, without advancing it
    pub async fn next_stripe_number(&self) -> u64 {
        self.inner.read().await.next_stripe_number
    }

    /// Rewrite the document via write-temp + rename
    async fn persist(&self, inner: &StoreInner) -> Result<()> {
        let json = serde_json::to_vec_pretty(inner)
            .map_err(|e| Error::Internal(format!("metadata serialization: {e}")))?;

        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, &json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        debug!(path = %self.path.display(), bytes = json.len(), "persisted metadata document");
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
