//! Block node service
//!
//! The per-node blob store consumed by the coordinator: one file per block
//! under a storage directory, hex-encoded payloads on the wire, 507 when a
//! store would exceed the declared capacity.

use std::net::SocketAddr;
use std::path::{Path as FsPath, PathBuf};
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use tracing::{debug, info};

use crate::cluster::{NodeInfoResponse, RetrieveBlockResponse, StoreBlockRequest, StoreBlockResponse};
use crate::error::{Error, Result};

// =============================================================================
// Disk Store
// =============================================================================

/// File-per-block store under one directory
pub struct DiskStore {
    root: PathBuf,
    capacity: u64,
}

impl DiskStore {
    /// Open the store, creating the directory if needed
    pub fn open(root: impl AsRef<FsPath>, capacity: u64) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root, capacity })
    }

    pub fn root(&self) -> &FsPath {
        &self.root
    }

    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Resolve a block id to its path, rejecting ids that could escape the
    /// storage directory
    fn block_path(&self, block_id: &str) -> Result<PathBuf> {
        let safe = !block_id.is_empty()
            && !block_id.contains(['/', '\\'])
            && !block_id.contains("..");
        if !safe {
            return Err(Error::InvalidRequest(format!(
                "invalid block id '{block_id}'"
            )));
        }
        Ok(self.root.join(block_id))
    }

    /// Bytes currently stored across all blocks
    pub async fn used_space(&self) -> Result<u64> {
        let mut used = 0u64;
        let mut entries = tokio::fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            used += entry.metadata().await?.len();
        }
        Ok(used)
    }

    /// Store a block, overwriting any previous payload under the same id
    pub async fn store(&self, block_id: &str, data: &[u8]) -> Result<()> {
        let path = self.block_path(block_id)?;

        let used = self.used_space().await?;
        let available = self.capacity.saturating_sub(used);
        if data.len() as u64 > available {
            return Err(Error::StorageFull {
                needed: data.len() as u64,
                available,
            });
        }

        tokio::fs::write(&path, data).await?;
        debug!(block = %block_id, bytes = data.len(), "block stored");
        Ok(())
    }

    pub async fn retrieve(&self, block_id: &str) -> Result<Vec<u8>> {
        let path = self.block_path(block_id)?;
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(Error::BlockNotFound(block_id.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn delete(&self, block_id: &str) -> Result<()> {
        let path = self.block_path(block_id)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!(block = %block_id, "block deleted");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(Error::BlockNotFound(block_id.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

// =============================================================================
// Routes
// =============================================================================

/// Build the node router
pub fn router(store: Arc<DiskStore>) -> Router {
    Router::new()
        .route("/", get(node_info))
        .route("/store", post(store_block))
        .route("/retrieve/:block_id", get(retrieve_block))
        .route("/delete/:block_id", delete(delete_block))
        .with_state(store)
}

/// Bind and serve the node router until the process exits
pub async fn serve(addr: SocketAddr, router: Router) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "block node listening");
    axum::serve(listener, router).await?;
    Ok(())
}

async fn node_info(State(store): State<Arc<DiskStore>>) -> Result<Json<NodeInfoResponse>> {
    let used = store.used_space().await?;
    Ok(Json(NodeInfoResponse {
        message: "Block node is running".to_string(),
        storage_path: store.root().display().to_string(),
        capacity_bytes: store.capacity(),
        used_space_bytes: used,
        available_space_bytes: store.capacity().saturating_sub(used),
    }))
}

async fn store_block(
    State(store): State<Arc<DiskStore>>,
    Json(payload): Json<StoreBlockRequest>,
) -> Result<(StatusCode, Json<StoreBlockResponse>)> {
    let data = hex::decode(&payload.data).map_err(|e| Error::InvalidHex(e.to_string()))?;
    store.store(&payload.block_id, &data).await?;
    Ok((
        StatusCode::CREATED,
        Json(StoreBlockResponse {
            message: "Block stored successfully".to_string(),
            block_id: payload.block_id,
        }),
    ))
}

async fn retrieve_block(
    State(store): State<Arc<DiskStore>>,
    Path(block_id): Path<String>,
) -> Result<Json<RetrieveBlockResponse>> {
    let data = store.retrieve(&block_id).await?;
    Ok(Json(RetrieveBlockResponse {
        block_id,
        data: hex::encode(data),
    }))
}

async fn delete_block(
    State(store): State<Arc<DiskStore>>,
    Path(block_id): Path<String>,
) -> Result<Json<serde_json::Value>> {
    store.delete(&block_id).await?;
    Ok(Json(serde_json::json!({
        "message": "Block deleted successfully",
        "block_id": block_id,
    })))
}

// =============================================================================
// Tests
// =============================================================================
