//! Coordinator HTTP API
//!
//! Public surface of the store: upload, download, list, search, delete and
//! the operator status endpoints. Handlers map error kinds onto HTTP
//! statuses and answer `{"detail": ...}` bodies on failure.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{DefaultBodyLimit, Multipart, Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::error::{Error, Result};
use crate::metadata::FileMetadata;
use crate::raid::StripeEngine;
use crate::status::{FileBlockStatus, SystemStatus};

/// Slack on top of the file-size limit for multipart framing
const MULTIPART_OVERHEAD: usize = 1024 * 1024;

// =============================================================================
// State
// =============================================================================

/// Shared state behind the coordinator routes
pub struct ApiState {
    pub engine: Arc<StripeEngine>,
    /// Overall deadline for one upload or download
    pub request_timeout: Duration,
}

// =============================================================================
// Response Bodies
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub message: String,
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub file_id: String,
    pub filename: String,
    pub size: u64,
    pub uploaded_at: chrono::DateTime<chrono::Utc>,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub message: String,
    pub file_id: String,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub query: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResponse {
    pub query: String,
    pub results: Vec<FileMetadata>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: String,
}

// =============================================================================
// Error Mapping
// =============================================================================

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match &self {
            Error::FileNotFound(_) | Error::BlockNotFound(_) => StatusCode::NOT_FOUND,
            Error::InvalidRequest(_) | Error::InvalidHex(_) => StatusCode::BAD_REQUEST,
            Error::NodeFull { .. } | Error::StorageFull { .. } => {
                StatusCode::INSUFFICIENT_STORAGE
            }
            Error::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            error!(error = %self, "request failed");
        }

        (
            status,
            Json(ErrorBody {
                detail: self.to_string(),
            }),
        )
            .into_response()
    }
}

// =============================================================================
// Router
// =============================================================================

/// Build the coordinator router
pub fn router(state: Arc<ApiState>, max_file_size: usize) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/status", get(system_status))
        .route("/status/blocks", get(block_status))
        .route("/upload", post(upload_file))
        .route("/files", get(list_files))
        .route("/download/:file_id", get(download_file))
        .route("/files/:file_id", delete(delete_file))
        .route("/search", get(search_files))
        .layer(DefaultBodyLimit::max(max_file_size + MULTIPART_OVERHEAD))
        .with_state(state)
}

/// Bind and serve the router until the process exits
pub async fn serve(addr: SocketAddr, router: Router) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "coordinator API listening");
    axum::serve(listener, router).await?;
    Ok(())
}

async fn with_deadline<T>(
    deadline: Duration,
    operation: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::time::timeout(deadline, operation)
        .await
        .map_err(|_| Error::Timeout(deadline))?
}

// =============================================================================
// Handlers
// =============================================================================

async fn root() -> Json<ServiceInfo> {
    Json(ServiceInfo {
        message: "Stripestore coordinator".to_string(),
        status: "running".to_string(),
    })
}

async fn system_status(State(state): State<Arc<ApiState>>) -> Json<SystemStatus> {
    Json(state.engine.system_status().await)
}

async fn block_status(State(state): State<Arc<ApiState>>) -> Json<Vec<FileBlockStatus>> {
    Json(state.engine.block_status().await)
}

async fn upload_file(
    State(state): State<Arc<ApiState>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>> {
    let mut upload: Option<(String, bytes::Bytes)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::InvalidRequest(format!("malformed multipart body: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field
            .file_name()
            .map(str::to_string)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| Error::InvalidRequest("file must have a name".into()))?;
        let data = field
            .bytes()
            .await
            .map_err(|e| Error::InvalidRequest(format!("failed to read file field: {e}")))?;
        upload = Some((filename, data));
        break;
    }

    let (filename, data) =
        upload.ok_or_else(|| Error::InvalidRequest("multipart field 'file' is required".into()))?;

    let metadata = with_deadline(
        state.request_timeout,
        state.engine.store_file(&filename, &data),
    )
    .await?;

    Ok(Json(UploadResponse {
        file_id: metadata.file_id,
        filename: metadata.filename,
        size: metadata.size,
        uploaded_at: metadata.uploaded_at,
        message: "File stored successfully".to_string(),
    }))
}

async fn list_files(State(state): State<Arc<ApiState>>) -> Json<Vec<FileMetadata>> {
    Json(state.engine.list_files().await)
}

async fn download_file(
    State(state): State<Arc<ApiState>>,
    Path(file_id): Path<String>,
) -> Result<Response> {
    let (metadata, content) = with_deadline(
        state.request_timeout,
        state.engine.retrieve_file(&file_id),
    )
    .await?;

    // Quotes would break the header framing
    let filename = metadata.filename.replace(['"', '\r', '\n'], "_");

    Ok((
        [
            (
                header::CONTENT_TYPE,
                "application/octet-stream".to_string(),
            ),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        content,
    )
        .into_response())
}

async fn delete_file(
    State(state): State<Arc<ApiState>>,
    Path(file_id): Path<String>,
) -> Result<Json<DeleteResponse>> {
    let metadata = state.engine.delete_file(&file_id).await?;
    Ok(Json(DeleteResponse {
        message: "File deleted successfully".to_string(),
        file_id: metadata.file_id,
    }))
}

async fn search_files(
    State(state): State<Arc<ApiState>>,
    Query(params): Query<SearchParams>,
) -> Json<SearchResponse> {
    let results = state.engine.search_files(&params.query).await;
    Json(SearchResponse {
        query: params.query,
        results,
    })
}
