//! HTTP block node client
//!
//! Typed reqwest client for one remote block store. Transport failures and
//! server errors flip the node's liveness flag to offline; a successful
//! probe of `GET /` flips it back before the next use. HTTP 507 is surfaced
//! as `NodeFull` without touching liveness.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use reqwest::StatusCode;
use tracing::{debug, warn};

use crate::cluster::{
    BlockStore, NodeInfoResponse, NodeSpace, RetrieveBlockResponse, RetrieveOutcome,
    StoreBlockRequest,
};
use crate::config::NodeEndpoint;
use crate::error::{Error, Result};

/// Client for a single block node
pub struct HttpBlockNode {
    id: String,
    base_url: String,
    http: reqwest::Client,
    online: AtomicBool,
    space: Mutex<NodeSpace>,
}

impl HttpBlockNode {
    /// Create a client for one node.
    ///
    /// `block_timeout` bounds every store/retrieve/delete call so a single
    /// slow node cannot stall a whole request.
    pub fn new(endpoint: &NodeEndpoint, capacity: u64, block_timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(block_timeout)
            .connect_timeout(block_timeout)
            .pool_max_idle_per_host(8)
            .build()
            .map_err(|e| Error::InvalidConfig(format!("HTTP client: {e}")))?;

        Ok(Self {
            id: endpoint.id.clone(),
            base_url: endpoint.url.trim_end_matches('/').to_string(),
            http,
            online: AtomicBool::new(true),
            space: Mutex::new(NodeSpace::new(capacity)),
        })
    }

    fn mark_offline(&self, reason: &str) {
        if self.online.swap(false, Ordering::SeqCst) {
            warn!(node = %self.id, %reason, "marking node offline");
        }
    }

    fn unavailable(&self, reason: impl Into<String>) -> Error {
        let reason = reason.into();
        self.mark_offline(&reason);
        Error::NodeUnavailable {
            node_id: self.id.clone(),
            reason,
        }
    }

    /// If the node is flagged offline, try one probe to rehabilitate it.
    /// Returns the resulting liveness.
    async fn ensure_online(&self) -> bool {
        if self.online.load(Ordering::SeqCst) {
            return true;
        }
        self.probe().await
    }
}

#[async_trait]
impl BlockStore for HttpBlockNode {
    fn node_id(&self) -> &str {
        &self.id
    }

    fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    fn space(&self) -> NodeSpace {
        *self.space.lock()
    }

    async fn store(&self, block_id: &str, data: Bytes) -> Result<()> {
        if !self.ensure_online().await {
            return Err(Error::NodeUnavailable {
                node_id: self.id.clone(),
                reason: "node is offline".to_string(),
            });
        }

        let payload = StoreBlockRequest {
            block_id: block_id.to_string(),
            data: hex::encode(&data),
        };

        let response = self
            .http
            .post(format!("{}/store", self.base_url))
            .json(&payload)
            .send()
            .await
            .map_err(|e| self.unavailable(e.to_string()))?;

        match response.status() {
            status if status.is_success() => {
                let mut space = self.space.lock();
                space.used = space.used.saturating_add(data.len() as u64);
                debug!(node = %self.id, block = %block_id, "stored block");
                Ok(())
            }
            StatusCode::INSUFFICIENT_STORAGE => Err(Error::NodeFull {
                node_id: self.id.clone(),
            }),
            status => Err(self.unavailable(format!("store returned {status}"))),
        }
    }

    async fn retrieve(&self, block_id: &str) -> RetrieveOutcome {
        if !self.ensure_online().await {
            return RetrieveOutcome::Unavailable;
        }

        let response = match self
            .http
            .get(format!("{}/retrieve/{}", self.base_url, block_id))
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                self.mark_offline(&e.to_string());
                return RetrieveOutcome::Unavailable;
            }
        };

        match response.status() {
            StatusCode::NOT_FOUND => RetrieveOutcome::Missing,
            status if status.is_success() => {
                let body: RetrieveBlockResponse = match response.json().await {
                    Ok(body) => body,
                    Err(e) => {
                        self.mark_offline(&e.to_string());
                        return RetrieveOutcome::Unavailable;
                    }
                };
                match hex::decode(&body.data) {
                    Ok(bytes) => RetrieveOutcome::Found(Bytes::from(bytes)),
                    Err(e) => {
                        warn!(node = %self.id, block = %block_id, error = %e,
                              "node returned undecodable block payload");
                        RetrieveOutcome::Unavailable
                    }
                }
            }
            status => {
                self.mark_offline(&format!("retrieve returned {status}"));
                RetrieveOutcome::Unavailable
            }
        }
    }

    async fn delete(&self, block_id: &str) -> Result<()> {
        if !self.ensure_online().await {
            return Err(Error::NodeUnavailable {
                node_id: self.id.clone(),
                reason: "node is offline".to_string(),
            });
        }

        let response = self
            .http
            .delete(format!("{}/delete/{}", self.base_url, block_id))
            .send()
            .await
            .map_err(|e| self.unavailable(e.to_string()))?;

        match response.status() {
            // 404 is success: the block is already gone
            StatusCode::NOT_FOUND => Ok(()),
            status if status.is_success() => Ok(()),
            status => Err(self.unavailable(format!("delete returned {status}"))),
        }
    }

    async fn probe(&self) -> bool {
        match self.http.get(format!("{}/", self.base_url)).send().await {
            Ok(response) if response.status().is_success() => {
                if let Ok(info) = response.json::<NodeInfoResponse>().await {
                    let mut space = self.space.lock();
                    space.capacity = info.capacity_bytes;
                    space.used = info.used_space_bytes;
                }
                if !self.online.swap(true, Ordering::SeqCst) {
                    debug!(node = %self.id, "node rehabilitated to online");
                }
                true
            }
            _ => {
                self.online.store(false, Ordering::SeqCst);
                false
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
