//! Stripestore - Distributed RAID-5 Block File Store
//!
//! A coordinator that stripes whole-file uploads over N independent HTTP
//! block nodes with one rotating XOR parity block per stripe, and serves
//! reads transparently while at most one node per stripe is unavailable.
//!
//! # Architecture
//!
//! ```text
//! client ──HTTP──▶ ┌──────────────────────────────────────────┐
//!                  │               Coordinator                 │
//!                  │  ┌─────────┐  ┌──────────┐  ┌──────────┐ │
//!                  │  │   API   │─▶│  Stripe  │─▶│ Metadata │ │
//!                  │  │ (axum)  │  │  Engine  │  │  Store   │ │
//!                  │  └─────────┘  └────┬─────┘  └──────────┘ │
//!                  └───────────────────┼─────────────────────┘
//!                           parallel   │   block I/O
//!               ┌──────────┬───────────┼──────────┬──────────┐
//!               ▼          ▼           ▼          ▼          ▼
//!           block node  block node  block node  block node  ...
//! ```
//!
//! # Modules
//!
//! - [`api`] - Coordinator HTTP surface (upload/download/list/search/delete/status)
//! - [`cluster`] - Block-node port trait and the reqwest HTTP adapter
//! - [`config`] - Coordinator and node configuration
//! - [`error`] - Error types
//! - [`logging`] - Tracing setup for the binaries
//! - [`metadata`] - File records and the durable metadata document
//! - [`node`] - The per-node block store service
//! - [`raid`] - Parity codec, placement policy, and the stripe engine
//! - [`status`] - Operator status aggregation

pub mod api;
pub mod cluster;
pub mod config;
pub mod error;
pub mod logging;
pub mod metadata;
pub mod node;
pub mod raid;
pub mod status;

// Re-export commonly used types
pub use cluster::{BlockStore, HttpBlockNode, RetrieveOutcome};
pub use config::{BlockNodeConfig, CoordinatorConfig, NodeEndpoint};
pub use error::{Error, Result};
pub use metadata::{FileMetadata, MetadataStore, StripeDescriptor};
pub use raid::StripeEngine;
