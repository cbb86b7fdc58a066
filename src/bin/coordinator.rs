//! Stripestore coordinator daemon
//!
//! Owns the metadata document and fans block I/O out to the configured
//! block nodes. A corrupt metadata document refuses to start; operator
//! intervention is required rather than silently discarding state.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use stripestore::api::{self, ApiState};
use stripestore::cluster::BlockStore;
use stripestore::config::{self, CoordinatorConfig};
use stripestore::logging::init_logging;
use stripestore::{HttpBlockNode, MetadataStore, StripeEngine};

/// Stripestore coordinator - RAID-5 striping over HTTP block nodes
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// HTTP bind host
    #[arg(long, env = "STRIPESTORE_HOST", default_value = "0.0.0.0")]
    host: String,

    /// HTTP bind port
    #[arg(long, env = "STRIPESTORE_PORT", default_value = "8000")]
    port: u16,

    /// Block payload size in bytes
    #[arg(long, env = "STRIPESTORE_BLOCK_SIZE", default_value = "4096")]
    block_size: usize,

    /// Block nodes as a comma-separated `id=url` list; defaults to four
    /// local nodes on ports 8001-8004
    #[arg(long, env = "STRIPESTORE_NODES")]
    nodes: Option<String>,

    /// Declared capacity per node in bytes, used until probes report
    #[arg(long, env = "STRIPESTORE_NODE_CAPACITY", default_value = "1073741824")]
    node_capacity: u64,

    /// Path of the metadata document
    #[arg(long, env = "STRIPESTORE_METADATA", default_value = "metadata.json")]
    metadata_path: PathBuf,

    /// Largest accepted upload in bytes
    #[arg(long, env = "STRIPESTORE_MAX_FILE_SIZE", default_value = "1073741824")]
    max_file_size: usize,

    /// Per-block I/O deadline in seconds
    #[arg(long, env = "STRIPESTORE_BLOCK_TIMEOUT", default_value = "5")]
    block_timeout_secs: u64,

    /// Overall upload/download deadline in seconds
    #[arg(long, env = "STRIPESTORE_REQUEST_TIMEOUT", default_value = "30")]
    request_timeout_secs: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level, args.log_json);

    let mut config = CoordinatorConfig {
        block_size: args.block_size,
        node_capacity: args.node_capacity,
        metadata_path: args.metadata_path,
        host: args.host,
        port: args.port,
        max_file_size: args.max_file_size,
        block_timeout: Duration::from_secs(args.block_timeout_secs),
        request_timeout: Duration::from_secs(args.request_timeout_secs),
        ..Default::default()
    };
    if let Some(list) = &args.nodes {
        config.nodes = config::parse_node_list(list)?;
    }
    config.validate()?;

    info!("Starting Stripestore coordinator");
    info!("  Block size: {} bytes", config.block_size);
    info!("  Nodes: {}", config.nodes.len());
    for node in &config.nodes {
        info!("    {} -> {}", node.id, node.url);
    }
    info!("  Metadata document: {}", config.metadata_path.display());

    let store = Arc::new(
        MetadataStore::open(&config.metadata_path)
            .await
            .context("failed to open metadata store")?,
    );
    info!("Metadata store ready, {} files", store.list().await.len());

    let nodes: Vec<Arc<dyn BlockStore>> = config
        .nodes
        .iter()
        .map(|endpoint| {
            HttpBlockNode::new(endpoint, config.node_capacity, config.block_timeout)
                .map(|client| Arc::new(client) as Arc<dyn BlockStore>)
        })
        .collect::<stripestore::Result<_>>()?;

    let engine = Arc::new(StripeEngine::new(config.block_size, nodes, store)?);

    let state = Arc::new(ApiState {
        engine,
        request_timeout: config.request_timeout,
    });
    let router = api::router(state, config.max_file_size);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("invalid bind address")?;
    api::serve(addr, router).await?;

    Ok(())
}
