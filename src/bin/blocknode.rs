//! Stripestore block node daemon
//!
//! Byte-addressed blob service holding one file per block under a storage
//! directory. Answers 507 when a store would exceed the declared capacity.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use stripestore::logging::init_logging;
use stripestore::node::{self, DiskStore};
use stripestore::BlockNodeConfig;

/// Stripestore block node - stores blocks for the coordinator
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// HTTP bind host
    #[arg(long, env = "BLOCKNODE_HOST", default_value = "0.0.0.0")]
    host: String,

    /// HTTP bind port
    #[arg(long, env = "BLOCKNODE_PORT")]
    port: u16,

    /// Directory to store data blocks
    #[arg(long, env = "BLOCKNODE_STORAGE")]
    storage: PathBuf,

    /// Declared capacity in bytes
    #[arg(long, env = "BLOCKNODE_CAPACITY", default_value = "1073741824")]
    capacity: u64,

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

    let config = BlockNodeConfig {
        host: args.host,
        port: args.port,
        storage_dir: args.storage,
        capacity: args.capacity,
    };

    info!("Starting block node");
    info!("  Storage directory: {}", config.storage_dir.display());
    info!("  Capacity: {} bytes", config.capacity);

    let store = Arc::new(
        DiskStore::open(&config.storage_dir, config.capacity)
            .context("failed to open block storage")?,
    );

    let router = node::router(store);
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("invalid bind address")?;
    node::serve(addr, router).await?;

    Ok(())
}
