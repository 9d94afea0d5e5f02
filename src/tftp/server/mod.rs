//! TFTP server implementation
//!
//! This module provides the read-only server:
//! - `server_impl`: Listening loop, dispatches client requests
//! - `worker`: Worker threads, one per transfer
//! - `config`: Server configuration

pub mod config;
mod server_impl;
mod worker;

use anyhow::{Context, Result};
use std::path::PathBuf;

// Public server types
pub use config::Config;
pub use server_impl::Server;
pub use worker::{TransferError, Worker};

/// Run the TFTP server with CLI arguments and optional configuration
pub fn run_with_config(
    address: Option<String>,
    payload: Option<PathBuf>,
    retries: Option<u8>,
    timeout: Option<u64>,
    config: Option<Config>,
) -> Result<()> {
    let config = config
        .unwrap_or_default()
        .merge_cli(address, payload, retries, timeout);

    let address = config.address.as_deref().unwrap_or(config::DEFAULT_ADDRESS);
    let path = config.payload.clone().ok_or_else(|| {
        anyhow::anyhow!("Payload file not specified. Use argument or set in config file.")
    })?;

    let payload = std::fs::read(&path)
        .with_context(|| format!("Failed to read payload file: {}", path.display()))?;

    log::info!("Starting TFTP server on {}", address);
    log::info!(
        "Payload: {} ({} bytes, sha512-256 {})",
        path.display(),
        payload.len(),
        crate::sum::hex_digest(&payload)
    );

    let server = Server::new(payload)
        .with_retries(config.retries.unwrap_or(config::DEFAULT_RETRIES))
        .with_timeout(config.timeout.unwrap_or(config::DEFAULT_TIMEOUT));

    server.listen_and_serve(address)
}
