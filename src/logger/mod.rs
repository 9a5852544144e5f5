//! Logger module
//!
//! Provides logging utilities for the file server including:
//! - Subscriber setup from the logging configuration
//! - Server lifecycle logging
//! - Access logging with multiple formats
//! - Error and warning logging

mod format;

pub use format::AccessLogEntry;

use crate::config::{Config, LoggingConfig};
use std::net::SocketAddr;
use tracing_subscriber::EnvFilter;

/// Initialize the global subscriber
///
/// `RUST_LOG` takes precedence over the configured level. Should be called
/// once at application startup.
pub fn init(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.level));

    let result = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();

    if let Err(e) = result {
        eprintln!("[WARN] Logger already initialized: {e}");
    }
}

pub fn log_server_start(addr: &SocketAddr, config: &Config, root: &std::path::Path) {
    tracing::info!("File server listening on http://{addr}");
    tracing::info!("Serving {} under {}", root.display(), config.files.base_dir);
    if let Some(workers) = config.server.workers {
        tracing::info!("Worker threads: {workers}");
    }
    tracing::info!(
        auto_index = config.files.auto_index,
        show_dir = config.files.show_dir,
        gzip = config.files.gzip,
        brotli = config.files.brotli,
        "File serving options"
    );
}

pub fn log_connection_error(err: &impl std::fmt::Debug) {
    tracing::error!("Failed to serve connection: {err:?}");
}

pub fn log_error(message: &str) {
    tracing::error!("{message}");
}

pub fn log_warning(message: &str) {
    tracing::warn!("{message}");
}

/// Log formatted access log entry
pub fn log_access(entry: &AccessLogEntry, format: &str) {
    tracing::info!(target: "access", "{}", entry.format(format));
}

pub fn log_shutdown() {
    tracing::info!("Shutdown signal received, no longer accepting connections");
}
