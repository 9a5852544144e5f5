// Application state module
// Everything a connection task needs, shared read-only behind an Arc

use std::sync::Arc;

use super::types::{Config, LoggingConfig};
use super::ServerConfig;
use crate::error::Result;
use crate::fs::LocalFs;
use crate::handler::StaticHandler;

/// Application state
pub struct AppState {
    pub config: Config,
    pub handler: StaticHandler,
}

impl AppState {
    /// Finalize the file serving options and build the handler over the
    /// local filesystem
    pub fn new(config: Config) -> Result<Self> {
        let files = ServerConfig::from_files_config(&config.files)?;
        let handler = StaticHandler::new(Arc::new(files), Arc::new(LocalFs));
        Ok(Self { config, handler })
    }

    pub const fn logging(&self) -> &LoggingConfig {
        &self.config.logging
    }
}
