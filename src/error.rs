//! Startup and configuration errors
//!
//! Request-scoped failures are never reported through this type; they map
//! onto [`crate::http::Status`] and end in a terminal response instead.

use std::io;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("root directory '{path}' is not usable: {source}")]
    InvalidRoot {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("root '{0}' is not a directory")]
    RootNotDirectory(PathBuf),

    #[error("invalid header '{name}': {reason}")]
    InvalidHeader { name: String, reason: String },

    #[error("invalid listen address '{0}'")]
    InvalidAddress(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
