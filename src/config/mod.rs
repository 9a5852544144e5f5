// Configuration module entry point
// Loads the layered configuration and finalizes file serving options

mod server;
mod state;
mod types;

use std::net::SocketAddr;

// Re-export public types
pub use server::ServerConfig;
pub use state::AppState;
pub use types::{Config, FilesConfig, LoggingConfig};

use crate::error::Error;

impl Config {
    /// Load configuration from specified file path (extension optional)
    /// Default config file is "config.toml" when no path specified
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        let files = FilesConfig::default();
        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix("FILESERVER")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("logging.level", "info")?
            .set_default("logging.access_log", true)?
            .set_default("logging.access_log_format", "combined")?
            .set_default("performance.keep_alive_timeout", 75)?
            .set_default("performance.read_timeout", 30)?
            .set_default("performance.write_timeout", 30)?
            .set_default("files.root", files.root)?
            .set_default("files.base_dir", files.base_dir)?
            .set_default("files.default_ext", files.default_ext)?
            .set_default("files.cache", 3600)?
            .set_default("files.auto_index", files.auto_index)?
            .set_default("files.show_dir", files.show_dir)?
            .set_default("files.show_dotfiles", files.show_dotfiles)?
            .set_default("files.human_readable", files.human_readable)?
            .set_default("files.si", files.si)?
            .set_default("files.hide_permissions", files.hide_permissions)?
            .set_default("files.gzip", files.gzip)?
            .set_default("files.brotli", files.brotli)?
            .set_default("files.handle_error", files.handle_error)?
            .set_default("files.weak_etags", files.weak_etags)?
            .set_default("files.weak_compare", files.weak_compare)?
            .set_default("files.handle_options", files.handle_options)?
            .set_default("files.content_type", files.content_type)?
            .build()?;

        settings.try_deserialize()
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, Error> {
        let addr = format!("{}:{}", self.server.host, self.server.port);
        addr.parse().map_err(|_| Error::InvalidAddress(addr))
    }
}
