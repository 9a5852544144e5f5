// Configuration types module
// Defines the deserialized configuration file structures

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ListenConfig,
    pub logging: LoggingConfig,
    pub performance: PerformanceConfig,
    pub files: FilesConfig,
}

/// Listener configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ListenConfig {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

/// Logging configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub access_log: bool,
    /// Access log format (combined, common, json, or custom pattern)
    #[serde(default = "default_access_log_format")]
    pub access_log_format: String,
}

fn default_access_log_format() -> String {
    "combined".to_string()
}

/// Performance configuration
#[derive(Debug, Deserialize, Clone)]
pub struct PerformanceConfig {
    pub keep_alive_timeout: u64,
    pub read_timeout: u64,
    pub write_timeout: u64,
}

/// Cache setting as written in the config file: seconds or a directive
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum CacheSetting {
    Seconds(i64),
    Directive(String),
}

impl CacheSetting {
    pub fn as_setting(&self) -> String {
        match self {
            Self::Seconds(secs) => secs.to_string(),
            Self::Directive(value) => value.clone(),
        }
    }
}

/// Cache setting applied to request paths under `prefix`
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct CacheRule {
    pub prefix: String,
    pub cache: CacheSetting,
}

/// File serving options, finalized into `ServerConfig` at startup
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct FilesConfig {
    pub root: String,
    pub base_dir: String,
    /// Empty string disables the default extension
    pub default_ext: String,
    pub cache: CacheSetting,
    #[serde(default)]
    pub cache_rules: Vec<CacheRule>,
    pub auto_index: bool,
    pub show_dir: bool,
    pub show_dotfiles: bool,
    pub human_readable: bool,
    pub si: bool,
    pub hide_permissions: bool,
    pub gzip: bool,
    pub brotli: bool,
    pub handle_error: bool,
    pub weak_etags: bool,
    pub weak_compare: bool,
    pub handle_options: bool,
    pub content_type: String,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default)]
    pub mime_types: HashMap<String, String>,
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            root: ".".to_string(),
            base_dir: "/".to_string(),
            default_ext: "html".to_string(),
            cache: CacheSetting::Seconds(3600),
            cache_rules: Vec::new(),
            auto_index: true,
            show_dir: true,
            show_dotfiles: true,
            human_readable: true,
            si: false,
            hide_permissions: false,
            gzip: false,
            brotli: false,
            handle_error: true,
            weak_etags: true,
            weak_compare: true,
            handle_options: false,
            content_type: "application/octet-stream".to_string(),
            headers: HashMap::new(),
            mime_types: HashMap::new(),
        }
    }
}
