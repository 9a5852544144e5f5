// Finalized file serving configuration
// Built once from `FilesConfig` at startup and shared read-only afterwards

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use hyper::header::{HeaderName, HeaderValue};

use super::FilesConfig;
use crate::error::{Error, Result};
use crate::http::CachePolicy;

/// Immutable per-server file serving settings
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Canonical absolute root of the served tree
    pub root: PathBuf,
    /// URL prefix the tree is mounted under, always starting with `/`
    pub base_dir: String,
    /// Extension tried for extension-less paths, also used for the index
    /// and custom 404 page names
    pub default_ext: Option<String>,
    pub cache: CachePolicy,
    pub auto_index: bool,
    pub show_dir: bool,
    pub show_dotfiles: bool,
    pub human_readable: bool,
    pub si: bool,
    pub hide_permissions: bool,
    pub gzip: bool,
    pub brotli: bool,
    /// Try the custom 404 page before answering 404
    pub handle_error: bool,
    pub weak_etags: bool,
    pub weak_compare: bool,
    pub handle_options: bool,
    /// MIME type used when the extension is unknown
    pub content_type: String,
    /// Extra headers added to every response
    pub headers: Vec<(HeaderName, HeaderValue)>,
    pub mime_types: HashMap<String, String>,
}

impl ServerConfig {
    /// Serve `root` with default options
    #[cfg(test)]
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        Self::from_files_config(&FilesConfig {
            root: root.as_ref().to_string_lossy().into_owned(),
            ..FilesConfig::default()
        })
    }

    /// Validate and finalize the configured options
    pub fn from_files_config(files: &FilesConfig) -> Result<Self> {
        let root = Path::new(&files.root)
            .canonicalize()
            .map_err(|source| Error::InvalidRoot {
                path: PathBuf::from(&files.root),
                source,
            })?;
        if !root.is_dir() {
            return Err(Error::RootNotDirectory(root));
        }

        let default_ext = files.default_ext.trim().trim_start_matches('.');
        let default_ext = (!default_ext.is_empty()).then(|| default_ext.to_string());

        let mut headers = files
            .headers
            .iter()
            .map(|(name, value)| parse_header(name, value))
            .collect::<Result<Vec<_>>>()?;
        headers.sort_by(|a, b| a.0.as_str().cmp(b.0.as_str()));

        let mime_types = files
            .mime_types
            .iter()
            .map(|(ext, mime)| {
                (
                    ext.trim_start_matches('.').to_ascii_lowercase(),
                    mime.clone(),
                )
            })
            .collect();

        Ok(Self {
            root,
            base_dir: normalize_base_dir(&files.base_dir),
            default_ext,
            cache: cache_policy(files),
            auto_index: files.auto_index,
            show_dir: files.show_dir,
            show_dotfiles: files.show_dotfiles,
            human_readable: files.human_readable,
            si: files.si,
            hide_permissions: files.hide_permissions,
            gzip: files.gzip,
            brotli: files.brotli,
            handle_error: files.handle_error,
            weak_etags: files.weak_etags,
            weak_compare: files.weak_compare,
            handle_options: files.handle_options,
            content_type: files.content_type.clone(),
            headers,
            mime_types,
        })
    }

    fn page_ext(&self) -> &str {
        self.default_ext.as_deref().unwrap_or("html")
    }

    /// File name looked up inside a directory when auto-index is on
    pub fn index_file(&self) -> String {
        format!("index.{}", self.page_ext())
    }

    /// URL path of the custom not-found page
    pub fn not_found_path(&self) -> String {
        let base = self.base_dir.trim_end_matches('/');
        format!("{base}/404.{}", self.page_ext())
    }
}

fn normalize_base_dir(base_dir: &str) -> String {
    let trimmed = base_dir.trim().trim_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        format!("/{trimmed}")
    }
}

fn parse_header(name: &str, value: &str) -> Result<(HeaderName, HeaderValue)> {
    let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| Error::InvalidHeader {
        name: name.to_string(),
        reason: e.to_string(),
    })?;
    let header_value = HeaderValue::from_str(value).map_err(|e| Error::InvalidHeader {
        name: name.to_string(),
        reason: e.to_string(),
    })?;
    Ok((header_name, header_value))
}

fn cache_policy(files: &FilesConfig) -> CachePolicy {
    let fallback = CachePolicy::from_setting(&files.cache.as_setting());
    if files.cache_rules.is_empty() {
        return fallback;
    }

    let rules: Vec<(String, CachePolicy)> = files
        .cache_rules
        .iter()
        .map(|rule| (rule.prefix.clone(), CachePolicy::from_setting(&rule.cache.as_setting())))
        .collect();

    CachePolicy::PerPath(Arc::new(move |path: &str| {
        rules
            .iter()
            .find(|(prefix, _)| path.starts_with(prefix.as_str()))
            .map_or(&fallback, |(_, policy)| policy)
            .to_header_value(path)
    }))
}
