//! MIME type detection module
//!
//! Returns the corresponding Content-Type based on file extension.

use std::collections::HashMap;
use std::path::Path;

/// Get the MIME type for a file name
///
/// Lookup order: configured overrides (by lowercase extension), then
/// `mime_guess`, then `default`.
pub fn get_content_type(file_name: &str, overrides: &HashMap<String, String>, default: &str) -> String {
    let extension = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    if let Some(found) = extension.as_deref().and_then(|ext| overrides.get(ext)) {
        return found.clone();
    }

    extension
        .and_then(|ext| mime_guess::from_ext(&ext).first())
        .map_or_else(|| default.to_string(), |mime| mime.essence_str().to_string())
}

/// Whether a MIME type carries text and should declare a charset
pub fn is_text(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    essence.starts_with("text/")
        || essence.ends_with("+xml")
        || essence.ends_with("+json")
        || matches!(
            essence.as_str(),
            "application/javascript"
                | "application/x-javascript"
                | "application/ecmascript"
                | "application/json"
                | "application/xml"
                | "application/x-sh"
                | "application/x-httpd-php"
        )
}
