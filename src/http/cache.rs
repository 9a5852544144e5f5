//! HTTP cache control module
//!
//! Provides the `Cache-Control` policy and conditional request validation.

use std::fmt;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Value used for the "never cache" sentinel
pub const NO_STORE: &str = "no-cache, no-store, must-revalidate";

/// Cache control policy, resolved once at startup
#[derive(Clone)]
pub enum CachePolicy {
    /// `max-age=N`
    MaxAge(u64),
    /// Never cache
    NoStore,
    /// Header value used verbatim
    Directive(String),
    /// Header value computed from the decoded request path
    PerPath(Arc<dyn Fn(&str) -> String + Send + Sync>),
}

impl CachePolicy {
    /// Convert to a Cache-Control header value for the given request path
    pub fn to_header_value(&self, request_path: &str) -> String {
        match self {
            Self::MaxAge(max_age) => format!("max-age={max_age}"),
            Self::NoStore => NO_STORE.to_string(),
            Self::Directive(value) => value.clone(),
            Self::PerPath(f) => f(request_path),
        }
    }

    /// Interpret a configured setting: a number of seconds, `-1` for
    /// no-store, or any other directive string
    pub fn from_setting(setting: &str) -> Self {
        match setting.trim().parse::<i64>() {
            Ok(-1) => Self::NoStore,
            Ok(secs) if secs >= 0 => Self::MaxAge(secs.unsigned_abs()),
            _ => Self::Directive(setting.trim().to_string()),
        }
    }
}

impl fmt::Debug for CachePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MaxAge(secs) => f.debug_tuple("MaxAge").field(secs).finish(),
            Self::NoStore => f.write_str("NoStore"),
            Self::Directive(value) => f.debug_tuple("Directive").field(value).finish(),
            Self::PerPath(_) => f.write_str("PerPath(..)"),
        }
    }
}

/// Decide whether a request can be answered with `304 Not Modified`
///
/// Returns false when neither conditional header is present. A malformed
/// `If-Modified-Since` is a miss, never an error.
///
/// With `weak_compare`, `W/"x"` and `"x"` are interchangeable. Without it,
/// only byte-equal strong tags match; a weak server tag never matches.
pub fn is_not_modified(
    if_modified_since: Option<&str>,
    if_none_match: Option<&str>,
    last_modified: SystemTime,
    etag: &str,
    weak_compare: bool,
) -> bool {
    if if_modified_since.is_none() && if_none_match.is_none() {
        return false;
    }

    if let Some(since) = if_modified_since {
        let Ok(client_date) = httpdate::parse_http_date(since.trim()) else {
            return false;
        };
        // HTTP dates carry whole seconds only
        if unix_secs(client_date) < unix_secs(last_modified) {
            return false;
        }
    }

    if let Some(candidates) = if_none_match {
        return candidates
            .split(',')
            .map(str::trim)
            .any(|client_tag| etag_matches(client_tag, etag, weak_compare));
    }

    true
}

fn etag_matches(client_tag: &str, etag: &str, weak_compare: bool) -> bool {
    if client_tag == "*" {
        return true;
    }
    if weak_compare {
        client_tag == etag
            || client_tag == format!("W/{etag}")
            || format!("W/{client_tag}") == etag
    } else {
        client_tag == etag && !etag.starts_with("W/")
    }
}

fn unix_secs(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn mtime() -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(1_700_000_000)
    }

    #[test]
    fn test_no_conditional_headers() {
        assert!(!is_not_modified(None, None, mtime(), "\"abc\"", true));
    }

    #[test]
    fn test_strict_comparison() {
        assert!(is_not_modified(None, Some("\"abc\""), mtime(), "\"abc\"", false));
        assert!(!is_not_modified(None, Some("W/\"abc\""), mtime(), "\"abc\"", false));
        // strong comparison never matches a weak server tag
        assert!(!is_not_modified(None, Some("W/\"abc\""), mtime(), "W/\"abc\"", false));
    }

    #[test]
    fn test_weak_comparison() {
        assert!(is_not_modified(None, Some("W/\"abc\""), mtime(), "\"abc\"", true));
        assert!(is_not_modified(None, Some("\"abc\""), mtime(), "W/\"abc\"", true));
        assert!(is_not_modified(None, Some("W/\"abc\""), mtime(), "W/\"abc\"", true));
        assert!(!is_not_modified(None, Some("\"xyz\""), mtime(), "\"abc\"", true));
    }

    #[test]
    fn test_etag_list_and_wildcard() {
        assert!(is_not_modified(None, Some("\"x\", \"abc\""), mtime(), "\"abc\"", false));
        assert!(is_not_modified(None, Some("*"), mtime(), "\"abc\"", false));
    }

    #[test]
    fn test_if_modified_since() {
        let same = httpdate::fmt_http_date(mtime());
        let earlier = httpdate::fmt_http_date(mtime() - Duration::from_secs(60));
        let later = httpdate::fmt_http_date(mtime() + Duration::from_secs(60));

        assert!(is_not_modified(Some(&same), None, mtime(), "\"abc\"", true));
        assert!(is_not_modified(Some(&later), None, mtime(), "\"abc\"", true));
        assert!(!is_not_modified(Some(&earlier), None, mtime(), "\"abc\"", true));

        // sub-second mtime still matches its own Last-Modified
        let fractional = mtime() + Duration::from_millis(500);
        assert!(is_not_modified(Some(&same), None, fractional, "\"abc\"", true));
    }

    #[test]
    fn test_malformed_date_is_a_miss() {
        assert!(!is_not_modified(Some("yesterday-ish"), None, mtime(), "\"abc\"", true));
        assert!(!is_not_modified(
            Some("yesterday-ish"),
            Some("\"abc\""),
            mtime(),
            "\"abc\"",
            true
        ));
    }

    #[test]
    fn test_both_headers_must_agree() {
        let earlier = httpdate::fmt_http_date(mtime() - Duration::from_secs(60));
        assert!(!is_not_modified(Some(&earlier), Some("\"abc\""), mtime(), "\"abc\"", true));
    }

    #[test]
    fn test_cache_policy() {
        assert_eq!(CachePolicy::MaxAge(3600).to_header_value("/"), "max-age=3600");
        assert_eq!(CachePolicy::NoStore.to_header_value("/"), NO_STORE);
        assert_eq!(
            CachePolicy::Directive("public, immutable".into()).to_header_value("/"),
            "public, immutable"
        );
        let per_path = CachePolicy::PerPath(Arc::new(|p: &str| {
            if p.starts_with("/assets/") { "max-age=31536000".into() } else { "no-cache".into() }
        }));
        assert_eq!(per_path.to_header_value("/assets/app.js"), "max-age=31536000");
        assert_eq!(per_path.to_header_value("/index.html"), "no-cache");
    }

    #[test]
    fn test_policy_from_setting() {
        assert!(matches!(CachePolicy::from_setting("600"), CachePolicy::MaxAge(600)));
        assert!(matches!(CachePolicy::from_setting("-1"), CachePolicy::NoStore));
        assert!(matches!(
            CachePolicy::from_setting("private"),
            CachePolicy::Directive(ref d) if d == "private"
        ));
    }
}
