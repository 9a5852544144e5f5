//! Request path resolution
//!
//! Maps a raw (percent-encoded) URL path onto a file under the served root.
//! Nothing here touches the filesystem, so a rejected path never costs a
//! syscall.

use std::path::{Path, PathBuf};

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};

use crate::config::ServerConfig;

/// Characters escaped when a name becomes one URL path segment
pub const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}')
    .add(b'/')
    .add(b'\\');

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// Bad percent-encoding or a forged separator inside a segment (400)
    Malformed(String),
    /// The resolved path leaves the served root (403)
    OutsideRoot,
}

/// A request path mapped onto the filesystem
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    /// Physical path under the root
    pub file: PathBuf,
    /// Decoded, normalized URL path, e.g. `/docs/a b/`
    pub pathname: String,
}

/// Resolve a raw URL path against the configured root and base directory
pub fn resolve(config: &ServerConfig, raw_path: &str) -> Result<Resolved, ResolveError> {
    check_percent_encoding(raw_path)?;

    let segments = normalize(&decode_segments(raw_path)?);
    let trailing_slash = raw_path.ends_with('/') && !segments.is_empty();
    let pathname = format!(
        "/{}{}",
        segments.join("/"),
        if trailing_slash { "/" } else { "" }
    );

    let file = join_under_root(&config.root, &relative_to_base(&segments, &config.base_dir));

    // Component-wise: `/srv/pub` does not contain `/srv/public-secrets`
    if !file.starts_with(&config.root) {
        return Err(ResolveError::OutsideRoot);
    }

    Ok(Resolved { file, pathname })
}

/// Percent-encode a decoded pathname segment by segment
///
/// A pathname from [`resolve`] has a single leading `/` and no empty
/// segments, so the result is always a same-origin absolute path.
pub fn encode_pathname(pathname: &str) -> String {
    pathname
        .split('/')
        .map(|segment| utf8_percent_encode(segment, SEGMENT).to_string())
        .collect::<Vec<_>>()
        .join("/")
}

/// Reject `%` escapes that are not followed by two hex digits and escapes
/// that do not decode to UTF-8
fn check_percent_encoding(raw: &str) -> Result<(), ResolveError> {
    let bytes = raw.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let valid = bytes
                .get(i + 1..i + 3)
                .is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit));
            if !valid {
                return Err(ResolveError::Malformed(format!(
                    "URI malformed: invalid escape at byte {i}"
                )));
            }
            i += 3;
        } else {
            i += 1;
        }
    }

    percent_decode_str(raw)
        .decode_utf8()
        .map(|_| ())
        .map_err(|e| ResolveError::Malformed(format!("URI malformed: {e}")))
}

/// Decode each segment on its own so an encoded separator cannot split one
/// segment into two
fn decode_segments(raw: &str) -> Result<Vec<String>, ResolveError> {
    raw.split(['/', '\\'])
        .map(|piece| {
            let decoded = percent_decode_str(piece)
                .decode_utf8()
                .map_err(|e| ResolveError::Malformed(format!("URI malformed: {e}")))?;
            if decoded.contains(['/', '\\', '\0']) {
                return Err(ResolveError::Malformed(
                    "Invalid separator character in path segment".to_string(),
                ));
            }
            Ok(decoded.into_owned())
        })
        .collect()
}

/// Resolve `.` and `..` lexically. Leading `..` segments that climb above
/// the URL root are kept so the containment check can see them.
fn normalize(segments: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(segments.len());
    for segment in segments {
        match segment.as_str() {
            "" | "." => {}
            ".." => {
                if out.last().is_some_and(|last| last != "..") {
                    out.pop();
                } else {
                    out.push("..".to_string());
                }
            }
            _ => out.push(segment.clone()),
        }
    }
    out
}

/// Make the normalized URL path relative to the base directory prefix
fn relative_to_base(segments: &[String], base_dir: &str) -> Vec<String> {
    let base: Vec<&str> = base_dir.split('/').filter(|s| !s.is_empty()).collect();

    let shared = base
        .iter()
        .zip(segments)
        .take_while(|(b, s)| **b == s.as_str())
        .count();

    std::iter::repeat_n("..".to_string(), base.len() - shared)
        .chain(segments[shared..].iter().cloned())
        .collect()
}

fn join_under_root(root: &Path, relative: &[String]) -> PathBuf {
    let mut file = root.to_path_buf();
    for segment in relative {
        if segment == ".." {
            file.pop();
        } else {
            file.push(segment);
        }
    }
    file
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FilesConfig;

    fn config(base_dir: &str) -> (tempfile::TempDir, ServerConfig) {
        let dir = tempfile::tempdir().unwrap();
        let files = FilesConfig {
            root: dir.path().to_string_lossy().into_owned(),
            base_dir: base_dir.to_string(),
            ..FilesConfig::default()
        };
        let cfg = ServerConfig::from_files_config(&files).unwrap();
        (dir, cfg)
    }

    #[test]
    fn test_plain_path() {
        let (_dir, cfg) = config("/");
        let r = resolve(&cfg, "/docs/readme.txt").unwrap();
        assert_eq!(r.file, cfg.root.join("docs").join("readme.txt"));
        assert_eq!(r.pathname, "/docs/readme.txt");
    }

    #[test]
    fn test_root_and_trailing_slash() {
        let (_dir, cfg) = config("/");
        let r = resolve(&cfg, "/").unwrap();
        assert_eq!(r.file, cfg.root);
        assert_eq!(r.pathname, "/");

        let r = resolve(&cfg, "/docs/").unwrap();
        assert_eq!(r.pathname, "/docs/");
    }

    #[test]
    fn test_percent_decoding_per_segment() {
        let (_dir, cfg) = config("/");
        let r = resolve(&cfg, "/my%20docs/caf%C3%A9.txt").unwrap();
        assert_eq!(r.file, cfg.root.join("my docs").join("caf\u{e9}.txt"));
        assert_eq!(r.pathname, "/my docs/caf\u{e9}.txt");
    }

    #[test]
    fn test_malformed_encoding() {
        let (_dir, cfg) = config("/");
        assert!(matches!(resolve(&cfg, "/bad%zz"), Err(ResolveError::Malformed(_))));
        assert!(matches!(resolve(&cfg, "/bad%4"), Err(ResolveError::Malformed(_))));
        assert!(matches!(resolve(&cfg, "/bad%FF"), Err(ResolveError::Malformed(_))));
    }

    #[test]
    fn test_encoded_separator_rejected() {
        let (_dir, cfg) = config("/");
        assert!(matches!(resolve(&cfg, "/a%2Fb"), Err(ResolveError::Malformed(_))));
        assert!(matches!(resolve(&cfg, "/a%5Cb"), Err(ResolveError::Malformed(_))));
        assert!(matches!(resolve(&cfg, "/a%00b"), Err(ResolveError::Malformed(_))));
    }

    #[test]
    fn test_dot_segments_inside_root() {
        let (_dir, cfg) = config("/");
        let r = resolve(&cfg, "/a/./b/../c.txt").unwrap();
        assert_eq!(r.file, cfg.root.join("a").join("c.txt"));
        assert_eq!(r.pathname, "/a/c.txt");
    }

    #[test]
    fn test_traversal_rejected() {
        let (_dir, cfg) = config("/");
        assert_eq!(resolve(&cfg, "/../../etc/passwd"), Err(ResolveError::OutsideRoot));
        assert_eq!(
            resolve(&cfg, "/%2e%2e/%2E%2E/etc/passwd"),
            Err(ResolveError::OutsideRoot)
        );
        assert_eq!(resolve(&cfg, "/a/../../x"), Err(ResolveError::OutsideRoot));
        assert_eq!(resolve(&cfg, "/..\\..\\etc\\passwd"), Err(ResolveError::OutsideRoot));
    }

    #[test]
    fn test_sibling_with_shared_prefix_is_outside() {
        let (_dir, cfg) = config("/");
        let sibling = format!(
            "/../{}-secrets/key",
            cfg.root.file_name().unwrap().to_string_lossy()
        );
        assert_eq!(resolve(&cfg, &sibling), Err(ResolveError::OutsideRoot));
    }

    #[test]
    fn test_base_dir_prefix() {
        let (_dir, cfg) = config("/static");
        let r = resolve(&cfg, "/static/app.js").unwrap();
        assert_eq!(r.file, cfg.root.join("app.js"));
        assert_eq!(r.pathname, "/static/app.js");

        // paths outside the base directory climb out of the root
        assert_eq!(resolve(&cfg, "/other/app.js"), Err(ResolveError::OutsideRoot));
    }

    #[test]
    fn test_leading_double_slash_collapses() {
        let (_dir, cfg) = config("/");
        let r = resolve(&cfg, "//evil.example/../docs").unwrap();
        assert_eq!(r.pathname, "/docs");
        assert_eq!(r.file, cfg.root.join("docs"));
    }

    #[test]
    fn test_encode_pathname() {
        assert_eq!(encode_pathname("/"), "/");
        assert_eq!(encode_pathname("/docs/"), "/docs/");
        assert_eq!(encode_pathname("/my docs/50%.txt"), "/my%20docs/50%25.txt");
        assert_eq!(encode_pathname("/a?b#c"), "/a%3Fb%23c");

        let (_dir, cfg) = config("/");
        let r = resolve(&cfg, "/caf%C3%A9/x%20y").unwrap();
        let again = resolve(&cfg, &encode_pathname(&r.pathname)).unwrap();
        assert_eq!(again, r);
    }
}
