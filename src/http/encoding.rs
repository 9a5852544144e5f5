//! Accept-Encoding parsing
//!
//! Only decides what the client is willing to receive. Whether a matching
//! pre-compressed file exists is the handler's business.

/// Content codings a pre-compressed sidecar can carry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentEncoding {
    Brotli,
    Gzip,
}

impl ContentEncoding {
    /// `Content-Encoding` header value
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Brotli => "br",
            Self::Gzip => "gzip",
        }
    }

    /// File name suffix of the sidecar holding this encoding
    pub const fn suffix(self) -> &'static str {
        match self {
            Self::Brotli => ".br",
            Self::Gzip => ".gz",
        }
    }

    /// Codings in the client's Accept-Encoding that allow this sidecar
    const fn accepted_by(self) -> &'static [&'static str] {
        match self {
            Self::Brotli => &["br", "*"],
            Self::Gzip => &["gzip", "compress", "deflate", "*"],
        }
    }
}

/// Parse quality value from Accept-Encoding part (e.g., "gzip;q=0.5" -> 0.5)
fn parse_quality(part: &str) -> f32 {
    part.split(';')
        .skip(1)
        .find_map(|param| param.trim().strip_prefix("q="))
        .and_then(|q| q.trim().parse::<f32>().ok())
        .unwrap_or(1.0)
}

/// Check whether the client accepts the given sidecar encoding
///
/// Any listed coding that allows the encoding counts, unless it was
/// explicitly refused with `q=0`.
pub fn accepts(accept_encoding: Option<&str>, encoding: ContentEncoding) -> bool {
    let Some(header) = accept_encoding else {
        return false;
    };

    header.split(',').any(|part| {
        let coding = part.split(';').next().unwrap_or_default().trim();
        encoding
            .accepted_by()
            .iter()
            .any(|name| coding.eq_ignore_ascii_case(name))
            && parse_quality(part) > 0.0
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_brotli() {
        assert!(accepts(Some("gzip, deflate, br"), ContentEncoding::Brotli));
        assert!(accepts(Some("*"), ContentEncoding::Brotli));
        assert!(!accepts(Some("gzip"), ContentEncoding::Brotli));
        assert!(!accepts(None, ContentEncoding::Brotli));
    }

    #[test]
    fn test_gzip_aliases() {
        assert!(accepts(Some("gzip"), ContentEncoding::Gzip));
        assert!(accepts(Some("deflate"), ContentEncoding::Gzip));
        assert!(accepts(Some("compress"), ContentEncoding::Gzip));
        assert!(accepts(Some("GZIP;q=0.8"), ContentEncoding::Gzip));
        assert!(!accepts(Some("br, identity"), ContentEncoding::Gzip));
    }

    #[test]
    fn test_refused_with_zero_quality() {
        assert!(!accepts(Some("gzip;q=0"), ContentEncoding::Gzip));
        assert!(!accepts(Some("br;q=0.0, identity"), ContentEncoding::Brotli));
    }

    #[test]
    fn test_header_values() {
        assert_eq!(ContentEncoding::Brotli.as_str(), "br");
        assert_eq!(ContentEncoding::Gzip.suffix(), ".gz");
    }
}
