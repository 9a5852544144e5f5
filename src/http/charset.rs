//! Byte-level charset sniffing for text responses

/// Largest file that is read into memory for sniffing
pub const SNIFF_LIMIT: u64 = 1024 * 1024;

/// Charset declared when a file is too large to sniff
pub const DEFAULT_CHARSET: &str = "UTF-8";

/// Guess the character encoding of a text payload
pub fn sniff(bytes: &[u8]) -> &'static str {
    match bytes {
        [0xEF, 0xBB, 0xBF, ..] => "UTF-8",
        [0xFF, 0xFE, ..] => "UTF-16LE",
        [0xFE, 0xFF, ..] => "UTF-16BE",
        _ if std::str::from_utf8(bytes).is_ok() => "UTF-8",
        _ => "ISO-8859-1",
    }
}

/// Append a charset parameter to a MIME type
pub fn with_charset(content_type: &str, charset: &str) -> String {
    format!("{content_type}; charset={charset}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sniff() {
        assert_eq!(sniff(b"plain ascii"), "UTF-8");
        assert_eq!(sniff("caf\u{e9}".as_bytes()), "UTF-8");
        assert_eq!(sniff(&[0xEF, 0xBB, 0xBF, b'a']), "UTF-8");
        assert_eq!(sniff(&[0xFF, 0xFE, b'a', 0]), "UTF-16LE");
        assert_eq!(sniff(&[0xFE, 0xFF, 0, b'a']), "UTF-16BE");
        assert_eq!(sniff(b"caf\xe9"), "ISO-8859-1");
        assert_eq!(sniff(b""), "UTF-8");
    }

    #[test]
    fn test_with_charset() {
        assert_eq!(with_charset("text/plain", "UTF-8"), "text/plain; charset=UTF-8");
    }
}
