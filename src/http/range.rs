//! HTTP Range request parsing module
//!
//! Single-range `bytes=start-end` parsing for partial content responses.
//! Only the first range of a multi-range header is honoured.

/// Inclusive byte range inside a resource of `total` bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    /// First byte position
    pub start: u64,
    /// Last byte position (inclusive)
    pub end: u64,
}

impl ByteRange {
    /// Number of bytes covered by the range
    #[inline]
    pub const fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// `Content-Range` header value for this range
    pub fn content_range(&self, total: u64) -> String {
        format!("bytes {}-{}/{total}", self.start, self.end)
    }
}

/// Why a Range header cannot be satisfied (always answered with 416)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RangeError {
    /// Unit is not `bytes`
    Unit,
    /// Start position missing or not a number
    Start,
    /// End position present but not a number
    End,
    /// Start lies after the (clamped) end
    Inverted,
}

/// Parse an HTTP Range header against a resource of `total` bytes
///
/// - `bytes=start-end` - specific range, `end` clamped to `total - 1`
/// - `bytes=start-` - from `start` to the end of the resource
/// - `bytes=a-b,c-d` - only `a-b` is considered
///
/// Suffix ranges (`bytes=-500`) have no start and are rejected.
///
/// # Examples
/// ```ignore
/// let range = parse_range_header("bytes=0-4", 10).unwrap();
/// assert_eq!(range.content_range(10), "bytes 0-4/10");
/// ```
pub fn parse_range_header(header: &str, total: u64) -> Result<ByteRange, RangeError> {
    let spec = header
        .trim()
        .strip_prefix("bytes=")
        .ok_or(RangeError::Unit)?;

    let first = spec.split(',').next().unwrap_or_default();
    let (start_str, end_str) = first.split_once('-').ok_or(RangeError::Start)?;
    let (start_str, end_str) = (start_str.trim(), end_str.trim());

    let start = start_str.parse::<u64>().map_err(|_| RangeError::Start)?;

    // An empty resource has no last byte, so nothing can be satisfied
    let Some(last) = total.checked_sub(1) else {
        return Err(RangeError::Inverted);
    };

    let end = if end_str.is_empty() {
        last
    } else {
        end_str
            .parse::<u64>()
            .map_err(|_| RangeError::End)?
            .min(last)
    };

    if start > end {
        return Err(RangeError::Inverted);
    }

    Ok(ByteRange { start, end })
}
