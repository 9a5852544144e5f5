//! HTTP protocol layer module
//!
//! Provides HTTP protocol-related base functionality, decoupled from the
//! filesystem and from request dispatch.

pub mod cache;
pub mod charset;
pub mod encoding;
pub mod etag;
pub mod mime;
pub mod range;
pub mod response;

// Re-export commonly used types
pub use cache::CachePolicy;
pub use encoding::ContentEncoding;
pub use range::{parse_range_header, ByteRange};
pub use response::{Fallthrough, ServeBody, Status};
