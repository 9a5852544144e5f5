//! Request handler module
//!
//! Maps requests onto files below the served root: path resolution, sidecar
//! negotiation, directory listings and the serving state machine.

pub mod listing;
mod negotiate;
pub mod resolve;
pub mod router;
pub mod static_files;

// Re-export main entry points
pub use router::handle_request;
pub use static_files::StaticHandler;
