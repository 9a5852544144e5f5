//! Request dispatch module
//!
//! Entry point for HTTP request processing: hands the request to the static
//! file handler and writes the access log line.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use hyper::{Request, Response};

use crate::config::AppState;
use crate::http::ServeBody;
use crate::logger::{self, AccessLogEntry};

/// Main entry point for HTTP request handling
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
    remote_addr: SocketAddr,
) -> Result<Response<ServeBody>, Infallible> {
    let started = Instant::now();
    let logging = state.logging();
    let mut entry = logging.access_log.then(|| {
        AccessLogEntry::for_request(
            remote_addr,
            req.method(),
            req.uri(),
            req.version(),
            req.headers(),
        )
    });

    let response = state.handler.handle(&req, None).await;

    if let Some(entry) = entry.as_mut() {
        entry.finish(
            response.status().as_u16(),
            response.headers(),
            started.elapsed(),
        );
        logger::log_access(entry, &logging.access_log_format);
    }

    Ok(response)
}
