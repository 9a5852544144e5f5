// Connection handling module
// Serves one accepted TCP connection on its own task

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::net::TcpStream;

use crate::config::AppState;
use crate::handler;
use crate::logger;

/// Serve a single connection in a spawned task.
///
/// The connection as a whole is bounded by the larger of the configured
/// read and write timeouts; when it expires the connection is dropped,
/// which also drops any file body still streaming.
pub fn handle_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    state: Arc<AppState>,
    active_connections: Arc<AtomicUsize>,
) {
    active_connections.fetch_add(1, Ordering::SeqCst);
    tracing::trace!("Accepted connection from {peer_addr}");

    tokio::spawn(async move {
        let io = TokioIo::new(stream);

        let performance = &state.config.performance;
        let timeout_duration =
            Duration::from_secs(performance.read_timeout.max(performance.write_timeout));

        let mut builder = http1::Builder::new();
        builder.keep_alive(performance.keep_alive_timeout > 0);

        let service_state = Arc::clone(&state);
        let conn = builder.serve_connection(
            io,
            service_fn(move |req| handler::handle_request(req, Arc::clone(&service_state), peer_addr)),
        );

        match tokio::time::timeout(timeout_duration, conn).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => logger::log_connection_error(&err),
            Err(_) => {
                tracing::debug!(
                    "Connection from {peer_addr} closed after {} seconds",
                    timeout_duration.as_secs()
                );
            }
        }

        active_connections.fetch_sub(1, Ordering::SeqCst);
    });
}
