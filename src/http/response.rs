//! HTTP response building module
//!
//! Body helpers shared by every response, and [`Status`], the single place
//! where terminal error and "not modified" responses are produced.

use std::io;

use futures_util::TryStreamExt;
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, Empty, Full, StreamBody};
use hyper::body::{Bytes, Frame};
use hyper::header::{self, HeaderValue};
use hyper::{Response, StatusCode};
use tokio_util::io::ReaderStream;

use crate::fs::FileReader;
use crate::logger;

/// Body type of every response the server writes
pub type ServeBody = UnsyncBoxBody<Bytes, io::Error>;

/// Continuation handed a terminal status instead of writing it directly
pub type Fallthrough = dyn Fn(Status) -> Response<ServeBody> + Send + Sync;

pub fn empty() -> ServeBody {
    Empty::<Bytes>::new()
        .map_err(|never| match never {})
        .boxed_unsync()
}

pub fn full(data: impl Into<Bytes>) -> ServeBody {
    Full::new(data.into())
        .map_err(|never| match never {})
        .boxed_unsync()
}

/// Stream a file to the client
///
/// The reader is owned by the body: when the client goes away the body is
/// dropped and the file handle closes with it.
pub fn stream(reader: FileReader) -> ServeBody {
    StreamBody::new(ReaderStream::new(reader).map_ok(Frame::data)).boxed_unsync()
}

/// Terminal outcomes of a request that never carry file content
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    /// 304, empty body
    NotModified,
    /// 400, with an optional description of what was malformed
    BadRequest(Option<String>),
    /// 403
    Forbidden,
    /// 404
    NotFound,
    /// 405, advertises the served methods
    MethodNotAllowed,
    /// 416 against a resource of `total` bytes
    RangeNotSatisfiable { total: u64 },
    /// 500 carrying the triggering error text
    InternalError(String),
}

impl Status {
    pub const fn code(&self) -> StatusCode {
        match self {
            Self::NotModified => StatusCode::NOT_MODIFIED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::RangeNotSatisfiable { .. } => StatusCode::RANGE_NOT_SATISFIABLE,
            Self::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Produce the terminal response, or hand over to `next` when given
    pub fn respond(self, next: Option<&Fallthrough>) -> Response<ServeBody> {
        match next {
            Some(next) => next(self),
            None => self.into_response(),
        }
    }

    /// Build this status' own response
    pub fn into_response(self) -> Response<ServeBody> {
        let code = self.code();
        let builder = Response::builder().status(code);
        let built = match self {
            Self::NotModified => builder.body(empty()),
            Self::BadRequest(message) => builder
                .header(header::CONTENT_TYPE, "text/plain")
                .body(full(message.unwrap_or_else(|| "Malformed request.".to_string()))),
            Self::Forbidden => builder
                .header(header::CONTENT_TYPE, "text/plain")
                .body(full("ACCESS DENIED")),
            Self::NotFound => builder
                .header(header::CONTENT_TYPE, "text/plain")
                .body(full("File not found. :(")),
            Self::MethodNotAllowed => builder
                .header(header::ALLOW, "GET, HEAD")
                .header(header::CONTENT_LENGTH, 0)
                .body(empty()),
            Self::RangeNotSatisfiable { total } => builder
                .header(header::CONTENT_TYPE, "text/plain")
                .header(header::CONTENT_RANGE, format!("bytes */{total}"))
                .body(full("Requested range not satisfiable")),
            Self::InternalError(message) => builder
                .header(header::CONTENT_TYPE, "text/html")
                .body(full(internal_error_page(&message))),
        };
        built.unwrap_or_else(|e| {
            log_build_error(code.as_str(), &e);
            fallback(code)
        })
    }
}

fn internal_error_page(message: &str) -> String {
    let message = if message.is_empty() {
        "No specified error"
    } else {
        message
    };
    format!(
        "<!doctype html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n\
         <title>500 Internal Server Error</title>\n</head>\n<body>\n\
         <h1>Internal Server Error</h1>\n<pre>{}</pre>\n</body>\n</html>\n",
        escape_html(message)
    )
}

/// Escape text for embedding in HTML element content or attributes
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

/// Build 200 response for OPTIONS short-circuit
pub fn build_options_response() -> Response<ServeBody> {
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_LENGTH, 0)
        .body(empty())
        .unwrap_or_else(|e| {
            log_build_error("OPTIONS", &e);
            fallback(StatusCode::OK)
        })
}

/// Build 302 redirect response
pub fn build_redirect_response(location: &str) -> Response<ServeBody> {
    Response::builder()
        .status(StatusCode::FOUND)
        .header(header::LOCATION, location)
        .header(header::CONTENT_LENGTH, 0)
        .body(empty())
        .unwrap_or_else(|e| {
            log_build_error("302", &e);
            Status::InternalError(format!("invalid redirect target: {e}")).into_response()
        })
}

/// Build generic HTML response
pub fn build_html_response(content: String, is_head: bool) -> Response<ServeBody> {
    let content_length = content.len();
    let body = if is_head { empty() } else { full(content) };

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/html; charset=utf-8")
        .header(header::CONTENT_LENGTH, content_length)
        .body(body)
        .unwrap_or_else(|e| {
            log_build_error("HTML", &e);
            fallback(StatusCode::INTERNAL_SERVER_ERROR)
        })
}

/// Insert a header whose value may come from untrusted input
pub fn set_header(response: &mut Response<ServeBody>, name: header::HeaderName, value: &str) {
    match HeaderValue::from_str(value) {
        Ok(value) => {
            response.headers_mut().insert(name, value);
        }
        Err(e) => logger::log_warning(&format!("Dropping invalid {name} header value: {e}")),
    }
}

fn fallback(code: StatusCode) -> Response<ServeBody> {
    let mut response = Response::new(empty());
    *response.status_mut() = code;
    response
}

/// Log response build error
fn log_build_error(status: &str, error: &hyper::http::Error) {
    logger::log_error(&format!("Failed to build {status} response: {error}"));
}
