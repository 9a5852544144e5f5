//! Static file serving module
//!
//! [`StaticHandler`] turns one request into one response: resolve the path,
//! pick a pre-compressed sidecar, stat, then serve a file, a listing, a
//! redirect or a terminal status. A missing resource walks a short,
//! forward-only chain of alternate attempts (default extension, directory
//! index, custom not-found page).

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use hyper::header::{self, HeaderMap, HeaderName, HeaderValue};
use hyper::{Method, Request, Response, StatusCode};

use super::listing;
use super::negotiate::{negotiate, NegotiatedFile};
use super::resolve::{encode_pathname, resolve, ResolveError, Resolved};
use crate::config::ServerConfig;
use crate::fs::{is_missing, FileSystem, ResourceStat};
use crate::http::response::{
    build_html_response, build_options_response, build_redirect_response, empty, set_header,
    stream,
};
use crate::http::{cache, charset, etag, mime, parse_range_header, Fallthrough, ServeBody, Status};

/// Each transition strictly raises [`Attempt::rank`], so a request never
/// needs more attempts than there are kinds of attempt
const MAX_ATTEMPTS: usize = 4;

/// Serves files below one root with one fixed set of options
pub struct StaticHandler {
    config: Arc<ServerConfig>,
    fs: Arc<dyn FileSystem>,
}

/// A directory reached by the request, kept while its index is tried
#[derive(Debug, Clone)]
struct DirectoryContext {
    dir: PathBuf,
    pathname: String,
    stat: ResourceStat,
}

/// What the current lookup is trying to find
#[derive(Debug, Clone)]
enum Attempt {
    /// The path the client asked for
    Requested,
    /// The requested path with the default extension appended
    DefaultExtension,
    /// The index file of a directory
    DirectoryIndex(DirectoryContext),
    /// The custom not-found page, served with status 404
    NotFoundPage,
}

impl Attempt {
    const fn rank(&self) -> u8 {
        match self {
            Self::Requested => 0,
            Self::DefaultExtension => 1,
            Self::DirectoryIndex(_) => 2,
            Self::NotFoundPage => 3,
        }
    }

    const fn label(&self) -> &'static str {
        match self {
            Self::Requested => "requested",
            Self::DefaultExtension => "default extension",
            Self::DirectoryIndex(_) => "directory index",
            Self::NotFoundPage => "not-found page",
        }
    }
}

enum Step {
    Done(Response<ServeBody>),
    Retry {
        attempt: Attempt,
        raw_path: String,
        target: Resolved,
    },
}

/// Request data the handler reads, detached from the request body
struct RequestHead {
    method: Method,
    path: String,
    query: Option<String>,
    headers: HeaderMap,
}

impl RequestHead {
    fn from_request<B>(req: &Request<B>) -> Self {
        Self {
            method: req.method().clone(),
            path: req.uri().path().to_string(),
            query: req.uri().query().map(ToString::to_string),
            headers: req.headers().clone(),
        }
    }

    fn header(&self, name: HeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    fn is_head(&self) -> bool {
        self.method == Method::HEAD
    }
}

/// Cache validators of one resource
struct Validators {
    etag: String,
    modified: SystemTime,
    cache_control: String,
}

impl Validators {
    fn new(stat: &ResourceStat, config: &ServerConfig, pathname: &str) -> Self {
        Self {
            etag: etag::generate_etag(stat, config.weak_etags),
            modified: stat.modified,
            cache_control: config.cache.to_header_value(pathname),
        }
    }

    fn is_fresh(&self, head: &RequestHead, weak_compare: bool) -> bool {
        cache::is_not_modified(
            head.header(header::IF_MODIFIED_SINCE),
            head.header(header::IF_NONE_MATCH),
            self.modified,
            &self.etag,
            weak_compare,
        )
    }

    fn apply(&self, response: &mut Response<ServeBody>) {
        set_header(response, header::ETAG, &self.etag);
        set_header(
            response,
            header::LAST_MODIFIED,
            &httpdate::fmt_http_date(self.modified),
        );
        set_header(response, header::CACHE_CONTROL, &self.cache_control);
    }

    fn not_modified(&self, next: Option<&Fallthrough>) -> Response<ServeBody> {
        let mut response = Status::NotModified.respond(next);
        if response.status() == StatusCode::NOT_MODIFIED {
            self.apply(&mut response);
        }
        response
    }
}

impl StaticHandler {
    pub fn new(config: Arc<ServerConfig>, fs: Arc<dyn FileSystem>) -> Self {
        Self { config, fs }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Answer one request
    ///
    /// Terminal statuses are handed to `next` when it is given, so an outer
    /// layer can take over requests this handler declines. Configured extra
    /// headers are added to every response.
    pub fn handle<'a, B>(
        &'a self,
        req: &Request<B>,
        next: Option<&'a Fallthrough>,
    ) -> impl Future<Output = Response<ServeBody>> + Send + 'a {
        self.serve(RequestHead::from_request(req), next)
    }

    async fn serve(&self, head: RequestHead, next: Option<&Fallthrough>) -> Response<ServeBody> {
        let mut response = self.respond(&head, next).await;
        for (name, value) in &self.config.headers {
            response
                .headers_mut()
                .entry(name.clone())
                .or_insert_with(|| value.clone());
        }
        response
    }

    async fn respond(&self, head: &RequestHead, next: Option<&Fallthrough>) -> Response<ServeBody> {
        let resolved = resolve(&self.config, &head.path);
        if let Err(ResolveError::Malformed(reason)) = &resolved {
            tracing::debug!("Rejecting {}: {reason}", head.path);
            return Status::BadRequest(Some(reason.clone())).respond(next);
        }

        if head.method == Method::OPTIONS && self.config.handle_options {
            return build_options_response();
        }

        let Ok(mut target) = resolved else {
            tracing::warn!("Path traversal attempt blocked: {}", head.path);
            return Status::Forbidden.respond(next);
        };

        if head.method != Method::GET && !head.is_head() {
            return Status::MethodNotAllowed.respond(next);
        }

        let mut attempt = Attempt::Requested;
        let mut raw_path = head.path.clone();
        for _ in 0..MAX_ATTEMPTS {
            match self.attempt(head, &attempt, &target, next).await {
                Step::Done(response) => return response,
                Step::Retry {
                    attempt: following,
                    raw_path: following_path,
                    target: following_target,
                } => {
                    if following.rank() <= attempt.rank() {
                        tracing::error!(
                            "Fallback from {} to {} does not advance",
                            attempt.label(),
                            following.label()
                        );
                        break;
                    }
                    tracing::debug!(
                        "{} miss for {raw_path}, trying {} at {following_path}",
                        attempt.label(),
                        following.label()
                    );
                    attempt = following;
                    raw_path = following_path;
                    target = following_target;
                }
            }
        }

        Status::NotFound.respond(next)
    }

    async fn attempt(
        &self,
        head: &RequestHead,
        attempt: &Attempt,
        target: &Resolved,
        next: Option<&Fallthrough>,
    ) -> Step {
        let negotiated = negotiate(
            self.fs.as_ref(),
            &self.config,
            &target.file,
            head.header(header::ACCEPT_ENCODING),
        )
        .await;

        let stat = match negotiated.stat {
            Some(stat) => Ok(stat),
            None => self.fs.stat(&negotiated.path).await,
        };

        match stat {
            Ok(stat) if stat.is_dir => match attempt {
                Attempt::Requested => self.on_directory(head, target, stat, next).await,
                _ => self.on_missing(head, attempt, target, next).await,
            },
            Ok(stat) => Step::Done(
                self.serve_file(head, attempt, target, &negotiated, stat, next)
                    .await,
            ),
            Err(e) if is_missing(&e) => self.on_missing(head, attempt, target, next).await,
            Err(e) => {
                if let Attempt::DirectoryIndex(dir) = attempt {
                    return Step::Done(self.index_fallback(head, dir, next).await);
                }
                tracing::error!("Failed to stat {}: {e}", negotiated.path.display());
                Step::Done(Status::InternalError(e.to_string()).respond(next))
            }
        }
    }

    async fn on_missing(
        &self,
        head: &RequestHead,
        attempt: &Attempt,
        target: &Resolved,
        next: Option<&Fallthrough>,
    ) -> Step {
        match attempt {
            Attempt::Requested => match self.config.default_ext.as_deref() {
                Some(ext) if lacks_extension(&target.pathname) => {
                    let path = format!("{}.{ext}", encode_pathname(&target.pathname));
                    self.retry(Attempt::DefaultExtension, path, next)
                }
                _ => self.not_found(next),
            },
            Attempt::DefaultExtension => self.not_found(next),
            Attempt::DirectoryIndex(dir) => Step::Done(self.index_fallback(head, dir, next).await),
            Attempt::NotFoundPage => Step::Done(Status::NotFound.respond(next)),
        }
    }

    fn not_found(&self, next: Option<&Fallthrough>) -> Step {
        if self.config.handle_error {
            self.retry(Attempt::NotFoundPage, self.config.not_found_path(), next)
        } else {
            Step::Done(Status::NotFound.respond(next))
        }
    }

    fn retry(&self, attempt: Attempt, raw_path: String, next: Option<&Fallthrough>) -> Step {
        match resolve(&self.config, &raw_path) {
            Ok(target) => Step::Retry {
                attempt,
                raw_path,
                target,
            },
            Err(ResolveError::Malformed(reason)) => {
                Step::Done(Status::BadRequest(Some(reason)).respond(next))
            }
            Err(ResolveError::OutsideRoot) => Step::Done(Status::Forbidden.respond(next)),
        }
    }

    async fn on_directory(
        &self,
        head: &RequestHead,
        target: &Resolved,
        stat: ResourceStat,
        next: Option<&Fallthrough>,
    ) -> Step {
        if !self.config.auto_index && !self.config.show_dir {
            return Step::Done(Status::NotFound.respond(next));
        }

        // Built from the normalized pathname so `//host/..` cannot turn
        // into a protocol-relative Location
        if !target.pathname.ends_with('/') {
            let query = head.query.as_deref().map(|q| format!("?{q}")).unwrap_or_default();
            let location = format!("{}/{query}", encode_pathname(&target.pathname));
            return Step::Done(build_redirect_response(&location));
        }

        let dir = DirectoryContext {
            dir: target.file.clone(),
            pathname: target.pathname.clone(),
            stat,
        };

        if self.config.auto_index {
            let index = format!(
                "{}{}",
                encode_pathname(&target.pathname),
                self.config.index_file()
            );
            return self.retry(Attempt::DirectoryIndex(dir), index, next);
        }

        Step::Done(self.list_directory(head, &dir, next).await)
    }

    /// A directory whose index could not be served
    async fn index_fallback(
        &self,
        head: &RequestHead,
        dir: &DirectoryContext,
        next: Option<&Fallthrough>,
    ) -> Response<ServeBody> {
        if self.config.show_dir {
            self.list_directory(head, dir, next).await
        } else {
            Status::Forbidden.respond(next)
        }
    }

    async fn list_directory(
        &self,
        head: &RequestHead,
        dir: &DirectoryContext,
        next: Option<&Fallthrough>,
    ) -> Response<ServeBody> {
        let validators = Validators::new(&dir.stat, &self.config, &dir.pathname);
        if validators.is_fresh(head, self.config.weak_compare) {
            return validators.not_modified(next);
        }

        match listing::read_listing(self.fs.as_ref(), &self.config, &dir.dir, &dir.pathname).await
        {
            Ok(listing) => {
                let mut response =
                    build_html_response(listing::render_html(&listing), head.is_head());
                validators.apply(&mut response);
                response
            }
            Err(e) => {
                tracing::error!("Failed to list {}: {e}", dir.dir.display());
                Status::InternalError(e.to_string()).respond(next)
            }
        }
    }

    async fn serve_file(
        &self,
        head: &RequestHead,
        attempt: &Attempt,
        target: &Resolved,
        negotiated: &NegotiatedFile,
        stat: ResourceStat,
        next: Option<&Fallthrough>,
    ) -> Response<ServeBody> {
        let error_page = matches!(attempt, Attempt::NotFoundPage);
        let validators = Validators::new(&stat, &self.config, &target.pathname);

        if !error_page && validators.is_fresh(head, self.config.weak_compare) {
            return validators.not_modified(next);
        }

        // A 0-byte resource has no satisfiable range, so any Range header
        // on it ends in 416
        let range = match head.header(header::RANGE).filter(|_| !error_page) {
            Some(value) => match parse_range_header(value, stat.size) {
                Ok(range) => Some(range),
                Err(e) => {
                    tracing::debug!("Unsatisfiable range {value:?}: {e:?}");
                    return Status::RangeNotSatisfiable { total: stat.size }.respond(next);
                }
            },
            None => None,
        };

        let content_type = self.content_type(&target.file, negotiated, stat).await;

        let body = if head.is_head() {
            empty()
        } else {
            match self.fs.open_read(&negotiated.path, range).await {
                Ok(reader) => stream(reader),
                Err(e) => {
                    tracing::error!("Failed to open {}: {e}", negotiated.path.display());
                    return Status::InternalError(e.to_string()).respond(next);
                }
            }
        };

        let mut response = Response::new(body);
        *response.status_mut() = match (range, error_page) {
            (Some(_), _) => StatusCode::PARTIAL_CONTENT,
            (None, true) => StatusCode::NOT_FOUND,
            (None, false) => StatusCode::OK,
        };

        let headers = response.headers_mut();
        headers.insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));
        headers.insert(
            header::CONTENT_LENGTH,
            HeaderValue::from(range.map_or(stat.size, |r| r.len())),
        );
        if let Some(encoding) = negotiated.encoding {
            headers.insert(
                header::CONTENT_ENCODING,
                HeaderValue::from_static(encoding.as_str()),
            );
        }
        if let Some(range) = range {
            set_header(&mut response, header::CONTENT_RANGE, &range.content_range(stat.size));
        }
        set_header(&mut response, header::CONTENT_TYPE, &content_type);
        validators.apply(&mut response);
        response
    }

    /// MIME type of the logical file, with a sniffed charset for
    /// uncompressed text
    async fn content_type(
        &self,
        logical: &Path,
        negotiated: &NegotiatedFile,
        stat: ResourceStat,
    ) -> String {
        let name = logical
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default();
        let content_type =
            mime::get_content_type(&name, &self.config.mime_types, &self.config.content_type);

        if negotiated.encoding.is_some()
            || !mime::is_text(&content_type)
            || content_type.contains("charset=")
        {
            return content_type;
        }

        let detected = if stat.size <= charset::SNIFF_LIMIT {
            match self.fs.read_prefix(&negotiated.path, charset::SNIFF_LIMIT).await {
                Ok(bytes) => charset::sniff(&bytes),
                Err(e) => {
                    tracing::debug!("Charset sniffing failed for {}: {e}", negotiated.path.display());
                    charset::DEFAULT_CHARSET
                }
            }
        } else {
            charset::DEFAULT_CHARSET
        };
        charset::with_charset(&content_type, detected)
    }
}

/// True for `/about` and `/.profile`, false for `/about.html` and `/docs/`
fn lacks_extension(pathname: &str) -> bool {
    !pathname.ends_with('/') && Path::new(pathname).extension().is_none()
}
