//! Incoming HTTP request type.

use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;

use bytes::Bytes;
use http::header::{AUTHORIZATION, USER_AGENT};
use http::{HeaderMap, Method, Uri, Version};

use crate::response::ResponseHeaders;

/// An incoming HTTP request.
///
/// Built by the server from the hyper request and the peer address. Tests
/// and embedders can build one from a plain [`http::Request`]:
///
/// ```rust
/// use bytes::Bytes;
/// use portcullis::Request;
///
/// let req: Request = http::Request::builder()
///     .uri("/users/42")
///     .header("authorization", "Bearer abc")
///     .body(Bytes::new())
///     .unwrap()
///     .into();
/// assert_eq!(req.credential(), Some("Bearer abc"));
/// ```
pub struct Request {
    pub(crate) method: Method,
    pub(crate) uri: Uri,
    pub(crate) version: Version,
    pub(crate) headers: HeaderMap,
    pub(crate) body: Bytes,
    pub(crate) params: HashMap<String, String>,
    pub(crate) remote_addr: Option<SocketAddr>,
    pub(crate) response_headers: ResponseHeaders,
}

impl Request {
    pub(crate) fn from_parts(
        parts: http::request::Parts,
        body: Bytes,
        remote_addr: Option<SocketAddr>,
    ) -> Self {
        Self {
            method: parts.method,
            uri: parts.uri,
            version: parts.version,
            headers: parts.headers,
            body,
            params: HashMap::new(),
            remote_addr,
            response_headers: ResponseHeaders::default(),
        }
    }

    /// Attaches the peer address. The server does this for every request.
    pub fn with_remote_addr(mut self, addr: SocketAddr) -> Self {
        self.remote_addr = Some(addr);
        self
    }

    pub fn method(&self) -> &Method { &self.method }
    pub fn uri(&self) -> &Uri { &self.uri }
    pub fn path(&self) -> &str { self.uri.path() }
    pub fn version(&self) -> Version { self.version }
    pub fn headers(&self) -> &HeaderMap { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }
    pub fn remote_addr(&self) -> Option<SocketAddr> { self.remote_addr }

    /// Header lookup. Names are case-insensitive; values that are not
    /// visible ASCII are treated as absent.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// The `User-Agent` header, or `""` when the client sent none.
    pub fn user_agent(&self) -> &str {
        self.headers.get(USER_AGENT).and_then(|v| v.to_str().ok()).unwrap_or("")
    }

    /// The `Authorization` header value, if any and if it is visible ASCII.
    pub fn credential(&self) -> Option<&str> {
        self.headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok())
    }

    /// True when a non-empty `Authorization` header is present, whatever
    /// bytes it carries.
    pub fn has_credential(&self) -> bool {
        self.headers.get(AUTHORIZATION).is_some_and(|v| !v.as_bytes().is_empty())
    }

    /// Path and query as sent by the client (`/search?q=rust`).
    pub fn target(&self) -> &str {
        self.uri.path_and_query().map_or_else(|| self.uri.path(), |pq| pq.as_str())
    }

    /// Returns a named path parameter.
    ///
    /// For a route `/users/{id}`, `req.param("id")` on `/users/42` returns `Some("42")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// The staged response headers for this request.
    ///
    /// Headers set here before delegating end up on whatever response the
    /// chain produces, including redirects and recovered errors.
    pub fn response_headers(&self) -> &ResponseHeaders {
        &self.response_headers
    }

    /// An owned snapshot of the fields the access log and error reporter use.
    pub fn info(&self) -> RequestInfo {
        RequestInfo {
            remote_addr: self.remote_addr,
            version: self.version,
            user_agent: self.user_agent().to_owned(),
            method: self.method.clone(),
            target: self.target().to_owned(),
        }
    }
}

impl From<http::Request<Bytes>> for Request {
    fn from(req: http::Request<Bytes>) -> Self {
        let (parts, body) = req.into_parts();
        Self::from_parts(parts, body, None)
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("method", &self.method)
            .field("uri", &self.uri)
            .field("version", &self.version)
            .field("remote_addr", &self.remote_addr)
            .finish_non_exhaustive()
    }
}

// ── RequestInfo ───────────────────────────────────────────────────────────────

/// What gets logged about a request.
///
/// Outlives the [`Request`] itself, which is moved down the chain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestInfo {
    pub remote_addr: Option<SocketAddr>,
    pub version: Version,
    pub user_agent: String,
    pub method: Method,
    pub target: String,
}

/// `127.0.0.1:51234::HTTP/1.1 {curl/8.5.0} - GET /users/42`
impl fmt::Display for RequestInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.remote_addr {
            Some(addr) => write!(f, "{addr}")?,
            None => f.write_str("-")?,
        }
        write!(
            f,
            "::{:?} {{{}}} - {} {}",
            self.version, self.user_agent, self.method, self.target,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(uri: &str) -> Request {
        http::Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(USER_AGENT, "curl/8.5.0")
            .body(Bytes::from_static(b"{}"))
            .unwrap()
            .into()
    }

    #[test]
    fn target_keeps_the_query_string() {
        let req = request("/search?q=rust");
        assert_eq!(req.path(), "/search");
        assert_eq!(req.target(), "/search?q=rust");
    }

    #[test]
    fn header_lookup_ignores_case() {
        let req = request("/");
        assert_eq!(req.header("User-Agent"), Some("curl/8.5.0"));
        assert_eq!(req.credential(), None);
    }

    #[test]
    fn non_ascii_credential_is_still_a_credential() {
        let req: Request = http::Request::builder()
            .uri("/")
            .header(AUTHORIZATION, http::HeaderValue::from_bytes(b"Bearer \xe9").unwrap())
            .body(Bytes::new())
            .unwrap()
            .into();
        assert_eq!(req.credential(), None);
        assert!(req.has_credential());
        assert!(!request("/").has_credential());
    }

    #[test]
    fn info_renders_the_access_line() {
        let req = request("/users/42").with_remote_addr("127.0.0.1:51234".parse().unwrap());
        assert_eq!(
            req.info().to_string(),
            "127.0.0.1:51234::HTTP/1.1 {curl/8.5.0} - POST /users/42",
        );
    }

    #[test]
    fn info_without_peer_uses_a_dash() {
        let line = request("/").info().to_string();
        assert!(line.starts_with("-::HTTP/1.1"), "{line}");
    }
}
