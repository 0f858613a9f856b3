//! Browser hardening headers.

use http::HeaderValue;
use http::header::{X_FRAME_OPTIONS, X_XSS_PROTECTION};

use crate::request::Request;

use super::{Middleware, Next};

/// Stages two headers on every response before delegating:
///
/// - `X-XSS-Protection: 1; mode=block` — legacy XSS auditor, blocking mode
/// - `X-Frame-Options: deny` — no framing, anywhere
///
/// Staged headers also land on redirects and recovered 500s. A handler that
/// sets either header itself keeps its own value.
pub fn secure_headers() -> impl Middleware {
    |req: Request, next: Next| {
        let headers = req.response_headers();
        headers.set(X_XSS_PROTECTION, HeaderValue::from_static("1; mode=block"));
        headers.set(X_FRAME_OPTIONS, HeaderValue::from_static("deny"));
        next.run(req)
    }
}
