//! Authorization gate.
//!
//! The gate itself is policy-agnostic: it asks a [`Policy`] and either
//! delegates or answers `303 See Other` pointing at the login entry point.
//!
//! # Warning
//!
//! [`PlaceholderPolicy`] is **not** a security control. It allows requests
//! that carry *no* credential and rejects those that carry one. Inject a
//! real [`Policy`] (session lookup, token signature check, …) before relying
//! on this gate.

use std::sync::Arc;

use http::header::LOCATION;
use http::{HeaderValue, StatusCode};
use percent_encoding::percent_decode_str;

use crate::request::Request;
use crate::response::Response;

use super::{Middleware, Next};

/// Decides whether a request may reach the handler.
///
/// Closures `Fn(&Request) -> bool` are policies too:
///
/// ```rust
/// use std::sync::Arc;
/// use portcullis::middleware::{Policy, authorize};
/// use portcullis::Request;
///
/// let bearer_only = |req: &Request| req.credential().is_some_and(|c| c.starts_with("Bearer "));
/// let gate = authorize(Arc::new(bearer_only), "/login");
/// # let _ = gate;
/// ```
pub trait Policy: Send + Sync + 'static {
    fn allows(&self, req: &Request) -> bool;
}

impl<F> Policy for F
where
    F: Fn(&Request) -> bool + Send + Sync + 'static,
{
    fn allows(&self, req: &Request) -> bool {
        self(req)
    }
}

/// Stand-in policy until real credential checks exist.
///
/// - A path containing any public marker (`static`, `auth` by default) is
///   always allowed.
/// - Any other path is allowed only when the `Authorization` header is
///   absent or empty. Yes, that is backwards; see the module docs.
#[derive(Clone, Debug)]
pub struct PlaceholderPolicy {
    public_markers: Vec<String>,
}

impl PlaceholderPolicy {
    pub fn new<I, S>(public_markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { public_markers: public_markers.into_iter().map(Into::into).collect() }
    }

    /// Markers match the percent-decoded path, so `/%73tatic/` is public too.
    fn is_public(&self, path: &str) -> bool {
        let path = percent_decode_str(path).decode_utf8_lossy();
        self.public_markers.iter().any(|m| path.contains(m.as_str()))
    }
}

impl Default for PlaceholderPolicy {
    fn default() -> Self {
        Self::new(["static", "auth"])
    }
}

impl Policy for PlaceholderPolicy {
    fn allows(&self, req: &Request) -> bool {
        // TODO: verify the credential instead of testing for its absence.
        self.is_public(req.path()) || !req.has_credential()
    }
}

/// Delegates when `policy` allows the request, otherwise redirects to
/// `entry_point` with `303 See Other` and stops the chain.
///
/// # Panics
///
/// Panics at startup if `entry_point` is not a valid `Location` value.
pub fn authorize(policy: Arc<dyn Policy>, entry_point: &str) -> impl Middleware + use<> {
    let location = HeaderValue::try_from(entry_point)
        .unwrap_or_else(|e| panic!("invalid auth entry point `{entry_point}`: {e}"));
    move |req: Request, next: Next| {
        let policy = Arc::clone(&policy);
        let location = location.clone();
        async move {
            if policy.allows(&req) {
                next.run(req).await
            } else {
                let mut res = Response::status(StatusCode::SEE_OTHER);
                res.headers_mut().insert(LOCATION, location);
                res
            }
        }
    }
}
