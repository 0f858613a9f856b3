//! Middleware layer.
//!
//! Middleware intercepts requests and responses and is the right place for
//! cross-cutting concerns: access logging, security headers, authorization
//! gates, and panic containment.
//!
//! A middleware is any function `Fn(Request, Next) -> impl Future<Output =
//! Response>`. It may inspect or stage headers on the request, return early
//! (short-circuit), or delegate with [`Next::run`] and act again on the way
//! back out.
//!
//! ```text
//! request ─▶ m1 ─▶ m2 ─▶ … ─▶ handler
//! response ◀─ m1 ◀─ m2 ◀─ … ◀──┘
//! ```
//!
//! A [`Pipeline`] is an ordered list of middleware. The first layer added is
//! the outermost one:
//!
//! ```rust
//! use portcullis::middleware::{self, Pipeline, Services};
//! use portcullis::{Request, Response};
//!
//! async fn home(_req: Request) -> Response { Response::text("home") }
//!
//! let services = Services::default();
//! let app = Pipeline::new()
//!     .layer(middleware::panic_recovery(services.server_error.clone()))
//!     .layer(middleware::secure_headers())
//!     .wrap(home);
//! # let _ = app;
//! ```
//!
//! Built-in middleware:
//! - [`request_logger`] — one access line per request through an [`AccessLog`]
//! - [`secure_headers`] — `X-XSS-Protection` and `X-Frame-Options`
//! - [`authorize`] — [`Policy`] gate that redirects to the login entry point
//! - [`panic_recovery`] — turns a panic anywhere downstream into a 500

mod auth;
mod logger;
mod recover;
mod secure_headers;

use std::future::Future;
use std::sync::Arc;

pub use auth::{PlaceholderPolicy, Policy, authorize};
pub use logger::{AccessLog, TracingAccessLog, request_logger};
pub use recover::{LogServerError, ServerError, panic_recovery};
pub use secure_headers::secure_headers;

use crate::handler::{BoxFuture, BoxedHandler, Handler};
use crate::request::Request;
use crate::response::Response;

/// A request interceptor.
///
/// Implemented for every `Fn(Request, Next) -> impl Future<Output = Response>`
/// that is `Send + Sync + 'static`. Implement it by hand only when a closure
/// will not do.
pub trait Middleware: Send + Sync + 'static {
    fn call(&self, req: Request, next: Next) -> BoxFuture;
}

impl<F, Fut> Middleware for F
where
    F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    fn call(&self, req: Request, next: Next) -> BoxFuture {
        Box::pin(self(req, next))
    }
}

pub(crate) type BoxedMiddleware = Arc<dyn Middleware>;

// ── Next ──────────────────────────────────────────────────────────────────────

/// The rest of the chain after the current middleware.
///
/// Dropping `Next` without running it short-circuits: no later middleware
/// and not the handler will see the request.
pub struct Next {
    chain: Arc<[BoxedMiddleware]>,
    index: usize,
    endpoint: BoxedHandler,
}

impl Next {
    /// Hands `req` to the next middleware, or to the handler if none is left.
    ///
    /// Lazy: nothing downstream runs until the returned future is polled, so
    /// an outer guard also sees faults raised synchronously by inner layers.
    pub fn run(self, req: Request) -> BoxFuture {
        Box::pin(async move {
            let layer = self.chain.get(self.index).cloned();
            match layer {
                Some(layer) => {
                    let next = Next {
                        chain: self.chain,
                        index: self.index + 1,
                        endpoint: self.endpoint,
                    };
                    layer.call(req, next).await
                }
                None => self.endpoint.call(req).await,
            }
        })
    }
}

/// Runs `req` through `chain` into `endpoint`, then applies staged headers.
pub(crate) fn run(chain: Arc<[BoxedMiddleware]>, endpoint: BoxedHandler, req: Request) -> BoxFuture {
    let staged = req.response_headers().clone();
    let next = Next { chain, index: 0, endpoint };
    Box::pin(async move { next.run(req).await.with_staged(&staged) })
}

// ── Pipeline ──────────────────────────────────────────────────────────────────

/// An ordered stack of middleware.
///
/// Declaration order is execution order on the way in. Composition is
/// associative: `a.then(b).wrap(h)` behaves exactly like `a.wrap(b.wrap(h))`.
#[derive(Clone, Default)]
pub struct Pipeline {
    layers: Vec<BoxedMiddleware>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self { layers: Vec::new() }
    }

    /// The conventional stack:
    /// panic recovery → request logger → security headers → authorization.
    ///
    /// Recovery is outermost so a fault in any later layer or in the handler
    /// is contained exactly once.
    ///
    /// # Panics
    ///
    /// Panics if `services.auth_entry_point` is not a valid header value.
    pub fn standard(services: &Services) -> Self {
        Self::new()
            .layer(panic_recovery(Arc::clone(&services.server_error)))
            .layer(request_logger(Arc::clone(&services.access_log)))
            .layer(secure_headers())
            .layer(authorize(Arc::clone(&services.policy), &services.auth_entry_point))
    }

    /// Adds `middleware` inside every layer added so far.
    pub fn layer(mut self, middleware: impl Middleware) -> Self {
        self.layers.push(Arc::new(middleware));
        self
    }

    /// Appends all of `inner`'s layers inside this pipeline's layers.
    pub fn then(mut self, inner: Pipeline) -> Self {
        self.layers.extend(inner.layers);
        self
    }

    pub fn len(&self) -> usize { self.layers.len() }
    pub fn is_empty(&self) -> bool { self.layers.is_empty() }

    /// Composes the pipeline around `endpoint` into a single handler.
    ///
    /// The result is itself a [`Handler`]: register it on a router or wrap
    /// it in another pipeline.
    pub fn wrap<H: Handler>(
        &self,
        endpoint: H,
    ) -> impl Fn(Request) -> BoxFuture + Clone + Send + Sync + 'static + use<H> {
        let chain = self.freeze();
        let endpoint = endpoint.into_boxed_handler();
        move |req: Request| run(Arc::clone(&chain), Arc::clone(&endpoint), req)
    }

    pub(crate) fn freeze(&self) -> Arc<[BoxedMiddleware]> {
        self.layers.iter().cloned().collect()
    }
}

// ── Services ──────────────────────────────────────────────────────────────────

/// The application's collaborators, injected into [`Pipeline::standard`].
///
/// Everything here is shared read-only by all in-flight requests.
#[derive(Clone)]
pub struct Services {
    pub access_log: Arc<dyn AccessLog>,
    pub policy: Arc<dyn Policy>,
    pub server_error: Arc<dyn ServerError>,
    /// Where [`authorize`] sends rejected requests.
    pub auth_entry_point: String,
}

impl Default for Services {
    fn default() -> Self {
        Self {
            access_log: Arc::new(TracingAccessLog),
            policy: Arc::new(PlaceholderPolicy::default()),
            server_error: Arc::new(LogServerError),
            auth_entry_point: "/auth".to_owned(),
        }
    }
}
