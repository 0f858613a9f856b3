//! Radix-tree request router.
//!
//! One tree per HTTP method. O(path-length) lookup. The router picks the
//! terminal handler; the installed [`Pipeline`] runs around it for every
//! request, matched or not.

use std::collections::HashMap;
use std::sync::Arc;

use http::{Method, StatusCode};
use matchit::Router as MatchitRouter;

use crate::handler::{BoxedHandler, Handler};
use crate::middleware::{self, BoxedMiddleware, Pipeline};
use crate::request::Request;
use crate::response::Response;

/// The application router.
///
/// Build it once at startup; pass it to [`Server::serve`](crate::Server::serve).
/// Each call returns `self` so registrations chain naturally.
pub struct Router {
    routes: HashMap<Method, MatchitRouter<BoxedHandler>>,
    chain: Arc<[BoxedMiddleware]>,
    fallback: BoxedHandler,
}

impl Router {
    pub fn new() -> Self {
        Self {
            routes: HashMap::new(),
            chain: Pipeline::new().freeze(),
            fallback: not_found.into_boxed_handler(),
        }
    }

    /// Register a handler for a method + path pair. Returns `self` for chaining.
    ///
    /// Path parameters use `{name}` syntax — `req.param("name")` retrieves them:
    ///
    /// ```rust,no_run
    /// # use http::Method;
    /// # use portcullis::{Request, Response, Router};
    /// # async fn get_user(_: Request) -> Response { Response::text("") }
    /// # async fn create_user(_: Request) -> Response { Response::text("") }
    /// Router::new()
    ///     .on(Method::GET,  "/users/{id}", get_user)
    ///     .on(Method::POST, "/users",      create_user);
    /// ```
    ///
    /// # Panics
    ///
    /// Panics at startup if `path` is malformed or conflicts with an
    /// existing route.
    pub fn on(mut self, method: Method, path: &str, handler: impl Handler) -> Self {
        self.routes
            .entry(method)
            .or_default()
            .insert(path, handler.into_boxed_handler())
            .unwrap_or_else(|e| panic!("invalid route `{path}`: {e}"));
        self
    }

    /// Installs `pipeline` around every route and the 404 fallback.
    /// Replaces any previously installed pipeline.
    pub fn middleware(mut self, pipeline: Pipeline) -> Self {
        self.chain = pipeline.freeze();
        self
    }

    pub(crate) async fn dispatch(&self, mut req: Request) -> Response {
        let endpoint = match self.lookup(&req) {
            Some((handler, params)) => {
                req.params = params;
                handler
            }
            None => Arc::clone(&self.fallback),
        };
        middleware::run(Arc::clone(&self.chain), endpoint, req).await
    }

    fn lookup(&self, req: &Request) -> Option<(BoxedHandler, HashMap<String, String>)> {
        let tree = self.routes.get(req.method())?;
        let matched = tree.at(req.path()).ok()?;
        let handler = Arc::clone(matched.value);
        let params = matched.params.iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        Some((handler, params))
    }
}

impl Default for Router {
    fn default() -> Self { Self::new() }
}

async fn not_found(_req: Request) -> StatusCode {
    StatusCode::NOT_FOUND
}
