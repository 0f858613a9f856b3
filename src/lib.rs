//! # portcullis
//!
//! A minimal HTTP framework built around one idea: an ordered middleware
//! pipeline where a fault anywhere downstream is contained exactly once.
//!
//! ## The contract
//!
//! A request enters the first middleware, walks inward to the handler, and
//! the response walks back out the same way:
//!
//! ```text
//! panic_recovery ─▶ request_logger ─▶ secure_headers ─▶ authorize ─▶ handler
//! ```
//!
//! - **Order is behaviour.** The first layer added is the outermost.
//! - **Headers are staged.** Middleware sets response headers before
//!   delegating; they land on whatever comes back, even a recovered 500.
//! - **Collaborators are injected.** The access log, authorization policy
//!   and error reporter live in [`middleware::Services`], not in globals.
//!
//! What's left for the framework:
//!
//! - Radix-tree routing — O(path-length) lookup via [`matchit`]
//! - Async I/O — tokio + hyper, HTTP/1.1 and HTTP/2
//! - Graceful shutdown — SIGTERM / Ctrl-C, drains in-flight requests
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use http::Method;
//! use portcullis::middleware::{Pipeline, Services};
//! use portcullis::{Request, Response, Router, Server};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), portcullis::Error> {
//!     let services = Services::default();
//!
//!     let app = Router::new()
//!         .on(Method::GET, "/users/{id}", get_user)
//!         .middleware(Pipeline::standard(&services));
//!
//!     Server::bind("0.0.0.0:3000")?.serve(app).await
//! }
//!
//! async fn get_user(req: Request) -> Response {
//!     let id = req.param("id").unwrap_or("unknown");
//!     Response::json(format!(r#"{{"id":"{id}"}}"#))
//! }
//! ```

mod error;
mod handler;
mod request;
mod response;
mod router;
mod server;

pub mod middleware;

pub use error::Error;
pub use handler::{BoxFuture, Handler};
pub use request::{Request, RequestInfo};
pub use response::{IntoResponse, Response, ResponseBuilder, ResponseHeaders};
pub use router::Router;
pub use server::Server;
