//! Panic containment.
//!
//! A panic in a handler or in a middleware inside this one must not take the
//! connection task down with it. [`panic_recovery`] catches the unwind,
//! turns it into [`Error::Panic`], lets a [`ServerError`] build the
//! response, and marks the connection `close`: whatever state the panicking
//! code left behind, the client gets a fresh connection next time.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use futures_util::FutureExt;
use http::header::CONNECTION;
use http::{HeaderValue, StatusCode};
use tracing::error;

use crate::error::Error;
use crate::request::{Request, RequestInfo};
use crate::response::Response;

use super::{Middleware, Next};

/// Turns a contained fault into the response the client sees.
pub trait ServerError: Send + Sync + 'static {
    fn respond(&self, info: &RequestInfo, err: &Error) -> Response;
}

/// Default reporter: logs at `error` level and answers
/// `500 Internal Server Error` with the canonical reason as body.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogServerError;

impl ServerError for LogServerError {
    fn respond(&self, info: &RequestInfo, err: &Error) -> Response {
        error!(
            method = %info.method,
            path = %info.target,
            remote = ?info.remote_addr,
            "{err}",
        );
        internal_server_error()
    }
}

/// Catches any panic downstream and answers through `reporter`.
///
/// Add it first so it wraps every other layer. The fault is reported once,
/// here, and never rethrown.
pub fn panic_recovery(reporter: Arc<dyn ServerError>) -> impl Middleware {
    move |req: Request, next: Next| {
        let reporter = Arc::clone(&reporter);
        async move {
            let info = req.info();
            match AssertUnwindSafe(next.run(req)).catch_unwind().await {
                Ok(res) => res,
                Err(payload) => {
                    let err = Error::Panic(panic_message(&*payload));
                    let report = AssertUnwindSafe(|| reporter.respond(&info, &err));
                    let mut res = panic::catch_unwind(report).unwrap_or_else(|_| {
                        error!(path = %info.target, "server error reporter panicked: {err}");
                        internal_server_error()
                    });
                    res.headers_mut().insert(CONNECTION, HeaderValue::from_static("close"));
                    res
                }
            }
        }
    }
}

fn internal_server_error() -> Response {
    let code = StatusCode::INTERNAL_SERVER_ERROR;
    Response::builder()
        .status(code)
        .text(code.canonical_reason().unwrap_or_default())
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use bytes::Bytes;

    use super::*;
    use crate::middleware::{Pipeline, secure_headers};

    #[derive(Default)]
    struct Recorder(Mutex<Vec<String>>);

    impl ServerError for Recorder {
        fn respond(&self, info: &RequestInfo, err: &Error) -> Response {
            self.0.lock().unwrap().push(format!("{} {err}", info.target));
            internal_server_error()
        }
    }

    struct Clumsy;

    impl ServerError for Clumsy {
        fn respond(&self, _info: &RequestInfo, _err: &Error) -> Response {
            panic!("reporter broke too");
        }
    }

    fn get(uri: &str) -> Request {
        http::Request::builder().uri(uri).body(Bytes::new()).unwrap().into()
    }

    async fn boom(_req: Request) -> Response {
        panic!("db handle gone")
    }

    #[tokio::test]
    async fn panicking_handler_becomes_a_500() {
        let reporter = Arc::new(Recorder::default());
        let app = Pipeline::new().layer(panic_recovery(reporter.clone())).wrap(boom);

        let res = app(get("/orders")).await;

        assert_eq!(res.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(res.headers()[CONNECTION], "close");
        assert_eq!(res.body(), b"Internal Server Error");
        assert_eq!(*reporter.0.lock().unwrap(), ["/orders internal error: db handle gone"]);
    }

    #[tokio::test]
    async fn panicking_middleware_is_caught_too() {
        let reporter = Arc::new(Recorder::default());
        let app = Pipeline::new()
            .layer(panic_recovery(reporter.clone()))
            .layer(|_req: Request, _next: Next| -> crate::handler::BoxFuture {
                panic!("layer exploded before returning a future")
            })
            .wrap(|_req: Request| async { Response::text("unreachable") });

        let res = app(get("/")).await;

        assert_eq!(res.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(reporter.0.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn normal_responses_pass_untouched() {
        let reporter = Arc::new(Recorder::default());
        let app = Pipeline::new()
            .layer(panic_recovery(reporter.clone()))
            .wrap(|_req: Request| async { Response::text("fine") });

        let res = app(get("/")).await;

        assert_eq!(res.status_code(), StatusCode::OK);
        assert!(res.headers().get(CONNECTION).is_none());
        assert!(reporter.0.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn recovered_error_keeps_staged_headers() {
        let app = Pipeline::new()
            .layer(panic_recovery(Arc::new(LogServerError)))
            .layer(secure_headers())
            .wrap(boom);

        let res = app(get("/")).await;

        assert_eq!(res.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(res.headers()["x-frame-options"], "deny");
        assert_eq!(res.headers()["x-xss-protection"], "1; mode=block");
    }

    #[tokio::test]
    async fn panicking_reporter_still_yields_a_500() {
        let app = Pipeline::new().layer(panic_recovery(Arc::new(Clumsy))).wrap(boom);

        let res = app(get("/")).await;

        assert_eq!(res.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(res.headers()[CONNECTION], "close");
    }

    #[test]
    fn payload_messages() {
        assert_eq!(panic_message(&"static"), "static");
        assert_eq!(panic_message(&String::from("owned")), "owned");
        assert_eq!(panic_message(&42_u8), "unknown panic");
    }
}
