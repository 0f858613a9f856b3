//! Access logging.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tracing::{debug, info};

use crate::error::Error;
use crate::request::{Request, RequestInfo};

use super::{Middleware, Next};

/// Where access lines go.
///
/// Called from every in-flight request at once; implementations must not
/// need `&mut self`. An `Err` is dropped by [`request_logger`], it never
/// reaches the client.
pub trait AccessLog: Send + Sync + 'static {
    fn record(&self, info: &RequestInfo) -> Result<(), Error>;
}

/// Default sink: one `info` event per request on the `portcullis::access`
/// target, with the request fields attached.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingAccessLog;

impl AccessLog for TracingAccessLog {
    fn record(&self, info: &RequestInfo) -> Result<(), Error> {
        info!(
            target: "portcullis::access",
            remote = ?info.remote_addr,
            version = ?info.version,
            user_agent = %info.user_agent,
            method = %info.method,
            path = %info.target,
            "{info}",
        );
        Ok(())
    }
}

/// Records every request through `sink` before delegating.
///
/// Neither an `Err` nor a panic from the sink reaches the request.
pub fn request_logger(sink: Arc<dyn AccessLog>) -> impl Middleware {
    move |req: Request, next: Next| {
        let info = req.info();
        match panic::catch_unwind(AssertUnwindSafe(|| sink.record(&info))) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => debug!(error = %e, "access log sink failed"),
            Err(_) => debug!(path = %info.target, "access log sink panicked"),
        }
        next.run(req)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use bytes::Bytes;
    use http::StatusCode;

    use super::*;
    use crate::middleware::Pipeline;
    use crate::response::Response;

    #[derive(Default)]
    struct Memory(Mutex<Vec<String>>);

    impl AccessLog for Memory {
        fn record(&self, info: &RequestInfo) -> Result<(), Error> {
            self.0.lock().unwrap().push(info.to_string());
            Ok(())
        }
    }

    struct Broken;

    impl AccessLog for Broken {
        fn record(&self, _info: &RequestInfo) -> Result<(), Error> {
            Err(Error::Log("disk full".to_owned()))
        }
    }

    async fn created(_req: Request) -> Response {
        Response::builder().status(StatusCode::CREATED).text("made")
    }

    fn request() -> Request {
        let req: Request = http::Request::builder()
            .method("PUT")
            .uri("/things/7?force=1")
            .header("user-agent", "probe/1.0")
            .body(Bytes::new())
            .unwrap()
            .into();
        req.with_remote_addr("10.0.0.9:4000".parse().unwrap())
    }

    #[tokio::test]
    async fn logs_one_line_per_request() {
        let sink = Arc::new(Memory::default());
        let app = Pipeline::new().layer(request_logger(sink.clone())).wrap(created);

        app(request()).await;

        assert_eq!(
            *sink.0.lock().unwrap(),
            ["10.0.0.9:4000::HTTP/1.1 {probe/1.0} - PUT /things/7?force=1"],
        );
    }

    #[tokio::test]
    async fn broken_sink_does_not_touch_the_response() {
        let app = Pipeline::new().layer(request_logger(Arc::new(Broken))).wrap(created);

        let res = app(request()).await;

        assert_eq!(res.status_code(), StatusCode::CREATED);
        assert_eq!(res.body(), b"made");
    }

    struct Panicky;

    impl AccessLog for Panicky {
        fn record(&self, _info: &RequestInfo) -> Result<(), Error> {
            panic!("sink exploded");
        }
    }

    #[tokio::test]
    async fn panicking_sink_does_not_touch_the_response() {
        let app = Pipeline::new().layer(request_logger(Arc::new(Panicky))).wrap(created);

        let res = app(request()).await;

        assert_eq!(res.status_code(), StatusCode::CREATED);
        assert_eq!(res.body(), b"made");
    }

    #[test]
    fn tracing_sink_never_fails() {
        let info = request().info();
        assert!(TracingAccessLog.record(&info).is_ok());
    }
}
