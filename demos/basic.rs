//! Minimal portcullis example — a few routes behind the standard pipeline.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example basic
//!
//! Try:
//!   curl -i http://localhost:3000/users/42
//!   curl -i -H 'authorization: Bearer x' http://localhost:3000/users/42   # 303 → /auth
//!   curl -i http://localhost:3000/static/app.css
//!   curl -i http://localhost:3000/boom                                    # 500, connection: close

use http::{Method, StatusCode};
use portcullis::middleware::{Pipeline, Services};
use portcullis::{Request, Response, Router, Server};

#[tokio::main]
async fn main() -> Result<(), portcullis::Error> {
    tracing_subscriber::fmt::init();

    let services = Services::default();

    let app = Router::new()
        .on(Method::GET,  "/users/{id}",        get_user)
        .on(Method::POST, "/users",             create_user)
        .on(Method::GET,  "/auth",              login_page)
        .on(Method::GET,  "/static/{*file}",    asset)
        .on(Method::GET,  "/boom",              boom)
        .middleware(Pipeline::standard(&services));

    Server::bind("0.0.0.0:3000")?.serve(app).await
}

async fn get_user(req: Request) -> Response {
    let id = req.param("id").unwrap_or("unknown");
    Response::json(format!(r#"{{"id":"{id}","name":"alice"}}"#))
}

async fn create_user(req: Request) -> Response {
    if req.body().is_empty() {
        return Response::status(StatusCode::BAD_REQUEST);
    }
    Response::builder()
        .status(StatusCode::CREATED)
        .header("location", "/users/99")
        .json(r#"{"id":"99","name":"new_user"}"#)
}

async fn login_page(_req: Request) -> Response {
    Response::builder().html("<form method=post action=/auth>…</form>")
}

async fn asset(req: Request) -> Response {
    Response::text(format!("asset {}", req.param("file").unwrap_or("")))
}

async fn boom(_req: Request) -> Response {
    panic!("handler bug")
}
