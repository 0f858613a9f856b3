//! Real sockets: the server, the standard pipeline, and hyper's wire format.

use std::net::SocketAddr;
use std::time::Duration;

use http::Method;
use portcullis::middleware::{Pipeline, Services};
use portcullis::{Request, Response, Router, Server};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::timeout;

async fn boom(_req: Request) -> Response {
    panic!("handler bug")
}

async fn whoami(req: Request) -> Response {
    Response::text(req.info().to_string())
}

async fn start() -> (SocketAddr, oneshot::Sender<()>, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (stop, stopped) = oneshot::channel::<()>();

    let app = Router::new()
        .on(Method::GET, "/boom", boom)
        .on(Method::GET, "/whoami", whoami)
        .middleware(Pipeline::standard(&Services::default()));

    let server = tokio::spawn(async move {
        let shutdown = async {
            let _ = stopped.await;
        };
        Server::serve_with_shutdown(listener, app, shutdown).await.unwrap();
    });

    (addr, stop, server)
}

/// Sends `raw` and reads until the server closes the socket.
async fn exchange(stream: &mut TcpStream, raw: &str) -> String {
    stream.write_all(raw.as_bytes()).await.unwrap();
    let mut out = Vec::new();
    timeout(Duration::from_secs(5), stream.read_to_end(&mut out))
        .await
        .expect("server kept the connection open")
        .unwrap();
    String::from_utf8(out).unwrap()
}

#[tokio::test]
async fn recovered_panic_closes_the_connection() {
    let (addr, stop, server) = start().await;
    let mut stream = TcpStream::connect(addr).await.unwrap();

    // Keep-alive request: only the recovery layer's `connection: close`
    // makes the server hang up.
    let reply = exchange(&mut stream, "GET /boom HTTP/1.1\r\nhost: test\r\n\r\n").await;

    assert!(reply.starts_with("HTTP/1.1 500 Internal Server Error\r\n"), "{reply}");
    assert!(reply.contains("connection: close\r\n"), "{reply}");
    assert!(reply.contains("x-frame-options: deny\r\n"), "{reply}");

    stop.send(()).unwrap();
    timeout(Duration::from_secs(5), server).await.unwrap().unwrap();
}

#[tokio::test]
async fn peer_address_is_the_client_socket() {
    let (addr, stop, server) = start().await;
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let client = stream.local_addr().unwrap();

    let reply = exchange(
        &mut stream,
        "GET /whoami HTTP/1.1\r\nhost: test\r\nuser-agent: it/2\r\nconnection: close\r\n\r\n",
    )
    .await;

    assert!(reply.starts_with("HTTP/1.1 200 OK\r\n"), "{reply}");
    assert!(
        reply.ends_with(&format!("{client}::HTTP/1.1 {{it/2}} - GET /whoami")),
        "{reply}",
    );

    stop.send(()).unwrap();
    timeout(Duration::from_secs(5), server).await.unwrap().unwrap();
}
