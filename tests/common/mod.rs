// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Request, StatusCode};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::time::{sleep, timeout};

use peek_http::intercept::HandlerFuture;
use peek_http::server::{serve, ServiceFuture};
use peek_http::sink::ResponseSink;

/// Fixed handler for integration tests: 200, `z: y`, body "test response".
pub fn test_handler<'a>(
    sink: &'a mut dyn ResponseSink,
    _req: Request<Full<Bytes>>,
) -> HandlerFuture<'a> {
    Box::pin(async move {
        sink.set_status(StatusCode::OK);
        sink.headers_mut().insert("z", "y".parse().expect("header"));
        sink.write_body(b"test response");
    })
}

/// Bind an ephemeral port, serve `service` in a task, wait until accepting.
pub async fn start_service<S>(
    service: S,
) -> anyhow::Result<(tokio::task::JoinHandle<()>, SocketAddr)>
where
    S: Fn(Request<hyper::body::Incoming>) -> ServiceFuture + Clone + Send + Sync + 'static,
{
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let handle = tokio::spawn(async move {
        let _ = serve(listener, service).await;
    });
    wait_until_accepting(addr).await?;
    Ok((handle, addr))
}

/// Poll until `addr` accepts TCP connections (5s deadline).
pub async fn wait_until_accepting(addr: SocketAddr) -> anyhow::Result<()> {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        if Instant::now() > deadline {
            anyhow::bail!("timeout waiting for {} to accept", addr);
        }
        if let Ok(mut s) = tokio::net::TcpStream::connect(addr).await {
            let _ = s.shutdown().await;
            return Ok(());
        }
        sleep(Duration::from_millis(50)).await;
    }
}

/// Send a raw HTTP/1.1 request (must carry `Connection: close`) and read the
/// full response.
pub async fn raw_request(addr: SocketAddr, request: &str) -> anyhow::Result<String> {
    let mut stream = tokio::net::TcpStream::connect(addr).await?;
    stream.write_all(request.as_bytes()).await?;
    let mut buf = Vec::new();
    timeout(Duration::from_secs(5), stream.read_to_end(&mut buf)).await??;
    Ok(String::from_utf8_lossy(&buf).to_string())
}
