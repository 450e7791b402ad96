// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! Connection-serving plumbing shared by the demo binary, the live view
//! server, and the integration tests.

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as AutoConnBuilder;
use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use tracing::error;

/// Future type returned by wrapped services.
pub type ServiceFuture =
    Pin<Box<dyn Future<Output = Result<Response<Full<Bytes>>, Infallible>> + Send>>;

/// Accept connections on `listener` and serve each with `service`.
///
/// One task per connection; protocol (HTTP/1 or HTTP/2) is auto-detected.
/// Runs until the listener fails.
pub async fn serve<S>(listener: tokio::net::TcpListener, service: S) -> anyhow::Result<()>
where
    S: Fn(Request<Incoming>) -> ServiceFuture + Clone + Send + Sync + 'static,
{
    let executor = TokioExecutor::new();
    let builder = AutoConnBuilder::new(executor);

    loop {
        let (stream, _remote_addr) = listener.accept().await?;
        let service = service.clone();
        let builder = builder.clone();
        tokio::spawn(async move {
            let io = TokioIo::new(stream);
            let svc = service_fn(move |req: Request<Incoming>| service(req));
            if let Err(e) = builder.serve_connection_with_upgrades(io, svc).await {
                error!(%e, "connection error");
            }
        });
    }
}
