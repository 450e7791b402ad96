// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! Live-updating web view over captured transactions.
//!
//! [`LiveView::wrap`] instruments a handler so every exchange is appended to
//! the transaction store, and lazily starts a background viewer server the
//! first time a handler is wrapped. The viewer serves the current snapshot at
//! `GET /data` and a bundled static UI everywhere else.

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Method, Request, Response, StatusCode};
use rust_embed::RustEmbed;
use std::net::SocketAddr;
use std::sync::{Arc, Once, OnceLock};
use tracing::{error, info};

use crate::intercept::{intercept, Handler};
use crate::server::{self, ServiceFuture};
use crate::sink::ClientReply;
use crate::store::TransactionStore;

/// Construction-time options for the viewer.
#[derive(Debug, Clone)]
pub struct ViewerOptions {
    /// Bind address for the viewer listener.
    pub address: String,
    /// Suppress the human-readable startup banner.
    pub skip_startup_message: bool,
}

impl Default for ViewerOptions {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:3141".to_string(),
            skip_startup_message: false,
        }
    }
}

#[derive(RustEmbed)]
#[folder = "assets/"]
struct Assets;

/// A transaction store plus its viewer server.
///
/// Explicitly constructed; there is no process-wide default instance. The
/// viewer listener starts at most once per `LiveView`, on the first
/// [`LiveView::wrap`] call. A bind failure disables only the viewer;
/// wrapped traffic keeps flowing.
pub struct LiveView {
    store: Arc<TransactionStore>,
    options: ViewerOptions,
    started: Once,
    bound: OnceLock<SocketAddr>,
}

impl LiveView {
    pub fn new(options: ViewerOptions) -> Arc<Self> {
        Arc::new(Self {
            store: Arc::new(TransactionStore::new()),
            options,
            started: Once::new(),
            bound: OnceLock::new(),
        })
    }

    /// Zero-configuration instance: viewer on 127.0.0.1:3141, banner on.
    pub fn with_defaults() -> Arc<Self> {
        Self::new(ViewerOptions::default())
    }

    pub fn store(&self) -> &Arc<TransactionStore> {
        &self.store
    }

    /// Address the viewer actually bound, once it has started.
    pub fn viewer_addr(&self) -> Option<SocketAddr> {
        self.bound.get().copied()
    }

    /// Instrument `handler`: every exchange is captured into the store and
    /// the captured response is delivered to the client unchanged.
    ///
    /// Must be called within a tokio runtime; the first call starts the
    /// viewer task.
    pub fn wrap<H, B>(self: &Arc<Self>, handler: H) -> impl Fn(Request<B>) -> ServiceFuture + Clone
    where
        H: Handler + 'static,
        B: hyper::body::Body + Send + 'static,
        B::Data: Send,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        self.start_viewer();

        let handler = Arc::new(handler);
        let view = self.clone();
        move |req: Request<B>| {
            let handler = handler.clone();
            let view = view.clone();
            let fut: ServiceFuture = Box::pin(async move {
                let mut reply = ClientReply::new();
                match intercept(handler.as_ref(), &mut reply, req).await {
                    Ok(tx) => view.store.append(tx),
                    Err(e) => error!(%e, "failed to capture transaction"),
                }
                Ok(reply.into_response())
            });
            fut
        }
    }

    // One-time latch, independent of the store lock: concurrent first wraps
    // bind exactly one listener.
    fn start_viewer(self: &Arc<Self>) {
        let view = self.clone();
        self.started.call_once(move || {
            tokio::spawn(async move {
                if let Err(e) = view.run_viewer().await {
                    error!(%e, "live view server failed");
                }
            });
        });
    }

    async fn run_viewer(self: Arc<Self>) -> anyhow::Result<()> {
        let addr: SocketAddr = self.options.address.parse()?;
        let listener = tokio::net::TcpListener::bind(addr).await?;
        let local = listener.local_addr()?;
        let _ = self.bound.set(local);

        if !self.options.skip_startup_message {
            println!("peek-http: live view ready, visit http://{}/ to explore", local);
        }
        info!(%local, "live view listening");

        let view = self.clone();
        server::serve(listener, move |req| {
            let view = view.clone();
            let fut: ServiceFuture = Box::pin(async move { Ok(route(view, req).await) });
            fut
        })
        .await
    }
}

async fn route<B>(view: Arc<LiveView>, req: Request<B>) -> Response<Full<Bytes>> {
    if req.method() != Method::GET {
        return status_response(StatusCode::METHOD_NOT_ALLOWED);
    }

    if req.uri().path() == "/data" {
        let snapshot = view.store.snapshot();
        return match serde_json::to_vec(&snapshot) {
            Ok(body) => Response::builder()
                .header("content-type", "application/json")
                .body(Full::new(Bytes::from(body)))
                .unwrap_or_else(|_| Response::new(Full::new(Bytes::new()))),
            Err(e) => {
                error!(%e, "failed to encode transaction snapshot");
                status_response(StatusCode::INTERNAL_SERVER_ERROR)
            }
        };
    }

    serve_asset(req.uri().path())
}

fn serve_asset(path: &str) -> Response<Full<Bytes>> {
    let name = path.trim_start_matches('/');
    let name = if name.is_empty() { "index.html" } else { name };
    match Assets::get(name) {
        Some(file) => Response::builder()
            .header("content-type", asset_content_type(name))
            .body(Full::new(Bytes::from(file.data.into_owned())))
            .unwrap_or_else(|_| Response::new(Full::new(Bytes::new()))),
        None => status_response(StatusCode::NOT_FOUND),
    }
}

fn asset_content_type(name: &str) -> &'static str {
    match name.rsplit('.').next() {
        Some("html") => "text/html; charset=utf-8",
        Some("js") => "text/javascript; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        _ => "application/octet-stream",
    }
}

fn status_response(status: StatusCode) -> Response<Full<Bytes>> {
    let mut resp = Response::new(Full::new(Bytes::new()));
    *resp.status_mut() = status;
    resp
}
