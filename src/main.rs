// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::header::CONTENT_TYPE;
use hyper::{Request, StatusCode};
use tracing::{error, info};

use peek_http::intercept::HandlerFuture;
use peek_http::live_view::{LiveView, ViewerOptions};
use peek_http::logger::TransactionLog;
use peek_http::server::{serve, ServiceFuture};
use peek_http::sink::ResponseSink;

#[derive(Parser, Debug)]
#[command(name = "peek-http")]
struct Args {
    /// Listen address for the demo echo service, e.g. 127.0.0.1:3000
    #[arg(long, default_value = "127.0.0.1:3000")]
    listen: String,

    /// Bind address for the live view
    #[arg(long, default_value = "127.0.0.1:3141")]
    view: String,

    /// Emit one JSON line per transaction to stdout instead of the live view
    #[arg(long)]
    log: bool,

    /// Emit raw unformatted dumps to stdout instead of the live view
    #[arg(long)]
    raw: bool,

    /// Skip the startup banner
    #[arg(long)]
    quiet: bool,
}

// Demo handler: echoes the request body and content type back.
fn echo<'a>(sink: &'a mut dyn ResponseSink, req: Request<Full<Bytes>>) -> HandlerFuture<'a> {
    Box::pin(async move {
        let content_type = req.headers().get(CONTENT_TYPE).cloned();
        let body = req
            .into_body()
            .collect()
            .await
            .map(|c| c.to_bytes())
            .unwrap_or_default();
        sink.set_status(StatusCode::OK);
        if let Some(ct) = content_type {
            sink.headers_mut().insert(CONTENT_TYPE, ct);
        }
        sink.write_body(&body);
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let addr: SocketAddr = args.listen.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "echo service listening");

    let service: Arc<dyn Fn(Request<Incoming>) -> ServiceFuture + Send + Sync> = if args.raw {
        Arc::new(TransactionLog::stdout().wrap_raw(echo))
    } else if args.log {
        Arc::new(TransactionLog::stdout().wrap(echo))
    } else {
        let view = LiveView::new(ViewerOptions {
            address: args.view.clone(),
            skip_startup_message: args.quiet,
        });
        Arc::new(view.wrap(echo))
    };

    let server = serve(listener, move |req| (*service)(req));

    tokio::select! {
        res = server => {
            if let Err(e) = res {
                error!(%e, "server error");
            }
        }
        _ = signal::ctrl_c() => {
            info!("shutting down");
        }
    }

    Ok(())
}
