// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! Transaction assembly around a single handler invocation.
//!
//! [`intercept`] runs the wrapped handler against a capturing sink while
//! duplicating the request body, renders both bodies, forwards the captured
//! response to the real client, and returns the assembled [`Transaction`].
//! The real client always receives the handler's response, even when
//! instrumentation fails.

use bytes::Bytes;
use http_body_util::Full;
use hyper::Request;
use std::future::Future;
use std::pin::Pin;

use crate::body::duplicate_body;
use crate::sink::{ResponseSink, ShadowSink};
use crate::transaction::{Message, Transaction};

pub type HandlerFuture<'a> = Pin<Box<dyn Future<Output = ()> + Send + 'a>>;

/// The wrapped handler shape: writes its response through a [`ResponseSink`].
///
/// Implemented for any matching `Fn`, so plain functions work directly:
///
/// ```ignore
/// fn hello<'a>(sink: &'a mut dyn ResponseSink, _req: Request<Full<Bytes>>) -> HandlerFuture<'a> {
///     Box::pin(async move { sink.write_body(b"hi") })
/// }
/// ```
pub trait Handler: Send + Sync {
    fn call<'a>(
        &self,
        sink: &'a mut dyn ResponseSink,
        req: Request<Full<Bytes>>,
    ) -> HandlerFuture<'a>;
}

impl<F> Handler for F
where
    F: for<'a> Fn(&'a mut dyn ResponseSink, Request<Full<Bytes>>) -> HandlerFuture<'a>
        + Send
        + Sync,
{
    fn call<'a>(
        &self,
        sink: &'a mut dyn ResponseSink,
        req: Request<Full<Bytes>>,
    ) -> HandlerFuture<'a> {
        self(sink, req)
    }
}

/// Run `handler` for `req`, capture the exchange, and forward the captured
/// response into `client`.
///
/// On a body duplication failure the handler still runs and its response is
/// still forwarded; the error is returned and no transaction is produced.
pub async fn intercept<H, B>(
    handler: &H,
    client: &mut dyn ResponseSink,
    req: Request<B>,
) -> anyhow::Result<Transaction>
where
    H: Handler + ?Sized,
    B: hyper::body::Body + Send + 'static,
    B::Data: Send,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let method = req.method().to_string();
    let path = req.uri().to_string();
    let req_headers = req.headers().clone();

    let (req, duplicated) = duplicate_body(req).await;

    let mut shadow = ShadowSink::new();
    let req_body = match duplicated {
        Ok(bytes) => bytes,
        Err(e) => {
            // The client must not be starved by an instrumentation fault:
            // run the handler, deliver its output, record nothing.
            handler.call(&mut shadow, req).await;
            shadow.forward(client);
            return Err(e);
        }
    };

    handler.call(&mut shadow, req).await;

    let request = Message::assemble(&req_headers, &req_body);
    let response = Message::assemble(shadow.headers(), shadow.body());
    let status = shadow.status().as_u16();

    // Rendering cannot fail, so once the handler has run the captured
    // response always reaches the client.
    shadow.forward(client);

    Ok(Transaction {
        status,
        path,
        method,
        request,
        response,
    })
}
