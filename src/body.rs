// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! Request body duplication.
//!
//! The inbound body stream can only be read once. [`duplicate_body`] drains
//! it, hands the bytes back to the caller, and rebuilds the request around a
//! fresh in-memory body so the wrapped handler still observes an unconsumed
//! stream.

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::Request;

/// Drain the request body and rebuild the request with a re-readable copy.
///
/// Returns the rebuilt request together with the bytes that were read. On a
/// read failure the error is surfaced to the caller, but the returned request
/// still carries an (empty) body so downstream consumers never hit a missing
/// body.
pub async fn duplicate_body<B>(req: Request<B>) -> (Request<Full<Bytes>>, anyhow::Result<Bytes>)
where
    B: hyper::body::Body + Send + 'static,
    B::Data: Send,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let (parts, body) = req.into_parts();
    match body.collect().await {
        Ok(collected) => {
            let bytes = collected.to_bytes();
            let req = Request::from_parts(parts, Full::new(bytes.clone()));
            (req, Ok(bytes))
        }
        Err(e) => {
            let boxed: Box<dyn std::error::Error + Send + Sync> = e.into();
            let req = Request::from_parts(parts, Full::new(Bytes::new()));
            (req, Err(anyhow::anyhow!("failed to read request body: {}", boxed)))
        }
    }
}
