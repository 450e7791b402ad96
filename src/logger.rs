// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! Log-emitting wrap variants.
//!
//! [`TransactionLog::wrap`] writes one JSON object per captured transaction
//! to a line-oriented sink. [`TransactionLog::wrap_raw`] writes an
//! unformatted dump block instead, with no content rendering at all.

use bytes::Bytes;
use hyper::Request;
use std::sync::Arc;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;
use tracing::error;

use crate::body::duplicate_body;
use crate::intercept::{intercept, Handler};
use crate::server::ServiceFuture;
use crate::sink::{ClientReply, ShadowSink};
use crate::transaction::dump_headers;

/// Line-oriented transaction sink shared across in-flight requests.
pub struct TransactionLog<W> {
    sink: Arc<Mutex<W>>,
}

impl<W> Clone for TransactionLog<W> {
    fn clone(&self) -> Self {
        Self {
            sink: self.sink.clone(),
        }
    }
}

impl TransactionLog<tokio::io::Stdout> {
    /// Log lines to standard output.
    pub fn stdout() -> Self {
        Self::new(tokio::io::stdout())
    }
}

impl<W> TransactionLog<W>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    pub fn new(sink: W) -> Self {
        Self {
            sink: Arc::new(Mutex::new(sink)),
        }
    }

    async fn write_line(&self, line: &str) -> anyhow::Result<()> {
        let mut sink = self.sink.lock().await;
        sink.write_all(line.as_bytes()).await?;
        sink.write_all(b"\n").await?;
        sink.flush().await?;
        Ok(())
    }

    /// Instrument `handler`: one JSON line per captured transaction.
    ///
    /// An encode or write failure is logged at the point of emission and
    /// never affects the response, which is delivered regardless.
    pub fn wrap<H, B>(&self, handler: H) -> impl Fn(Request<B>) -> ServiceFuture + Clone
    where
        H: Handler + 'static,
        B: hyper::body::Body + Send + 'static,
        B::Data: Send,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let handler = Arc::new(handler);
        let log = self.clone();
        move |req: Request<B>| {
            let handler = handler.clone();
            let log = log.clone();
            let fut: ServiceFuture = Box::pin(async move {
                let mut reply = ClientReply::new();
                match intercept(handler.as_ref(), &mut reply, req).await {
                    Ok(tx) => match serde_json::to_string(&tx) {
                        Ok(line) => {
                            if let Err(e) = log.write_line(&line).await {
                                error!(%e, "failed to write transaction log line");
                            }
                        }
                        Err(e) => error!(%e, "failed to encode transaction"),
                    },
                    Err(e) => error!(%e, "failed to capture transaction"),
                }
                Ok(reply.into_response())
            });
            fut
        }
    }

    /// Instrument `handler`: dump each exchange verbatim, request then
    /// response, with no body rendering.
    pub fn wrap_raw<H, B>(&self, handler: H) -> impl Fn(Request<B>) -> ServiceFuture + Clone
    where
        H: Handler + 'static,
        B: hyper::body::Body + Send + 'static,
        B::Data: Send,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let handler = Arc::new(handler);
        let log = self.clone();
        move |req: Request<B>| {
            let handler = handler.clone();
            let log = log.clone();
            let fut: ServiceFuture = Box::pin(async move {
                let method = req.method().clone();
                let uri = req.uri().clone();
                let version = format_http_version(req.version());
                let req_headers = req.headers().clone();

                let (req, duplicated) = duplicate_body(req).await;
                let req_body = match duplicated {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        error!(%e, "failed to dump request body for logs");
                        Bytes::new()
                    }
                };

                let mut shadow = ShadowSink::new();
                handler.call(&mut shadow, req).await;

                let block = format!(
                    "\n-------------------\n\n~ REQUEST:\n{method} {uri} {version}\n{req_headers}\n{req_body}\n~ RESPONSE:\nStatus: {status}\n{resp_headers}\n{resp_body}\n-------------------\n",
                    req_headers = dump_headers(&req_headers),
                    req_body = String::from_utf8_lossy(&req_body),
                    status = shadow.status().as_u16(),
                    resp_headers = dump_headers(shadow.headers()),
                    resp_body = String::from_utf8_lossy(shadow.body()),
                );
                if let Err(e) = log.write_line(&block).await {
                    error!(%e, "failed to write raw dump");
                }

                let mut reply = ClientReply::new();
                shadow.forward(&mut reply);
                Ok(reply.into_response())
            });
            fut
        }
    }
}

// Textual HTTP-version token for the dumped start line.
fn format_http_version(v: hyper::Version) -> String {
    match v {
        hyper::Version::HTTP_09 => "HTTP/0.9".to_string(),
        hyper::Version::HTTP_10 => "HTTP/1.0".to_string(),
        hyper::Version::HTTP_11 => "HTTP/1.1".to_string(),
        hyper::Version::HTTP_2 => "HTTP/2.0".to_string(),
        _ => "HTTP/1.1".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intercept::HandlerFuture;
    use crate::sink::ResponseSink;
    use http_body_util::{BodyExt, Full};
    use hyper::StatusCode;
    use rstest::rstest;
    use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};

    fn test_handler<'a>(
        sink: &'a mut dyn ResponseSink,
        _req: Request<Full<Bytes>>,
    ) -> HandlerFuture<'a> {
        Box::pin(async move {
            sink.set_status(StatusCode::OK);
            sink.headers_mut().insert("z", "y".parse().expect("header"));
            sink.write_body(b"test response");
        })
    }

    #[rstest]
    #[case(hyper::Version::HTTP_10, "HTTP/1.0")]
    #[case(hyper::Version::HTTP_11, "HTTP/1.1")]
    #[case(hyper::Version::HTTP_2, "HTTP/2.0")]
    fn format_http_version_cases(#[case] version: hyper::Version, #[case] expected: &str) {
        assert_eq!(format_http_version(version), expected);
    }

    #[tokio::test]
    async fn wrap_emits_one_json_line_per_transaction() -> anyhow::Result<()> {
        let (write_side, read_side) = tokio::io::duplex(64 * 1024);
        let log = TransactionLog::new(write_side);
        let service = log.wrap(test_handler);

        let req = Request::builder()
            .method("POST")
            .uri("/orders")
            .header("foo", "bar")
            .header("content-type", "application/json")
            .body(Full::new(Bytes::from_static(b"{\"foo\": \"bar\"}")))?;
        let resp = service(req).await.expect("service is infallible");
        assert_eq!(resp.status(), StatusCode::OK);

        let mut reader = BufReader::new(read_side);
        let mut line = String::new();
        reader.read_line(&mut line).await?;

        let v: serde_json::Value = serde_json::from_str(line.trim())?;
        assert_eq!(v["status"].as_u64(), Some(200));
        assert_eq!(v["method"].as_str(), Some("POST"));
        assert_eq!(v["path"].as_str(), Some("/orders"));
        assert_eq!(
            v["request"]["body"].as_str(),
            Some("{\n  \"foo\": \"bar\"\n}\n")
        );
        assert!(v["response"]["raw_headers"]
            .as_str()
            .expect("raw_headers string")
            .contains("Z: y"));
        assert_eq!(v["response"]["body"].as_str(), Some("test response"));
        Ok(())
    }

    #[tokio::test]
    async fn wrap_raw_dumps_bodies_verbatim() -> anyhow::Result<()> {
        let (write_side, read_side) = tokio::io::duplex(64 * 1024);
        let log = TransactionLog::new(write_side);
        let service = log.wrap_raw(test_handler);

        let req = Request::builder()
            .method("POST")
            .uri("/orders")
            .header("content-type", "application/json")
            .body(Full::new(Bytes::from_static(b"{\"foo\": \"bar\"}")))?;
        let resp = service(req).await.expect("service is infallible");

        let body = resp
            .into_body()
            .collect()
            .await
            .map(|c| c.to_bytes())
            .unwrap_or_default();
        assert_eq!(body, Bytes::from_static(b"test response"));

        // Drop every handle to the sink so the read side sees EOF.
        drop(service);
        drop(log);

        let mut reader = BufReader::new(read_side);
        let mut dump = String::new();
        reader.read_to_string(&mut dump).await?;

        assert!(dump.contains("~ REQUEST:"));
        assert!(dump.contains("POST /orders HTTP/1.1"));
        // No rendering in the raw variant: the JSON body stays compact.
        assert!(dump.contains("{\"foo\": \"bar\"}"));
        assert!(dump.contains("~ RESPONSE:"));
        assert!(dump.contains("Status: 200"));
        assert!(dump.contains("Z: y"));
        assert!(dump.contains("test response"));
        Ok(())
    }
}
