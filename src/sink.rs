// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! Response sinks.
//!
//! Handlers write their response through the [`ResponseSink`] capability
//! instead of any concrete recorder type. [`ShadowSink`] captures everything
//! in memory without transmitting; [`ClientReply`] is the pass-through sink
//! standing in for the real client at the hyper boundary.

use bytes::{Bytes, BytesMut};
use http_body_util::Full;
use hyper::{HeaderMap, Response, StatusCode};

/// Write-side of a response: status, headers, body.
pub trait ResponseSink: Send {
    /// Set the response status. Later calls overwrite earlier ones.
    fn set_status(&mut self, status: StatusCode);

    /// Mutable access to the accumulating header collection.
    fn headers_mut(&mut self) -> &mut HeaderMap;

    /// Append a chunk to the response body.
    fn write_body(&mut self, chunk: &[u8]);
}

/// Capturing sink: records a handler's output without sending any of it
/// until [`ShadowSink::forward`] is called.
#[derive(Debug, Default)]
pub struct ShadowSink {
    status: Option<StatusCode>,
    headers: HeaderMap,
    body: BytesMut,
    forwarded: bool,
}

impl ShadowSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded status; 200 when the handler never set one.
    pub fn status(&self) -> StatusCode {
        self.status.unwrap_or(StatusCode::OK)
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Copy the recorded response into `target`: headers, then status, then
    /// body. At most one forward takes effect per sink.
    pub fn forward(&mut self, target: &mut dyn ResponseSink) {
        if self.forwarded {
            return;
        }
        self.forwarded = true;
        for (name, value) in self.headers.iter() {
            target.headers_mut().append(name, value.clone());
        }
        target.set_status(self.status());
        target.write_body(&self.body);
    }
}

impl ResponseSink for ShadowSink {
    fn set_status(&mut self, status: StatusCode) {
        self.status = Some(status);
    }

    fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    fn write_body(&mut self, chunk: &[u8]) {
        self.body.extend_from_slice(chunk);
    }
}

/// Pass-through sink for the real client. Consumed exactly once via
/// [`ClientReply::into_response`] to produce the response hyper delivers.
#[derive(Debug, Default)]
pub struct ClientReply {
    status: Option<StatusCode>,
    headers: HeaderMap,
    body: BytesMut,
}

impl ClientReply {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_response(self) -> Response<Full<Bytes>> {
        let mut resp = Response::new(Full::new(self.body.freeze()));
        *resp.status_mut() = self.status.unwrap_or(StatusCode::OK);
        *resp.headers_mut() = self.headers;
        resp
    }
}

impl ResponseSink for ClientReply {
    fn set_status(&mut self, status: StatusCode) {
        self.status = Some(status);
    }

    fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    fn write_body(&mut self, chunk: &[u8]) {
        self.body.extend_from_slice(chunk);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    #[test]
    fn status_defaults_to_200() {
        let shadow = ShadowSink::new();
        assert_eq!(shadow.status(), StatusCode::OK);
    }

    #[test]
    fn records_status_headers_and_body() {
        let mut shadow = ShadowSink::new();
        shadow.set_status(StatusCode::CREATED);
        shadow
            .headers_mut()
            .insert("z", "y".parse().expect("header value"));
        shadow.write_body(b"test ");
        shadow.write_body(b"response");

        assert_eq!(shadow.status(), StatusCode::CREATED);
        assert_eq!(
            shadow.headers().get("z").and_then(|v| v.to_str().ok()),
            Some("y")
        );
        assert_eq!(shadow.body(), b"test response");
    }

    #[test]
    fn forward_copies_everything_once() {
        let mut shadow = ShadowSink::new();
        shadow.set_status(StatusCode::ACCEPTED);
        shadow
            .headers_mut()
            .insert("x-a", "1".parse().expect("header value"));
        shadow.write_body(b"payload");

        let mut reply = ClientReply::new();
        shadow.forward(&mut reply);
        // A second forward must not duplicate anything.
        shadow.forward(&mut reply);

        let resp = reply.into_response();
        assert_eq!(resp.status(), StatusCode::ACCEPTED);
        assert_eq!(
            resp.headers().get("x-a").and_then(|v| v.to_str().ok()),
            Some("1")
        );
        let body = futures_body(resp);
        assert_eq!(body, b"payload".as_slice());
    }

    #[test]
    fn unset_shadow_forwards_empty_200() {
        let mut shadow = ShadowSink::new();
        let mut reply = ClientReply::new();
        shadow.forward(&mut reply);

        let resp = reply.into_response();
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(futures_body(resp).is_empty());
    }

    fn futures_body(resp: Response<Full<Bytes>>) -> Vec<u8> {
        // Full<Bytes> resolves immediately; a tiny runtime keeps these tests sync.
        tokio::runtime::Builder::new_current_thread()
            .build()
            .expect("runtime")
            .block_on(async {
                resp.into_body()
                    .collect()
                    .await
                    .map(|c| c.to_bytes().to_vec())
                    .unwrap_or_default()
            })
    }
}
