// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! Canonical transaction record produced by the interception pipeline.

use hyper::header::CONTENT_TYPE;
use hyper::HeaderMap;
use serde::{Deserialize, Serialize};

use crate::render;

/// One side of a transaction: the header block as text plus the rendered body.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Header block in canonical `Name: value` lines, collection order.
    pub raw_headers: String,
    /// Body as rendered by the content renderer, never raw partial bytes.
    pub body: String,
}

impl Message {
    /// Assemble one side from its headers and (duplicated) body bytes.
    ///
    /// The body is rendered using the header-declared content type, sniffed
    /// from the body when none is declared. `raw_headers` always reflects the
    /// original collection; sniffing never rewrites recorded headers.
    pub fn assemble(headers: &HeaderMap, body: &[u8]) -> Self {
        let content_type = headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        let rendered = render::render(body, content_type);
        Self {
            raw_headers: dump_headers(headers),
            body: String::from_utf8_lossy(&rendered).into_owned(),
        }
    }
}

/// One captured request/response exchange. Immutable after construction.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub status: u16,
    pub path: String,
    pub method: String,
    pub request: Message,
    pub response: Message,
}

/// Render a header collection as canonical `Name: value` CRLF lines.
pub fn dump_headers(headers: &HeaderMap) -> String {
    let mut out = String::new();
    for (name, value) in headers.iter() {
        out.push_str(&canonical_name(name.as_str()));
        out.push_str(": ");
        out.push_str(&String::from_utf8_lossy(value.as_bytes()));
        out.push_str("\r\n");
    }
    out
}

// Title-case each dash-separated segment: "content-type" -> "Content-Type".
fn canonical_name(name: &str) -> String {
    name.split('-')
        .map(|segment| {
            let mut chars = segment.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join("-")
}
