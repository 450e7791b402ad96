// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! Body rendering by content type.
//!
//! Classification is a pure function from (declared content type, leading
//! bytes) to a closed [`ContentClass`]; [`render`] dispatches on it. Rendering
//! is best-effort and never fails: malformed XML or JSON degrades to the
//! original bytes unchanged, and unsupported types become a placeholder line.

use quick_xml::events::Event;
use quick_xml::{Reader, Writer};

/// How many leading bytes content sniffing considers.
const SNIFF_LEN: usize = 512;

/// Closed set of renderings the inspector supports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentClass {
    Xml,
    Json,
    Text,
    Form,
    /// Anything else; carries the effective content-type string for the
    /// placeholder message.
    Other(String),
}

/// Classify a body for rendering.
///
/// An empty `declared` type is sniffed from the leading bytes first; the
/// declared (or sniffed) type is then matched against the supported set.
/// `+xml` and `+json` structured suffixes render like their base type.
pub fn classify(declared: &str, body: &[u8]) -> ContentClass {
    let declared = declared.trim();
    let effective = if declared.is_empty() {
        sniff(body)
    } else {
        declared
    };

    let parsed: mime::Mime = match effective.parse() {
        Ok(m) => m,
        Err(_) => return ContentClass::Other(effective.to_string()),
    };

    let subtype = parsed.subtype();
    let suffix = parsed.suffix();
    if subtype == mime::XML || suffix == Some(mime::XML) {
        ContentClass::Xml
    } else if subtype == mime::JSON || suffix == Some(mime::JSON) {
        ContentClass::Json
    } else if parsed.type_() == mime::TEXT && subtype == mime::PLAIN {
        ContentClass::Text
    } else if parsed.type_() == mime::APPLICATION && subtype == mime::WWW_FORM_URLENCODED {
        ContentClass::Form
    } else {
        ContentClass::Other(effective.to_string())
    }
}

/// Render a body for display.
///
/// XML and JSON are pretty-printed with a two-space indent; plain text and
/// form data pass through verbatim; everything else is replaced by a
/// placeholder naming the unsupported type.
pub fn render(body: &[u8], content_type: &str) -> Vec<u8> {
    match classify(content_type, body) {
        ContentClass::Xml => format_xml(body).unwrap_or_else(|| body.to_vec()),
        ContentClass::Json => format_json(body).unwrap_or_else(|| body.to_vec()),
        ContentClass::Text | ContentClass::Form => body.to_vec(),
        ContentClass::Other(t) => format!("content-type {} preview not supported", t).into_bytes(),
    }
}

/// Sniff a content type from the first up to 512 bytes.
///
/// Conformant subset of the WHATWG MIME sniffing table: byte-order marks,
/// HTML tag signatures after leading whitespace, the XML declaration, common
/// magic numbers, then a text-vs-binary scan. JSON has no signature and is
/// never sniffed.
pub fn sniff(body: &[u8]) -> &'static str {
    let data = &body[..body.len().min(SNIFF_LEN)];

    if data.starts_with(&[0xEF, 0xBB, 0xBF]) {
        return "text/plain; charset=utf-8";
    }
    if data.starts_with(&[0xFE, 0xFF]) {
        return "text/plain; charset=utf-16be";
    }
    if data.starts_with(&[0xFF, 0xFE]) {
        return "text/plain; charset=utf-16le";
    }

    let tag = skip_sniff_whitespace(data);
    for sig in HTML_SIGNATURES {
        if matches_html_signature(tag, sig) {
            return "text/html; charset=utf-8";
        }
    }
    if tag.starts_with(b"<!--") {
        return "text/html; charset=utf-8";
    }
    if tag.starts_with(b"<?xml") {
        return "text/xml; charset=utf-8";
    }

    if data.starts_with(b"%PDF-") {
        return "application/pdf";
    }
    if data.starts_with(b"%!PS-Adobe-") {
        return "application/postscript";
    }
    if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
        return "image/gif";
    }
    if data.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
        return "image/png";
    }
    if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return "image/jpeg";
    }
    if data.starts_with(&[0x50, 0x4B, 0x03, 0x04]) {
        return "application/zip";
    }
    if data.starts_with(&[0x1F, 0x8B, 0x08]) {
        return "application/x-gzip";
    }

    if data.iter().any(|&b| is_binary_byte(b)) {
        "application/octet-stream"
    } else {
        "text/plain; charset=utf-8"
    }
}

// HTML signatures are matched case-insensitively and must be followed by a
// tag-terminating byte (space or '>').
static HTML_SIGNATURES: &[&str] = &[
    "<!DOCTYPE HTML",
    "<HTML",
    "<HEAD",
    "<SCRIPT",
    "<IFRAME",
    "<H1",
    "<DIV",
    "<FONT",
    "<TABLE",
    "<A",
    "<STYLE",
    "<TITLE",
    "<B",
    "<BODY",
    "<BR",
    "<P",
];

fn skip_sniff_whitespace(data: &[u8]) -> &[u8] {
    let start = data
        .iter()
        .position(|b| !matches!(b, 0x09 | 0x0A | 0x0C | 0x0D | 0x20))
        .unwrap_or(data.len());
    &data[start..]
}

fn matches_html_signature(data: &[u8], sig: &str) -> bool {
    let sig = sig.as_bytes();
    if data.len() <= sig.len() {
        return false;
    }
    for (i, &expected) in sig.iter().enumerate() {
        let b = if expected.is_ascii_uppercase() {
            data[i].to_ascii_uppercase()
        } else {
            data[i]
        };
        if b != expected {
            return false;
        }
    }
    matches!(data[sig.len()], b' ' | b'>')
}

fn is_binary_byte(b: u8) -> bool {
    matches!(b, 0x00..=0x08 | 0x0B | 0x0E..=0x1A | 0x1C..=0x1F)
}

// Re-serialize the XML token stream with a two-space indent, dropping
// whitespace-only text nodes. None on any parse or write error.
fn format_xml(input: &[u8]) -> Option<Vec<u8>> {
    let mut reader = Reader::from_reader(input);
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_event_into(&mut buf) {
            Ok(Event::Eof) => break,
            Ok(Event::Text(t)) if t.iter().all(|b| b.is_ascii_whitespace()) => {}
            Ok(event) => {
                if writer.write_event(event).is_err() {
                    return None;
                }
            }
            Err(_) => return None,
        }
    }
    Some(writer.into_inner())
}

// Round-trip through a generic JSON value; two-space indent plus a trailing
// newline. None when the input does not parse.
fn format_json(input: &[u8]) -> Option<Vec<u8>> {
    let value: serde_json::Value = serde_json::from_slice(input).ok()?;
    let mut out = serde_json::to_vec_pretty(&value).ok()?;
    out.push(b'\n');
    Some(out)
}
