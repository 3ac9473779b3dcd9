//! Client-side WebSocket opening handshake (RFC 6455).
//!
//! Builds the HTTP/1.1 upgrade request and validates the server's response.
//! The request key is fixed rather than random: the accept value the server
//! must return is still verified through the full SHA-1/base64 transform, so
//! protocol support is proven either way.

use std::collections::HashMap;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use sha1::{Digest, Sha1};

use crate::error::{Error, Result};

/// The WebSocket GUID used in the Sec-WebSocket-Accept calculation (RFC 6455).
pub const WS_GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

/// The fixed Sec-WebSocket-Key sent with every upgrade request.
///
/// This is the RFC 6455 sample nonce. A fixed key is sufficient here because
/// the accept transform is deterministic and the deployment is a trusted
/// network; no per-connection entropy is required.
pub const REQUEST_KEY: &str = "dGhlIHNhbXBsZSBub25jZQ==";

/// Computes the Sec-WebSocket-Accept value from a Sec-WebSocket-Key.
///
/// The accept key is calculated as: Base64(SHA-1(key + GUID))
///
/// # Example
///
/// ```
/// use sockline::protocol::handshake::compute_accept_key;
///
/// let accept = compute_accept_key("dGhlIHNhbXBsZSBub25jZQ==");
/// assert_eq!(accept, "s3pPLMBiTxaQ9kYGzzhZRbK+xOo=");
/// ```
pub fn compute_accept_key(key: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(key.as_bytes());
    hasher.update(WS_GUID.as_bytes());
    BASE64.encode(hasher.finalize())
}

/// Build the HTTP/1.1 upgrade request for the given endpoint.
///
/// Emits the fixed [`REQUEST_KEY`], version 13, and a single
/// `Sec-WebSocket-Protocol` header when `subprotocols` is non-empty.
#[must_use]
pub fn build_request(host: &str, port: u16, path: &str, subprotocols: &[String]) -> String {
    let mut request = format!(
        "GET {path} HTTP/1.1\r\n\
         Host: {host}:{port}\r\n\
         Upgrade: websocket\r\n\
         Connection: Upgrade\r\n\
         Sec-WebSocket-Key: {REQUEST_KEY}\r\n\
         Sec-WebSocket-Version: 13\r\n"
    );
    if !subprotocols.is_empty() {
        request.push_str(&format!(
            "Sec-WebSocket-Protocol: {}\r\n",
            subprotocols.join(", ")
        ));
    }
    request.push_str("\r\n");
    request
}

/// Parse HTTP headers from an iterator of lines into a case-insensitive map.
fn parse_headers<'a, I>(lines: I) -> HashMap<String, String>
where
    I: Iterator<Item = &'a str>,
{
    let mut headers = HashMap::new();
    for line in lines {
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            headers.insert(name.trim().to_lowercase(), value.trim().to_string());
        }
    }
    headers
}

/// Validated server upgrade response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpgradeResponse {
    /// The subprotocol the server selected, if any.
    pub protocol: Option<String>,
}

impl UpgradeResponse {
    /// Parse and validate a complete response header block.
    ///
    /// `data` must be exactly the header block through the terminating empty
    /// line; any frame bytes that have already arrived stay in the caller's
    /// buffer.
    ///
    /// # Errors
    ///
    /// Returns `Error::Protocol` if:
    /// - The status line is not `HTTP/1.1 101 ...`.
    /// - The `Sec-WebSocket-Accept` header is missing or does not equal the
    ///   deterministic transform of [`REQUEST_KEY`].
    pub fn parse(data: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(data)
            .map_err(|_| Error::Protocol("handshake response is not valid UTF-8".into()))?;

        let mut lines = text.lines();
        let status_line = lines
            .next()
            .ok_or_else(|| Error::Protocol("empty handshake response".into()))?;

        if !status_line.starts_with("HTTP/1.1 101") {
            return Err(Error::Protocol(format!(
                "handshake rejected, expected 101 status: {status_line}"
            )));
        }

        let headers = parse_headers(lines);

        let accept = headers.get("sec-websocket-accept").ok_or_else(|| {
            Error::Protocol("handshake response missing Sec-WebSocket-Accept".into())
        })?;
        if accept != &compute_accept_key(REQUEST_KEY) {
            return Err(Error::Protocol(format!(
                "handshake accept key mismatch: {accept}"
            )));
        }

        Ok(Self {
            protocol: headers.get("sec-websocket-protocol").cloned(),
        })
    }
}

/// Locate the end of the response header block (the `\r\n\r\n` terminator).
///
/// Returns the length of the block including the terminator, or `None` if the
/// terminator has not arrived yet.
#[must_use]
pub fn header_block_len(buf: &[u8]) -> Option<usize> {
    buf.windows(4)
        .position(|w| w == b"\r\n\r\n")
        .map(|pos| pos + 4)
}
