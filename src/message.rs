//! WebSocket message types and close codes (RFC 6455).

/// WebSocket close status code per RFC 6455 Section 7.4.
///
/// Covers the 1000-1015 registered range with a mnemonic for each code;
/// anything outside that range falls back to the raw numeric value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[non_exhaustive]
pub enum CloseCode {
    /// Normal closure (1000).
    #[default]
    Normal,
    /// Going away (1001). Endpoint is shutting down or navigating away.
    GoingAway,
    /// Protocol error (1002).
    ProtocolError,
    /// Unsupported data (1003).
    UnsupportedData,
    /// Reserved (1004).
    Reserved,
    /// No status received (1005). Used when a Close frame carried no code.
    NoStatusReceived,
    /// Abnormal closure (1006).
    AbnormalClosure,
    /// Invalid frame payload data (1007).
    InvalidFramePayload,
    /// Policy violation (1008).
    PolicyViolation,
    /// Message too big (1009).
    MessageTooBig,
    /// Mandatory extension (1010).
    MandatoryExtension,
    /// Internal error (1011).
    InternalError,
    /// Service restart (1012).
    ServiceRestart,
    /// Try again later (1013).
    TryAgainLater,
    /// Bad gateway (1014).
    BadGateway,
    /// TLS handshake failure (1015).
    TlsHandshake,
    /// Any code outside the 1000-1015 registered range.
    Other(u16),
}

impl CloseCode {
    /// Create a `CloseCode` from its numeric value.
    #[must_use]
    pub const fn from_u16(code: u16) -> Self {
        match code {
            1000 => CloseCode::Normal,
            1001 => CloseCode::GoingAway,
            1002 => CloseCode::ProtocolError,
            1003 => CloseCode::UnsupportedData,
            1004 => CloseCode::Reserved,
            1005 => CloseCode::NoStatusReceived,
            1006 => CloseCode::AbnormalClosure,
            1007 => CloseCode::InvalidFramePayload,
            1008 => CloseCode::PolicyViolation,
            1009 => CloseCode::MessageTooBig,
            1010 => CloseCode::MandatoryExtension,
            1011 => CloseCode::InternalError,
            1012 => CloseCode::ServiceRestart,
            1013 => CloseCode::TryAgainLater,
            1014 => CloseCode::BadGateway,
            1015 => CloseCode::TlsHandshake,
            other => CloseCode::Other(other),
        }
    }

    /// Get the numeric value of this close code.
    #[must_use]
    pub const fn as_u16(&self) -> u16 {
        match self {
            CloseCode::Normal => 1000,
            CloseCode::GoingAway => 1001,
            CloseCode::ProtocolError => 1002,
            CloseCode::UnsupportedData => 1003,
            CloseCode::Reserved => 1004,
            CloseCode::NoStatusReceived => 1005,
            CloseCode::AbnormalClosure => 1006,
            CloseCode::InvalidFramePayload => 1007,
            CloseCode::PolicyViolation => 1008,
            CloseCode::MessageTooBig => 1009,
            CloseCode::MandatoryExtension => 1010,
            CloseCode::InternalError => 1011,
            CloseCode::ServiceRestart => 1012,
            CloseCode::TryAgainLater => 1013,
            CloseCode::BadGateway => 1014,
            CloseCode::TlsHandshake => 1015,
            CloseCode::Other(code) => *code,
        }
    }

    /// Mnemonic for this close code, or `None` for unregistered codes.
    #[must_use]
    pub const fn name(&self) -> Option<&'static str> {
        match self {
            CloseCode::Normal => Some("NormalClosure"),
            CloseCode::GoingAway => Some("GoingAway"),
            CloseCode::ProtocolError => Some("ProtocolError"),
            CloseCode::UnsupportedData => Some("UnsupportedData"),
            CloseCode::Reserved => Some("Reserved"),
            CloseCode::NoStatusReceived => Some("NoStatusReceived"),
            CloseCode::AbnormalClosure => Some("AbnormalClosure"),
            CloseCode::InvalidFramePayload => Some("InvalidFramePayload"),
            CloseCode::PolicyViolation => Some("PolicyViolation"),
            CloseCode::MessageTooBig => Some("MessageTooBig"),
            CloseCode::MandatoryExtension => Some("MandatoryExtension"),
            CloseCode::InternalError => Some("InternalError"),
            CloseCode::ServiceRestart => Some("ServiceRestart"),
            CloseCode::TryAgainLater => Some("TryAgainLater"),
            CloseCode::BadGateway => Some("BadGateway"),
            CloseCode::TlsHandshake => Some("TlsHandshake"),
            CloseCode::Other(_) => None,
        }
    }
}

impl std::fmt::Display for CloseCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{name}"),
            None => write!(f, "{}", self.as_u16()),
        }
    }
}

/// Close frame contents: status code and optional reason text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseFrame {
    /// The close status code.
    pub code: CloseCode,
    /// Human-readable reason for closing (UTF-8).
    pub reason: String,
}

impl CloseFrame {
    /// Create a new close frame with the given code and reason.
    #[must_use]
    pub fn new(code: CloseCode, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
        }
    }

    /// Decode a close frame from a Close frame's payload.
    ///
    /// First two bytes are the big-endian code; the remainder is UTF-8 reason
    /// text. A payload shorter than two bytes maps to `NoStatusReceived`.
    #[must_use]
    pub fn from_payload(payload: &[u8]) -> Self {
        if payload.len() < 2 {
            return Self::new(CloseCode::NoStatusReceived, "");
        }
        let code = CloseCode::from_u16(u16::from_be_bytes([payload[0], payload[1]]));
        let reason = String::from_utf8_lossy(&payload[2..]).into_owned();
        Self::new(code, reason)
    }

    /// Encode this close frame into a Close frame payload.
    #[must_use]
    pub fn to_payload(&self) -> Vec<u8> {
        let mut payload = self.code.as_u16().to_be_bytes().to_vec();
        payload.extend_from_slice(self.reason.as_bytes());
        payload
    }
}

impl std::fmt::Display for CloseFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.reason.is_empty() {
            write!(f, "{}", self.code)
        } else {
            write!(f, "{}: {}", self.code, self.reason)
        }
    }
}

/// A complete WebSocket message as observed by the caller.
///
/// Either a single final frame's payload or the concatenation of a
/// fragmentation sequence once the final frame arrives. Control frames are
/// handled inside the connection and never surface here.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Message {
    /// A text message (UTF-8 encoded).
    Text(String),
    /// A binary message (arbitrary bytes).
    Binary(Vec<u8>),
}

impl Message {
    /// Create a text message.
    #[must_use]
    pub fn text(s: impl Into<String>) -> Self {
        Message::Text(s.into())
    }

    /// Create a binary message.
    #[must_use]
    pub fn binary(data: impl Into<Vec<u8>>) -> Self {
        Message::Binary(data.into())
    }

    /// Returns `true` if this is a text message.
    #[must_use]
    pub const fn is_text(&self) -> bool {
        matches!(self, Message::Text(_))
    }

    /// Borrow the payload bytes regardless of message kind.
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        match self {
            Message::Text(s) => s.as_bytes(),
            Message::Binary(data) => data,
        }
    }

    /// Consume and return the text content, if this is a text message.
    #[must_use]
    pub fn into_text(self) -> Option<String> {
        match self {
            Message::Text(s) => Some(s),
            Message::Binary(_) => None,
        }
    }
}
