//! Error types for the WebSocket client core.
//!
//! Every failure raised anywhere in a connection's control flow is one of
//! these variants; the connection driver catches it exactly once at the top
//! level and converts it into the Closed transition.

use thiserror::Error;

use crate::message::CloseCode;

/// Result type alias for WebSocket operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during WebSocket operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// Failure in the underlying byte stream: resolution, connect, read or
    /// write.
    #[error("transport error: {0}")]
    Transport(String),

    /// Malformed or rejected handshake response, unknown opcode, continuation
    /// without an open fragment, invalid UTF-8 in a text message.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Frame or message length outside the supported 32-bit effective range.
    #[error("size limit exceeded: {size} bytes (max: {max})")]
    SizeLimitExceeded {
        /// The declared size.
        size: u64,
        /// The maximum this implementation honors.
        max: u64,
    },

    /// A Close frame received from the far end, distinct from a
    /// locally-initiated close.
    #[error("{code}{}{reason}", if .reason.is_empty() { "" } else { ": " })]
    PeerClose {
        /// The close code decoded from the frame payload.
        code: CloseCode,
        /// The UTF-8 reason text, possibly empty.
        reason: String,
    },

    /// Not enough buffered bytes to decode a frame. Internal to the decode
    /// loop: the driver reads more and retries.
    #[error("incomplete frame: need {needed} more bytes")]
    Incomplete {
        /// Number of additional bytes needed.
        needed: usize,
    },
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Transport(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::SizeLimitExceeded {
            size: 0x1_0000_0000,
            max: 0xFFFF_FFFF,
        };
        assert_eq!(
            err.to_string(),
            "size limit exceeded: 4294967296 bytes (max: 4294967295)"
        );
    }

    #[test]
    fn test_peer_close_display() {
        let err = Error::PeerClose {
            code: CloseCode::Normal,
            reason: "bye".into(),
        };
        assert_eq!(err.to_string(), "NormalClosure: bye");

        let err = Error::PeerClose {
            code: CloseCode::NoStatusReceived,
            reason: String::new(),
        };
        assert_eq!(err.to_string(), "NoStatusReceived");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe broken");
        let ws_err: Error = io_err.into();
        assert!(matches!(ws_err, Error::Transport(_)));
    }

    #[test]
    fn test_error_clone() {
        let err = Error::Protocol("unexpected continuation".into());
        assert_eq!(err.clone(), err);
    }
}
