//! Connection configuration.

use crate::protocol::MAX_PAYLOAD_LEN;

/// Tuning knobs for a connection.
///
/// The defaults suit interactive use; the message size ceiling can never
/// exceed the protocol's 32-bit effective range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Bytes requested from the transport per read.
    ///
    /// Default: 64 KB
    pub read_chunk_size: usize,

    /// Maximum size of a reassembled message in bytes.
    ///
    /// Default: 64 MB. Capped at 2^32 - 1 regardless of the configured value.
    pub max_message_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            read_chunk_size: 64 * 1024,
            max_message_size: 64 * 1024 * 1024,
        }
    }
}

impl Config {
    /// Effective message size limit after applying the protocol cap.
    #[must_use]
    pub fn effective_max_message_size(&self) -> usize {
        let cap = usize::try_from(MAX_PAYLOAD_LEN).unwrap_or(usize::MAX);
        self.max_message_size.min(cap)
    }
}
