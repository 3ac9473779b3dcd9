//! Connection lifecycle states.

/// WebSocket connection state.
///
/// Transitions are monotonic: `Connecting` → `Open` → `Closed`, never
/// reversed. Any state can jump straight to `Closed`; re-entering `Closed`
/// is a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    /// Transport not yet established; handshake in progress.
    #[default]
    Connecting,
    /// Handshake succeeded; the message loop is running.
    Open,
    /// Terminal. The transport handle has been released.
    Closed,
}

impl ConnectionState {
    /// Check if sending data is allowed in this state.
    #[must_use]
    #[inline]
    pub const fn can_send(&self) -> bool {
        matches!(self, ConnectionState::Open)
    }

    /// Check if this is the terminal state.
    #[must_use]
    #[inline]
    pub const fn is_closed(&self) -> bool {
        matches!(self, ConnectionState::Closed)
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Connecting => write!(f, "Connecting"),
            ConnectionState::Open => write!(f, "Open"),
            ConnectionState::Closed => write!(f, "Closed"),
        }
    }
}
