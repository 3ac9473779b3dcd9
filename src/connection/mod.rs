//! Connection state machine and session driver.
//!
//! ## Lifecycle
//!
//! 1. **Connecting** - transport being established, handshake in progress
//! 2. **Open** - handshake succeeded, message loop running
//! 3. **Closed** - terminal, transport released
//!
//! Transitions only ever move forward; anything can jump to `Closed`.

mod state;

pub use state::ConnectionState;

#[allow(clippy::module_inception)]
mod connection;

pub use connection::{Connection, Incoming};
