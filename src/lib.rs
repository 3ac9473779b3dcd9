//! # sockline - Client-side WebSocket core
//!
//! `sockline` implements the client side of an RFC 6455 subset: opening
//! handshake, frame header codec, message fragmentation/reassembly and
//! control-frame handling, driven by a single cooperative task per connection
//! so protocol logic reads as straight-line sequential code over an async
//! transport.
//!
//! ## Scope
//!
//! - **Trusted-network subset**: outgoing frames set the mask bit but carry a
//!   fixed all-zero mask key; there is no TLS and no extension support.
//! - **32-bit lengths**: payloads above 2^32 - 1 bytes are rejected.
//! - **Fire-and-forget sends**: `send` enqueues and returns; failures arrive
//!   asynchronously through the close hook.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use sockline::WebSocket;
//!
//! let ws = WebSocket::builder("127.0.0.1", 9001, "/")
//!     .on_message(|msg| println!("{msg:?}"))
//!     .on_close(|reason| println!("closed: {reason:?}"))
//!     .connect();
//! ws.send_text("hello");
//! ```

pub mod client;
pub mod config;
pub mod connection;
pub mod error;
pub mod message;
pub mod protocol;

pub use client::{EventHandlers, WebSocket, WebSocketBuilder};
pub use config::Config;
pub use connection::{Connection, ConnectionState, Incoming};
pub use error::{Error, Result};
pub use message::{CloseCode, CloseFrame, Message};
pub use protocol::{compute_accept_key, FrameHeader, OpCode, REQUEST_KEY, WS_GUID};
