//! Public client surface: builder, handle and connection driver.
//!
//! One spawned task drives the whole lifecycle of a connection in program
//! order: connect, handshake, message loop. The caller holds a [`WebSocket`]
//! handle whose `send` and `close` enqueue commands and return immediately;
//! outcomes, including write failures, are reported through the close hook
//! rather than at the call site.
//!
//! # Example
//!
//! ```ignore
//! use sockline::{Message, WebSocket};
//!
//! let ws = WebSocket::builder("127.0.0.1", 9001, "/")
//!     .on_open(|| println!("open"))
//!     .on_message(|msg| println!("got {:?}", msg))
//!     .on_close(|reason| println!("closed: {:?}", reason))
//!     .connect();
//!
//! ws.send_text("hello");
//! ws.close(None);
//! ```

use tokio::net::TcpStream;
use tokio::sync::mpsc;

use crate::config::Config;
use crate::connection::{Connection, Incoming};
use crate::error::Result;
use crate::message::{CloseCode, CloseFrame, Message};

/// Commands delivered from the handle to the driver task.
enum Command {
    Send(Message),
    Close(Option<String>),
}

/// Caller-settable notification hooks.
///
/// Each hook defaults to a no-op. Hooks run on the driver task and are
/// expected to return promptly; blocking work inside them stalls the
/// connection.
pub struct EventHandlers {
    on_open: Box<dyn FnMut() + Send>,
    on_message: Box<dyn FnMut(Message) + Send>,
    on_close: Box<dyn FnMut(Option<String>) + Send>,
}

impl Default for EventHandlers {
    fn default() -> Self {
        Self {
            on_open: Box::new(|| {}),
            on_message: Box::new(|_| {}),
            on_close: Box::new(|_| {}),
        }
    }
}

/// Builder for configuring and opening a WebSocket connection.
pub struct WebSocketBuilder {
    host: String,
    port: u16,
    path: String,
    subprotocols: Vec<String>,
    config: Config,
    hooks: EventHandlers,
}

impl WebSocketBuilder {
    fn new(host: impl Into<String>, port: u16, path: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            path: path.into(),
            subprotocols: Vec::new(),
            config: Config::default(),
            hooks: EventHandlers::default(),
        }
    }

    /// Request these subprotocols in the handshake.
    #[must_use]
    pub fn subprotocols<I, S>(mut self, protocols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.subprotocols = protocols.into_iter().map(Into::into).collect();
        self
    }

    /// Override the connection configuration.
    #[must_use]
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Hook invoked once when the handshake completes.
    #[must_use]
    pub fn on_open(mut self, hook: impl FnMut() + Send + 'static) -> Self {
        self.hooks.on_open = Box::new(hook);
        self
    }

    /// Hook invoked for every complete reassembled message.
    #[must_use]
    pub fn on_message(mut self, hook: impl FnMut(Message) + Send + 'static) -> Self {
        self.hooks.on_message = Box::new(hook);
        self
    }

    /// Hook invoked exactly once when the connection reaches `Closed`.
    ///
    /// The argument is `None` for a clean locally-initiated close, or a
    /// descriptive reason for peer closes and failures.
    #[must_use]
    pub fn on_close(mut self, hook: impl FnMut(Option<String>) + Send + 'static) -> Self {
        self.hooks.on_close = Box::new(hook);
        self
    }

    /// Spawn the driver task and return the handle.
    ///
    /// Returns immediately; connection progress is reported through the
    /// hooks. Must be called within a tokio runtime.
    pub fn connect(self) -> WebSocket {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run(
            self.host,
            self.port,
            self.path,
            self.subprotocols,
            self.config,
            self.hooks,
            rx,
        ));
        WebSocket { tx }
    }
}

/// Handle to a live (or closing) WebSocket connection.
///
/// Cheap to clone is not needed: one handle per connection. Dropping the
/// handle closes the connection.
pub struct WebSocket {
    tx: mpsc::UnboundedSender<Command>,
}

impl WebSocket {
    /// Start building a connection to `ws://host:port{path}`.
    pub fn builder(
        host: impl Into<String>,
        port: u16,
        path: impl Into<String>,
    ) -> WebSocketBuilder {
        WebSocketBuilder::new(host, port, path)
    }

    /// Enqueue a message for sending. Fire-and-forget: returns immediately,
    /// and a send on a closed connection is a silent no-op. A write failure
    /// surfaces asynchronously through the close hook.
    pub fn send(&self, message: Message) {
        let _ = self.tx.send(Command::Send(message));
    }

    /// Enqueue a text message.
    pub fn send_text(&self, text: impl Into<String>) {
        self.send(Message::text(text));
    }

    /// Enqueue a binary message.
    pub fn send_binary(&self, data: impl Into<Vec<u8>>) {
        self.send(Message::binary(data));
    }

    /// Request a clean close, optionally with a reason sent to the peer.
    ///
    /// Safe to call any number of times and from any context; only the first
    /// request has an effect and the close hook still fires exactly once.
    pub fn close(&self, reason: Option<String>) {
        let _ = self.tx.send(Command::Close(reason));
    }
}

/// Driver task: runs the connection to completion and converts any failure
/// into the single close notification.
async fn run(
    host: String,
    port: u16,
    path: String,
    subprotocols: Vec<String>,
    config: Config,
    mut hooks: EventHandlers,
    rx: mpsc::UnboundedReceiver<Command>,
) {
    let reason = match drive(&host, port, &path, &subprotocols, config, &mut hooks, rx).await {
        Ok(()) => None,
        Err(e) => {
            tracing::debug!(host = %host, port, error = %e, "connection closed with error");
            Some(e.to_string())
        }
    };
    (hooks.on_close)(reason);
}

/// The connection's single control flow: every await in here is the one
/// outstanding suspension for this connection, and every error unwinds to
/// [`run`]'s top-level handler.
async fn drive(
    host: &str,
    port: u16,
    path: &str,
    subprotocols: &[String],
    config: Config,
    hooks: &mut EventHandlers,
    mut rx: mpsc::UnboundedReceiver<Command>,
) -> Result<()> {
    let stream = TcpStream::connect((host, port)).await?;
    let mut conn = Connection::new(stream, config);
    conn.handshake(host, port, path, subprotocols).await?;
    (hooks.on_open)();

    loop {
        tokio::select! {
            command = rx.recv() => {
                match command {
                    Some(Command::Send(message)) => {
                        conn.send_message(&message).await?;
                    }
                    Some(Command::Close(reason)) => {
                        let close =
                            CloseFrame::new(CloseCode::Normal, reason.unwrap_or_default());
                        conn.send_close(&close).await?;
                        conn.shutdown().await;
                        return Ok(());
                    }
                    // Handle dropped: close the connection.
                    None => {
                        let close = CloseFrame::new(CloseCode::GoingAway, "");
                        let _ = conn.send_close(&close).await;
                        conn.shutdown().await;
                        return Ok(());
                    }
                }
            }
            incoming = conn.next_incoming() => {
                // Control replies happen here, after the race has resolved,
                // so no write can be cancelled halfway through a frame.
                match incoming? {
                    Incoming::Message(message) => (hooks.on_message)(message),
                    Incoming::Ping(payload) => conn.send_pong(&payload).await?,
                    Incoming::Close(payload) => {
                        let err = conn.echo_close(&payload).await;
                        conn.shutdown().await;
                        return Err(err);
                    }
                }
            }
        }
    }
}
