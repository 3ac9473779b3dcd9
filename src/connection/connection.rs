use bytes::{Buf, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::config::Config;
use crate::connection::ConnectionState;
use crate::error::{Error, Result};
use crate::message::{CloseFrame, Message};
use crate::protocol::handshake::{build_request, header_block_len, UpgradeResponse};
use crate::protocol::{decode_header, encode_header, FrameHeader, MessageAssembler, OpCode};

/// A frame event surfaced by [`Connection::next_incoming`].
///
/// Control frames that require a reply are handed to the caller instead of
/// being answered from within the read path, so the read future stays
/// write-free and safe to race in `select!`.
#[derive(Debug)]
pub enum Incoming {
    /// A complete data message, reassembled across fragments.
    Message(Message),
    /// A Ping carrying this payload; answer with [`Connection::send_pong`].
    Ping(Vec<u8>),
    /// A peer Close carrying this raw payload; finish with
    /// [`Connection::echo_close`].
    Close(Vec<u8>),
}

/// One logical WebSocket session over an async byte stream.
///
/// The transport handle and receive buffer are exclusively owned here and
/// touched only by this connection's own control flow: the buffer grows in
/// [`fill_buf`](Self::fill_buf) and shrinks when a decoded frame is consumed,
/// nothing else mutates it. All waiting happens inside the async methods of
/// this type, so a single task driving a `Connection` holds at most one
/// outstanding suspension at a time by construction.
///
/// ## Type Parameters
///
/// - `T`: The underlying async I/O stream (normally `TcpStream`)
pub struct Connection<T> {
    io: T,
    buf: BytesMut,
    state: ConnectionState,
    assembler: MessageAssembler,
    protocol: Option<String>,
    config: Config,
}

impl<T> Connection<T> {
    /// Wrap a freshly connected stream. State starts at `Connecting`;
    /// [`handshake`](Self::handshake) moves it to `Open`.
    pub fn new(io: T, config: Config) -> Self {
        let assembler = MessageAssembler::new(config.effective_max_message_size());
        Self {
            io,
            buf: BytesMut::with_capacity(config.read_chunk_size),
            state: ConnectionState::Connecting,
            assembler,
            protocol: None,
            config,
        }
    }

    /// Get the current connection state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// The subprotocol the server selected during the handshake, if any.
    pub fn protocol(&self) -> Option<&str> {
        self.protocol.as_deref()
    }
}

impl<T: AsyncRead + AsyncWrite + Unpin> Connection<T> {
    /// Perform the client side of the opening handshake.
    ///
    /// Sends the upgrade request, waits until the complete response header
    /// block is buffered, validates it, and consumes exactly the block,
    /// leaving any frame bytes that arrived with it in place for the message
    /// loop.
    ///
    /// ## Errors
    ///
    /// `Error::Protocol` if the status line is not 101 or the accept key does
    /// not match; the connection never reaches `Open` in that case.
    pub async fn handshake(
        &mut self,
        host: &str,
        port: u16,
        path: &str,
        subprotocols: &[String],
    ) -> Result<()> {
        let request = build_request(host, port, path, subprotocols);
        self.io.write_all(request.as_bytes()).await?;
        self.io.flush().await?;

        let block_len = loop {
            if let Some(len) = header_block_len(&self.buf) {
                break len;
            }
            self.fill_buf().await?;
        };

        let response = UpgradeResponse::parse(&self.buf[..block_len])?;
        self.buf.advance(block_len);
        self.protocol = response.protocol;
        self.state = ConnectionState::Open;
        tracing::debug!(host, port, path, protocol = ?self.protocol, "handshake complete");
        Ok(())
    }

    /// Read frames until something actionable arrives.
    ///
    /// Data frames feed the reassembler and only surface once a final
    /// fragment completes a message; Ping and Close come back to the caller,
    /// which owns the replies. Pong and reserved opcodes fail with
    /// `Error::Protocol`.
    ///
    /// Read-only and cancel-safe: no frame is written from inside this
    /// future, and a partially received frame stays buffered, so it can be
    /// raced against a command channel without corrupting the stream.
    pub async fn next_incoming(&mut self) -> Result<Incoming> {
        loop {
            let header = self.next_header().await?;

            while self.buf.len() < header.frame_len() {
                self.fill_buf().await?;
            }
            let payload = self.buf[header.header_len..header.frame_len()].to_vec();
            self.buf.advance(header.frame_len());

            match header.opcode {
                OpCode::Text | OpCode::Binary | OpCode::Continuation => {
                    if let Some(message) =
                        self.assembler.push(header.opcode, header.fin, &payload)?
                    {
                        return Ok(Incoming::Message(message));
                    }
                }
                OpCode::Ping => return Ok(Incoming::Ping(payload)),
                OpCode::Close => return Ok(Incoming::Close(payload)),
                OpCode::Pong => {
                    return Err(Error::Protocol("unsolicited Pong frame".into()));
                }
            }
        }
    }

    /// Sequential receive: dispatch control frames and return the next
    /// complete message.
    ///
    /// Ping gets an automatic Pong with the identical payload; a peer Close
    /// is echoed back and surfaces as `Error::PeerClose`.
    pub async fn next_message(&mut self) -> Result<Message> {
        loop {
            match self.next_incoming().await? {
                Incoming::Message(message) => return Ok(message),
                Incoming::Ping(payload) => self.send_pong(&payload).await?,
                Incoming::Close(payload) => return Err(self.echo_close(&payload).await),
            }
        }
    }

    /// Reply to a Ping with a Pong carrying the identical payload.
    pub async fn send_pong(&mut self, payload: &[u8]) -> Result<()> {
        tracing::debug!(len = payload.len(), "ping, replying with pong");
        self.write_frame(OpCode::Pong, payload).await
    }

    /// Echo a received Close payload back verbatim and decode it into the
    /// terminating `Error::PeerClose`.
    pub async fn echo_close(&mut self, payload: &[u8]) -> Error {
        // The peer is tearing down; a failed echo write changes nothing.
        let _ = self.write_frame(OpCode::Close, payload).await;
        let close = CloseFrame::from_payload(payload);
        Error::PeerClose {
            code: close.code,
            reason: close.reason,
        }
    }

    /// Send a data message. The payload goes out in a single final frame.
    pub async fn send_message(&mut self, message: &Message) -> Result<()> {
        if !self.state.can_send() {
            return Ok(());
        }
        let opcode = if message.is_text() {
            OpCode::Text
        } else {
            OpCode::Binary
        };
        self.write_frame(opcode, message.payload()).await
    }

    /// Send a Close frame.
    pub async fn send_close(&mut self, close: &CloseFrame) -> Result<()> {
        if !self.state.can_send() {
            return Ok(());
        }
        self.write_frame(OpCode::Close, &close.to_payload()).await
    }

    /// Enter the terminal state and release the transport. Idempotent.
    pub async fn shutdown(&mut self) {
        if self.state.is_closed() {
            return;
        }
        self.state = ConnectionState::Closed;
        let _ = self.io.shutdown().await;
    }

    /// Wait until a complete frame header is buffered and decode it.
    async fn next_header(&mut self) -> Result<FrameHeader> {
        loop {
            match decode_header(&self.buf) {
                Ok(header) => return Ok(header),
                Err(Error::Incomplete { .. }) => self.fill_buf().await?,
                Err(e) => return Err(e),
            }
        }
    }

    async fn write_frame(&mut self, opcode: OpCode, payload: &[u8]) -> Result<()> {
        let header = encode_header(opcode, payload.len())?;
        self.io.write_all(&header).await?;
        // The mask key is all zeros, so the payload goes out unmodified.
        self.io.write_all(payload).await?;
        self.io.flush().await?;
        Ok(())
    }

    /// One transport read appended to the receive buffer.
    async fn fill_buf(&mut self) -> Result<()> {
        self.buf.reserve(self.config.read_chunk_size);
        let n = self.io.read_buf(&mut self.buf).await?;
        if n == 0 {
            return Err(Error::Transport("connection closed by transport".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::CloseCode;
    use crate::protocol::{compute_accept_key, REQUEST_KEY};
    use std::io::Cursor;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use tokio::io::ReadBuf;

    struct MockStream {
        read_data: Cursor<Vec<u8>>,
        write_data: Vec<u8>,
    }

    impl MockStream {
        fn new(data: Vec<u8>) -> Self {
            Self {
                read_data: Cursor::new(data),
                write_data: Vec::new(),
            }
        }

        fn written(&self) -> &[u8] {
            &self.write_data
        }
    }

    impl AsyncRead for MockStream {
        fn poll_read(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<std::io::Result<()>> {
            let pos = self.read_data.position() as usize;
            let data = self.read_data.get_ref();
            if pos >= data.len() {
                return Poll::Ready(Ok(()));
            }
            let remaining = &data[pos..];
            let to_copy = std::cmp::min(remaining.len(), buf.remaining());
            buf.put_slice(&remaining[..to_copy]);
            self.read_data.set_position((pos + to_copy) as u64);
            Poll::Ready(Ok(()))
        }
    }

    impl AsyncWrite for MockStream {
        fn poll_write(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &[u8],
        ) -> Poll<std::io::Result<usize>> {
            self.write_data.extend_from_slice(buf);
            Poll::Ready(Ok(buf.len()))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    fn accept_response() -> String {
        format!(
            "HTTP/1.1 101 Switching Protocols\r\n\
             Upgrade: websocket\r\n\
             Connection: Upgrade\r\n\
             Sec-WebSocket-Accept: {}\r\n\
             \r\n",
            compute_accept_key(REQUEST_KEY)
        )
    }

    // FIN=true data or control frame as a server would send it: unmasked.
    fn server_frame(opcode: OpCode, fin: bool, payload: &[u8]) -> Vec<u8> {
        let mut frame = vec![
            if fin { 0x80 } else { 0x00 } | opcode.as_u8(),
            payload.len() as u8,
        ];
        frame.extend_from_slice(payload);
        frame
    }

    #[test]
    fn test_new_starts_connecting() {
        let conn = Connection::new(MockStream::new(vec![]), Config::default());
        assert_eq!(conn.state(), ConnectionState::Connecting);
    }

    #[tokio::test]
    async fn test_handshake_success() {
        let stream = MockStream::new(accept_response().into_bytes());
        let mut conn = Connection::new(stream, Config::default());
        conn.handshake("localhost", 9001, "/", &[]).await.unwrap();
        assert_eq!(conn.state(), ConnectionState::Open);
        assert_eq!(conn.protocol(), None);

        let written = String::from_utf8(conn.io.written().to_vec()).unwrap();
        assert!(written.starts_with("GET / HTTP/1.1\r\n"));
        assert!(written.contains("Host: localhost:9001\r\n"));
    }

    #[tokio::test]
    async fn test_handshake_negotiates_subprotocol() {
        let response = format!(
            "HTTP/1.1 101 Switching Protocols\r\n\
             Sec-WebSocket-Accept: {}\r\n\
             Sec-WebSocket-Protocol: chat\r\n\
             \r\n",
            compute_accept_key(REQUEST_KEY)
        );
        let mut conn = Connection::new(MockStream::new(response.into_bytes()), Config::default());
        conn.handshake("localhost", 9001, "/", &["chat".to_string()])
            .await
            .unwrap();
        assert_eq!(conn.protocol(), Some("chat"));

        let written = String::from_utf8(conn.io.written().to_vec()).unwrap();
        assert!(written.contains("Sec-WebSocket-Protocol: chat\r\n"));
    }

    #[tokio::test]
    async fn test_handshake_bad_status_never_opens() {
        let response = b"HTTP/1.1 403 Forbidden\r\n\r\n".to_vec();
        let mut conn = Connection::new(MockStream::new(response), Config::default());
        let result = conn.handshake("localhost", 9001, "/", &[]).await;
        assert!(matches!(result, Err(Error::Protocol(_))));
        assert_eq!(conn.state(), ConnectionState::Connecting);
    }

    #[tokio::test]
    async fn test_handshake_bad_accept_never_opens() {
        let response = b"HTTP/1.1 101 Switching Protocols\r\n\
            Sec-WebSocket-Accept: bm90IHRoZSByaWdodCBrZXk=\r\n\
            \r\n"
            .to_vec();
        let mut conn = Connection::new(MockStream::new(response), Config::default());
        let result = conn.handshake("localhost", 9001, "/", &[]).await;
        assert!(matches!(result, Err(Error::Protocol(_))));
        assert_eq!(conn.state(), ConnectionState::Connecting);
    }

    #[tokio::test]
    async fn test_handshake_keeps_trailing_frame_bytes() {
        let mut data = accept_response().into_bytes();
        data.extend_from_slice(&server_frame(OpCode::Text, true, b"early"));
        let mut conn = Connection::new(MockStream::new(data), Config::default());
        conn.handshake("localhost", 9001, "/", &[]).await.unwrap();

        let msg = conn.next_message().await.unwrap();
        assert_eq!(msg, Message::text("early"));
    }

    #[tokio::test]
    async fn test_next_message_single_frame() {
        let data = server_frame(OpCode::Text, true, b"Hello");
        let mut conn = Connection::new(MockStream::new(data), Config::default());
        let msg = conn.next_message().await.unwrap();
        assert_eq!(msg, Message::text("Hello"));
    }

    #[tokio::test]
    async fn test_next_message_reassembles_fragments() {
        let mut data = server_frame(OpCode::Text, false, b"AB");
        data.extend_from_slice(&server_frame(OpCode::Continuation, false, b"CD"));
        data.extend_from_slice(&server_frame(OpCode::Continuation, true, b"EF"));
        let mut conn = Connection::new(MockStream::new(data), Config::default());

        let msg = conn.next_message().await.unwrap();
        assert_eq!(msg, Message::text("ABCDEF"));
    }

    #[tokio::test]
    async fn test_ping_gets_automatic_pong() {
        let mut data = server_frame(OpCode::Ping, true, b"p");
        data.extend_from_slice(&server_frame(OpCode::Text, true, b"after"));
        let mut conn = Connection::new(MockStream::new(data), Config::default());

        // The ping is absorbed; the next data message comes through.
        let msg = conn.next_message().await.unwrap();
        assert_eq!(msg, Message::text("after"));

        // Outgoing pong: FIN+Pong, MASK+len=1, zero mask key, payload "p"
        let written = conn.io.written();
        assert_eq!(written[0], 0x8A);
        assert_eq!(written[1], 0x81);
        assert_eq!(&written[2..6], &[0, 0, 0, 0]);
        assert_eq!(written[6], b'p');
    }

    #[tokio::test]
    async fn test_next_incoming_surfaces_control_frames() {
        let mut data = server_frame(OpCode::Ping, true, b"p");
        data.extend_from_slice(&server_frame(OpCode::Close, true, &[]));
        let mut conn = Connection::new(MockStream::new(data), Config::default());

        let ping = conn.next_incoming().await.unwrap();
        assert!(matches!(ping, Incoming::Ping(ref p) if p == b"p"));
        let close = conn.next_incoming().await.unwrap();
        assert!(matches!(close, Incoming::Close(ref p) if p.is_empty()));

        // No replies were written from the read path.
        assert!(conn.io.written().is_empty());
    }

    #[tokio::test]
    async fn test_close_frame_echoed_and_surfaces_peer_close() {
        let mut payload = 1000u16.to_be_bytes().to_vec();
        payload.extend_from_slice(b"bye");
        let data = server_frame(OpCode::Close, true, &payload);
        let mut conn = Connection::new(MockStream::new(data), Config::default());

        let err = conn.next_message().await.unwrap_err();
        assert_eq!(
            err,
            Error::PeerClose {
                code: CloseCode::Normal,
                reason: "bye".into(),
            }
        );
        assert_eq!(err.to_string(), "NormalClosure: bye");

        // Exactly one echoed close frame with the identical payload
        let written = conn.io.written();
        assert_eq!(written[0], 0x88);
        assert_eq!(written[1], 0x85);
        assert_eq!(&written[6..11], payload.as_slice());
        assert_eq!(written.len(), 11);
    }

    #[tokio::test]
    async fn test_close_frame_without_code() {
        let data = server_frame(OpCode::Close, true, &[]);
        let mut conn = Connection::new(MockStream::new(data), Config::default());

        let err = conn.next_message().await.unwrap_err();
        assert_eq!(
            err,
            Error::PeerClose {
                code: CloseCode::NoStatusReceived,
                reason: String::new(),
            }
        );
    }

    #[tokio::test]
    async fn test_pong_is_protocol_error() {
        let data = server_frame(OpCode::Pong, true, b"?");
        let mut conn = Connection::new(MockStream::new(data), Config::default());
        let result = conn.next_message().await;
        assert!(matches!(result, Err(Error::Protocol(_))));
    }

    #[tokio::test]
    async fn test_eof_is_transport_error() {
        let mut conn = Connection::new(MockStream::new(vec![]), Config::default());
        let result = conn.next_message().await;
        assert!(matches!(result, Err(Error::Transport(_))));
    }

    #[tokio::test]
    async fn test_send_message_wire_format() {
        let mut conn = Connection::new(MockStream::new(vec![]), Config::default());
        conn.state = ConnectionState::Open;

        conn.send_message(&Message::text("Hi")).await.unwrap();

        let written = conn.io.written();
        assert_eq!(written[0], 0x81);
        assert_eq!(written[1], 0x82); // MASK bit + len=2
        assert_eq!(&written[2..6], &[0, 0, 0, 0]);
        assert_eq!(&written[6..8], b"Hi");
    }

    #[tokio::test]
    async fn test_send_before_open_is_noop() {
        let mut conn = Connection::new(MockStream::new(vec![]), Config::default());
        conn.send_message(&Message::text("nope")).await.unwrap();
        assert!(conn.io.written().is_empty());
    }

    #[tokio::test]
    async fn test_shutdown_idempotent() {
        let mut conn = Connection::new(MockStream::new(vec![]), Config::default());
        conn.state = ConnectionState::Open;
        conn.shutdown().await;
        assert_eq!(conn.state(), ConnectionState::Closed);
        conn.shutdown().await;
        assert_eq!(conn.state(), ConnectionState::Closed);

        // Sends after shutdown are silent no-ops
        conn.send_message(&Message::text("nope")).await.unwrap();
        assert!(conn.io.written().is_empty());
    }
}
