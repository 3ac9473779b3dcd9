//! Reassembly of fragmented messages.

use bytes::BytesMut;

use crate::error::{Error, Result};
use crate::message::Message;
use crate::protocol::OpCode;

/// Accumulates data-frame payloads until a fragmentation sequence completes.
///
/// A final Text/Binary frame with no open sequence is delivered directly; a
/// non-final one opens the accumulator, continuations extend it, and the
/// final continuation yields the concatenated message.
pub struct MessageAssembler {
    buffer: BytesMut,
    opcode: Option<OpCode>,
    max_message_size: usize,
}

impl MessageAssembler {
    /// Create an assembler enforcing the given total message size.
    #[must_use]
    pub fn new(max_message_size: usize) -> Self {
        Self {
            buffer: BytesMut::new(),
            opcode: None,
            max_message_size,
        }
    }

    /// Feed one data frame's payload.
    ///
    /// Returns `Some(message)` when the frame completes a message, `None`
    /// while fragments are still outstanding.
    ///
    /// # Errors
    ///
    /// - `Error::Protocol` for a continuation with no open sequence, a new
    ///   data frame while a sequence is open, or invalid UTF-8 in a completed
    ///   text message.
    /// - `Error::SizeLimitExceeded` if the accumulated size passes the limit.
    pub fn push(&mut self, opcode: OpCode, fin: bool, payload: &[u8]) -> Result<Option<Message>> {
        match opcode {
            OpCode::Continuation => {
                if self.opcode.is_none() {
                    return Err(Error::Protocol(
                        "continuation frame with no fragmented message open".into(),
                    ));
                }
            }
            OpCode::Text | OpCode::Binary => {
                if self.opcode.is_some() {
                    return Err(Error::Protocol(
                        "new data frame while a fragmented message is open".into(),
                    ));
                }
                if fin {
                    // Fast path: unfragmented message, nothing to accumulate.
                    if payload.len() > self.max_message_size {
                        return Err(Error::SizeLimitExceeded {
                            size: payload.len() as u64,
                            max: self.max_message_size as u64,
                        });
                    }
                    return self.deliver(opcode, payload.to_vec()).map(Some);
                }
                self.opcode = Some(opcode);
            }
            _ => {
                return Err(Error::Protocol(format!(
                    "{opcode} frame passed to message assembler"
                )));
            }
        }

        let new_size = self.buffer.len() + payload.len();
        if new_size > self.max_message_size {
            self.reset();
            return Err(Error::SizeLimitExceeded {
                size: new_size as u64,
                max: self.max_message_size as u64,
            });
        }
        self.buffer.extend_from_slice(payload);

        if fin {
            let opcode = self.opcode.take().unwrap_or(OpCode::Binary);
            let payload = self.buffer.split().to_vec();
            self.deliver(opcode, payload).map(Some)
        } else {
            Ok(None)
        }
    }

    /// Whether a fragmentation sequence is currently open.
    #[must_use]
    pub fn is_assembling(&self) -> bool {
        self.opcode.is_some()
    }

    fn deliver(&self, opcode: OpCode, payload: Vec<u8>) -> Result<Message> {
        match opcode {
            OpCode::Text => {
                let text = String::from_utf8(payload)
                    .map_err(|_| Error::Protocol("invalid UTF-8 in text message".into()))?;
                Ok(Message::Text(text))
            }
            _ => Ok(Message::Binary(payload)),
        }
    }

    fn reset(&mut self) {
        self.buffer.clear();
        self.opcode = None;
    }
}
