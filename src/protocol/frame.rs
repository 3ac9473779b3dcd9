//! Frame header encoding and decoding (RFC 6455 subset).
//!
//! Only headers are handled here: the decoder reports how many bytes the
//! header and payload occupy, and the connection consumes the payload itself
//! once that many bytes are buffered.
//!
//! ## Frame structure
//!
//! ```text
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-------+-+-------------+-------------------------------+
//! |F|R|R|R| opcode|M| Payload len |    Extended payload length    |
//! |I|S|S|S|  (4)  |A|     (7)     |             (16/64)           |
//! |N|V|V|V|       |S|             |   (if payload len==126/127)   |
//! | |1|2|3|       |K|             |                               |
//! +-+-+-+-+-------+-+-------------+-------------------------------+
//! |                 Masking key (if MASK set)                     |
//! +---------------------------------------------------------------+
//! |                     Payload data                              |
//! +---------------------------------------------------------------+
//! ```

use crate::error::{Error, Result};
use crate::protocol::OpCode;

/// The fixed masking key transmitted with every outgoing frame.
///
/// The MASK bit is set on the wire but the key is all zeros, so masking is a
/// byte-for-byte no-op. This is a deliberate compatibility shortcut for a
/// trusted-network deployment, not a general-purpose masking implementation.
pub const MASK_KEY: [u8; 4] = [0, 0, 0, 0];

/// Largest payload length this implementation honors (2^32 - 1).
///
/// 64-bit extended length fields are decoded but rejected when any of the
/// upper 32 bits are set.
pub const MAX_PAYLOAD_LEN: u64 = u32::MAX as u64;

/// A decoded frame header.
///
/// Transient: exists only between decoding a header and consuming its
/// payload. The payload itself is never part of this struct.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Frame opcode from the low 4 bits of byte 0.
    pub opcode: OpCode,
    /// Final fragment flag from the high bit of byte 0.
    pub fin: bool,
    /// Bytes occupied by the header, including the mask key if present.
    pub header_len: usize,
    /// Declared payload length in bytes.
    pub payload_len: usize,
}

impl FrameHeader {
    /// Total wire size of the frame this header describes.
    #[must_use]
    pub const fn frame_len(&self) -> usize {
        self.header_len + self.payload_len
    }
}

/// Decode a frame header from the front of `buf`.
///
/// Does not consume payload bytes; the caller advances the buffer by
/// [`FrameHeader::frame_len`] once the payload has been taken.
///
/// # Errors
///
/// - `Error::Incomplete` if fewer bytes are buffered than the length field
///   requires (2, 4 or 10).
/// - `Error::Protocol` for reserved opcodes.
/// - `Error::SizeLimitExceeded` if a 64-bit length has non-zero upper bits.
pub fn decode_header(buf: &[u8]) -> Result<FrameHeader> {
    if buf.len() < 2 {
        return Err(Error::Incomplete {
            needed: 2 - buf.len(),
        });
    }

    let byte0 = buf[0];
    let byte1 = buf[1];

    let fin = (byte0 & 0x80) != 0;
    let opcode = OpCode::from_u8(byte0 & 0x0F)?;
    let masked = (byte1 & 0x80) != 0;
    let base_len = byte1 & 0x7F;

    let (payload_len, base_size) = match base_len {
        0..=125 => (u64::from(base_len), 2),
        126 => {
            if buf.len() < 4 {
                return Err(Error::Incomplete {
                    needed: 4 - buf.len(),
                });
            }
            (u64::from(u16::from_be_bytes([buf[2], buf[3]])), 4)
        }
        127 => {
            if buf.len() < 10 {
                return Err(Error::Incomplete {
                    needed: 10 - buf.len(),
                });
            }
            let len = u64::from_be_bytes([
                buf[2], buf[3], buf[4], buf[5], buf[6], buf[7], buf[8], buf[9],
            ]);
            if len > MAX_PAYLOAD_LEN {
                return Err(Error::SizeLimitExceeded {
                    size: len,
                    max: MAX_PAYLOAD_LEN,
                });
            }
            (len, 10)
        }
        _ => unreachable!(),
    };

    let header_len = if masked { base_size + 4 } else { base_size };

    Ok(FrameHeader {
        opcode,
        fin,
        header_len,
        payload_len: payload_len as usize,
    })
}

/// Encode a frame header for an outgoing frame of `payload_len` bytes.
///
/// Chooses the minimal length representation (2, 4 or 10 byte base header),
/// sets the FIN bit and the MASK bit, and appends the fixed all-zero
/// [`MASK_KEY`]. The payload is written separately by the caller; with a zero
/// key no masking pass over it is needed.
///
/// # Errors
///
/// Returns `Error::SizeLimitExceeded` if `payload_len` exceeds
/// [`MAX_PAYLOAD_LEN`].
pub fn encode_header(opcode: OpCode, payload_len: usize) -> Result<Vec<u8>> {
    if payload_len as u64 > MAX_PAYLOAD_LEN {
        return Err(Error::SizeLimitExceeded {
            size: payload_len as u64,
            max: MAX_PAYLOAD_LEN,
        });
    }

    let mut header = Vec::with_capacity(14);
    header.push(0x80 | opcode.as_u8());

    if payload_len < 126 {
        header.push(0x80 | payload_len as u8);
    } else if payload_len < 65536 {
        header.push(0x80 | 126);
        header.extend_from_slice(&(payload_len as u16).to_be_bytes());
    } else {
        header.push(0x80 | 127);
        header.extend_from_slice(&(payload_len as u64).to_be_bytes());
    }

    header.extend_from_slice(&MASK_KEY);
    Ok(header)
}
