//! WebSocket protocol core (RFC 6455 subset).

pub mod assembler;
pub mod frame;
pub mod handshake;
pub mod opcode;

pub use assembler::MessageAssembler;
pub use frame::{decode_header, encode_header, FrameHeader, MASK_KEY, MAX_PAYLOAD_LEN};
pub use handshake::{build_request, compute_accept_key, UpgradeResponse, REQUEST_KEY, WS_GUID};
pub use opcode::OpCode;
