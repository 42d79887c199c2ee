mod frame;
mod reader;

pub mod encoding;
pub mod types;

pub use encoding::Encodable;
pub use frame::{checksum, CommandId, Frame, HexDump, ACK, ENQ, ETX, MAX_FRAME_LEN, MIN_FRAME_LEN, NAK, STX};
pub use reader::FrameReader;
