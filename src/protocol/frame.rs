use core::fmt;

use heapless::Vec;

use crate::error::FrameError;

pub const STX: u8 = 0x02;
pub const ETX: u8 = 0x03;
pub const ENQ: u8 = 0x05;
pub const ACK: u8 = 0x06;
pub const NAK: u8 = 0x15;

/// Largest frame the reader will accumulate, markers included.
pub const MAX_FRAME_LEN: usize = 256;

/// STX, a single command byte, checksum, ETX.
pub const MIN_FRAME_LEN: usize = 4;

/// STX, checksum and ETX.
const FRAMING_LEN: usize = 3;

/// Sum of the body bytes, modulo 256. The peer never sends ETX as a checksum
/// since it would end the frame early; ENQ goes out in its place.
pub fn checksum(body: &[u8]) -> u8 {
    let sum = body.iter().fold(0u8, |acc, b| acc.wrapping_add(*b));
    if sum == ETX { ENQ } else { sum }
}

/// The one or two identifier bytes at the start of a frame body. The identity
/// probe is the only command known to go without a second byte.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct CommandId {
    pub family: u8,
    pub sub: Option<u8>,
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.family as char)?;
        if let Some(sub) = self.sub {
            write!(f, "{}", sub as char)?;
        }
        Ok(())
    }
}

/// A complete frame, STX through ETX.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Frame {
    bytes: Vec<u8, MAX_FRAME_LEN>,
}

impl Frame {
    pub fn build(command: &[u8], payload: &[u8]) -> Result<Self, FrameError> {
        let overflow = FrameError::Overflow { max: MAX_FRAME_LEN };
        if command.len() + payload.len() + FRAMING_LEN > MAX_FRAME_LEN {
            return Err(overflow);
        }

        let mut bytes: Vec<u8, MAX_FRAME_LEN> = Vec::new();
        bytes.push(STX).map_err(|_| overflow)?;
        bytes.extend_from_slice(command).map_err(|_| overflow)?;
        bytes.extend_from_slice(payload).map_err(|_| overflow)?;
        let sum = checksum(&bytes[1..]);
        bytes.push(sum).map_err(|_| overflow)?;
        bytes.push(ETX).map_err(|_| overflow)?;
        Ok(Self { bytes })
    }

    /// Wraps bytes exactly as received; nothing is checked until `validate`.
    pub fn from_bytes(raw: &[u8]) -> Result<Self, FrameError> {
        Vec::from_slice(raw)
            .map(|bytes| Self { bytes })
            .map_err(|_| FrameError::Overflow { max: MAX_FRAME_LEN })
    }

    pub(crate) fn from_raw(bytes: Vec<u8, MAX_FRAME_LEN>) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Command identifier and payload, without markers or checksum.
    pub fn body(&self) -> &[u8] {
        if self.bytes.len() < FRAMING_LEN {
            return &[];
        }
        &self.bytes[1..self.bytes.len() - 2]
    }

    pub fn received_checksum(&self) -> Option<u8> {
        self.bytes.len().checked_sub(2).map(|i| self.bytes[i])
    }

    pub fn command(&self) -> Option<CommandId> {
        let body = self.body();
        body.first().map(|&family| CommandId { family, sub: body.get(1).copied() })
    }

    pub fn payload(&self) -> &[u8] {
        self.body().get(2..).unwrap_or(&[])
    }

    pub fn validate(&self) -> bool {
        self.bytes.len() >= MIN_FRAME_LEN
            && self.bytes.first() == Some(&STX)
            && self.bytes.last() == Some(&ETX)
            && self.received_checksum() == Some(checksum(self.body()))
    }
}

/// Formats bytes as space separated hex for the `Rx`/`Tx` dumps.
pub struct HexDump<'a>(pub &'a [u8]);

impl fmt::Display for HexDump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, " {:02X}", byte)?;
        }
        Ok(())
    }
}
