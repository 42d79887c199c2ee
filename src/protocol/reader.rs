use heapless::Vec;

use super::frame::{Frame, ETX, MAX_FRAME_LEN, STX};
use crate::error::FrameError;

/// Reassembles frames from the serial line, one byte at a time.
///
/// Bytes outside a frame are rejected until a start marker shows up. From
/// there everything is buffered until an end marker arrives or the buffer
/// fills, in which case the partial frame is thrown away and the reader
/// starts hunting for STX again. A start marker arriving on a full buffer
/// opens the next frame.
#[derive(Debug, Default)]
pub struct FrameReader {
    buffer: Vec<u8, MAX_FRAME_LEN>,
}

impl FrameReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// True while part of a frame is buffered.
    pub fn in_frame(&self) -> bool {
        !self.buffer.is_empty()
    }

    pub fn feed(&mut self, byte: u8) -> Result<Option<Frame>, FrameError> {
        if self.buffer.is_empty() && byte != STX {
            return Err(FrameError::Garbage(byte));
        }

        if self.buffer.push(byte).is_err() {
            self.buffer.clear();
            if byte == STX {
                // Cannot fail on an empty buffer.
                let _ = self.buffer.push(STX);
            }
            return Err(FrameError::TooLong { max: MAX_FRAME_LEN });
        }

        if byte == ETX {
            let raw = core::mem::take(&mut self.buffer);
            return Ok(Some(Frame::from_raw(raw)));
        }

        Ok(None)
    }

    pub fn reset(&mut self) {
        self.buffer.clear();
    }
}
