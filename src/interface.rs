use embedded_hal::serial;
use log::{debug, info, trace, warn};

use crate::dispatch::{dispatch, Reply};
use crate::error::{ChannelError, FrameError};
use crate::protocol::{checksum, Frame, FrameReader, HexDump, ACK, NAK, STX};
use crate::unit::UnitState;

pub type DeviceError<S> =
    ChannelError<<S as serial::Read<u8>>::Error, <S as serial::Write<u8>>::Error>;

/// What the peer sent after one of our responses.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Handshake {
    Acked,
    /// No ACK; the peer went straight on to its next frame. Some cloud
    /// controllers do this after a short delay.
    NextFrameStarted,
    Unexpected(u8),
}

/// A simulated unit answering on one serial channel.
///
/// Each transaction is fully synchronous: read a frame, validate it, dispatch
/// it, reply, and for framed replies wait for the peer's ACK. Anything wrong
/// with the traffic is logged and skipped; only a failing channel ends the
/// loop.
pub struct S21Device<S>
where
    S: serial::Read<u8> + serial::Write<u8>,
{
    serial: S,
    reader: FrameReader,
    unit: UnitState,
}

impl<S> S21Device<S>
where
    S: serial::Read<u8> + serial::Write<u8>,
{
    pub fn new(serial: S, unit: UnitState) -> Self {
        S21Device { serial, reader: FrameReader::new(), unit }
    }

    pub fn unit(&self) -> &UnitState {
        &self.unit
    }

    pub fn release(self) -> (S, UnitState) {
        (self.serial, self.unit)
    }

    /// Serves transactions until the channel fails.
    pub fn run(&mut self) -> Result<core::convert::Infallible, DeviceError<S>> {
        loop {
            self.poll()?;
        }
    }

    /// Serves one transaction.
    pub fn poll(&mut self) -> Result<(), DeviceError<S>> {
        let frame = self.read_frame()?;
        trace!("Rx:{}", HexDump(frame.as_bytes()));

        if !frame.validate() {
            // Dropped without a NAK, same as a real unit.
            info!(
                "Bad checksum: 0x{:02X} vs 0x{:02X}",
                checksum(frame.body()),
                frame.received_checksum().unwrap_or_default()
            );
            return Ok(());
        }

        match dispatch(&frame, &mut self.unit) {
            Reply::Ack => self.send(&[ACK]),
            Reply::Nak => self.send(&[NAK]),
            Reply::Response(response) => {
                self.send(&[ACK])?;
                self.send(response.as_bytes())?;
                self.await_ack().map(|_| ())
            }
        }
    }

    fn read_byte(&mut self) -> Result<u8, DeviceError<S>> {
        nb::block!(self.serial.read()).map_err(ChannelError::Read)
    }

    fn read_frame(&mut self) -> Result<Frame, DeviceError<S>> {
        loop {
            let byte = self.read_byte()?;
            match self.reader.feed(byte) {
                Ok(Some(frame)) => return Ok(frame),
                Ok(None) => {}
                Err(e @ FrameError::Garbage(_)) => info!("{}", e),
                Err(e) => warn!("{}", e),
            }
        }
    }

    fn send(&mut self, bytes: &[u8]) -> Result<(), DeviceError<S>> {
        trace!("Tx:{}", HexDump(bytes));
        for byte in bytes {
            nb::block!(self.serial.write(*byte)).map_err(ChannelError::Write)?;
        }
        nb::block!(self.serial.flush()).map_err(ChannelError::Write)
    }

    /// Waits, without a timeout, for the peer to acknowledge a response.
    fn await_ack(&mut self) -> Result<Handshake, DeviceError<S>> {
        let byte = self.read_byte()?;
        trace!("Rx:{}", HexDump(&[byte]));

        let outcome = match byte {
            ACK => Handshake::Acked,
            STX => {
                debug!("The controller didn't ACK our response, next frame started!");
                // The start marker belongs to the next frame.
                self.reader.reset();
                let _ = self.reader.feed(STX);
                Handshake::NextFrameStarted
            }
            other => {
                warn!("Protocol error: expected ACK, got 0x{:02X}", other);
                Handshake::Unexpected(other)
            }
        };
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::types::{Fan, HalfDegreesC, Mode, Settings};
    use crate::protocol::{ETX, MAX_FRAME_LEN};
    use crate::unit::UnitConfig;
    use std::collections::VecDeque;
    use std::vec::Vec;

    #[derive(Debug, PartialEq)]
    struct Closed;

    /// Serial double: plays back scripted input and records everything
    /// written. Running out of input reads as the line going away.
    #[derive(Default)]
    struct Loopback {
        rx: VecDeque<u8>,
        tx: Vec<u8>,
    }

    impl Loopback {
        fn new(input: &[&[u8]]) -> Self {
            Loopback { rx: input.concat().into_iter().collect(), tx: Vec::new() }
        }
    }

    impl serial::Read<u8> for Loopback {
        type Error = Closed;

        fn read(&mut self) -> nb::Result<u8, Closed> {
            self.rx.pop_front().ok_or(nb::Error::Other(Closed))
        }
    }

    impl serial::Write<u8> for Loopback {
        type Error = core::convert::Infallible;

        fn write(&mut self, word: u8) -> nb::Result<(), Self::Error> {
            self.tx.push(word);
            Ok(())
        }

        fn flush(&mut self) -> nb::Result<(), Self::Error> {
            Ok(())
        }
    }

    fn frame(command: &[u8], payload: &[u8]) -> Vec<u8> {
        Frame::build(command, payload).unwrap().as_bytes().to_vec()
    }

    fn run(config: UnitConfig, input: &[&[u8]]) -> (Vec<u8>, UnitState) {
        let unit = UnitState::new(config).unwrap();
        let mut device = S21Device::new(Loopback::new(input), unit);
        match device.run() {
            Err(ChannelError::Read(Closed)) => {}
            Err(e) => panic!("unexpected channel error: {}", e),
            Ok(never) => match never {},
        }
        let (serial, unit) = device.release();
        (serial.tx, unit)
    }

    fn auto_22_5() -> UnitConfig {
        let mut config = UnitConfig::default();
        config.settings = Settings {
            power: true,
            mode: Mode::Auto,
            target: HalfDegreesC(45),
            fan: Fan::Speed(3),
        };
        config
    }

    #[test]
    fn query_acks_before_payload_test() {
        let (tx, _) = run(auto_22_5(), &[&frame(b"F1", b""), &[ACK]]);
        assert_eq!(
            tx,
            [ACK, STX, b'G', b'1', b'1', b'3', b'I', b'5', 0x5a, ETX]
        );
    }

    #[test]
    fn sensor_query_test() {
        let (tx, _) = run(auto_22_5(), &[&frame(b"RH", b""), &[ACK]]);
        assert_eq!(tx[0], ACK);
        assert_eq!(&tx[1..], &frame(b"SH", b"542+")[..]);
    }

    #[test]
    fn bad_checksum_is_silent_test() {
        let mut corrupted = frame(b"D1", b"02D3");
        let len = corrupted.len();
        corrupted[len - 2] ^= 0x01;
        let (tx, unit) = run(auto_22_5(), &[&corrupted]);
        assert!(tx.is_empty());
        assert_eq!(unit, UnitState::new(auto_22_5()).unwrap());
    }

    #[test]
    fn unknown_command_naks_test() {
        let (tx, unit) = run(auto_22_5(), &[&frame(b"FY", b""), &frame(b"RZ", b""), &frame(b"Q1", b"")]);
        assert_eq!(tx, [NAK, NAK, NAK]);
        assert_eq!(unit, UnitState::new(auto_22_5()).unwrap());
    }

    #[test]
    fn set_then_query_test() {
        let (tx, unit) = run(
            auto_22_5(),
            &[&frame(b"D1", b"12D3"), &frame(b"F1", b""), &[ACK]],
        );
        assert_eq!(tx[0], ACK);
        assert_eq!(tx[1], ACK);
        assert_eq!(&tx[2..], &frame(b"G1", b"12D3")[..]);
        assert_eq!(unit.settings.target, HalfDegreesC(40));
    }

    #[test]
    fn start_marker_replaces_ack_test() {
        // No ACK between the first response and the next request.
        let (tx, _) = run(
            auto_22_5(),
            &[&frame(b"F1", b""), &frame(b"F8", b""), &[ACK]],
        );
        let mut expected = vec![ACK];
        expected.extend(frame(b"G1", b"13I5"));
        expected.push(ACK);
        expected.extend(frame(b"G8", b"0200"));
        assert_eq!(tx, expected);
    }

    #[test]
    fn unexpected_ack_byte_test() {
        // 0x15 after a response is logged and the transaction closed; the next
        // frame is served normally.
        let (tx, _) = run(
            auto_22_5(),
            &[&frame(b"F8", b""), &[NAK], &frame(b"F8", b""), &[ACK]],
        );
        let mut expected = vec![ACK];
        expected.extend(frame(b"G8", b"0200"));
        expected.push(ACK);
        expected.extend(frame(b"G8", b"0200"));
        assert_eq!(tx, expected);
    }

    #[test]
    fn garbage_is_skipped_test() {
        let (tx, _) = run(
            auto_22_5(),
            &[&[0x00, 0xff, ETX, ACK], &frame(b"M", b""), &[ACK]],
        );
        assert_eq!(tx[0], ACK);
        assert_eq!(&tx[1..], &frame(b"M", b"FFFF")[..]);
    }

    #[test]
    fn too_long_frame_resync_test() {
        let mut runaway = vec![STX];
        runaway.extend(core::iter::repeat(b'0').take(299));
        let (tx, _) = run(auto_22_5(), &[&runaway, &frame(b"F1", b""), &[ACK]]);
        let mut expected = vec![ACK];
        expected.extend(frame(b"G1", b"13I5"));
        assert_eq!(tx, expected);
    }

    #[test]
    fn start_marker_after_full_buffer_test() {
        // 256 bytes without an end marker, the 257th opens the next request
        let mut runaway = vec![STX];
        runaway.extend(core::iter::repeat(b'0').take(MAX_FRAME_LEN - 1));
        let (tx, _) = run(auto_22_5(), &[&runaway, &frame(b"F1", b""), &[ACK]]);
        let mut expected = vec![ACK];
        expected.extend(frame(b"G1", b"13I5"));
        assert_eq!(tx, expected);
    }

    #[test]
    fn handshake_outcome_test() {
        let unit = UnitState::new(auto_22_5()).unwrap();
        let mut device = S21Device::new(Loopback::new(&[&[ACK, STX, 0x42]]), unit);
        assert_eq!(device.await_ack(), Ok(Handshake::Acked));
        assert_eq!(device.await_ack(), Ok(Handshake::NextFrameStarted));
        assert!(device.reader.in_frame());
        device.reader.reset();
        assert_eq!(device.await_ack(), Ok(Handshake::Unexpected(0x42)));
        assert_eq!(device.await_ack(), Err(ChannelError::Read(Closed)));
    }
}
