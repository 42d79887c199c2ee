//! What the unit says back to each command.
//!
//! Command families are told apart by the first identifier byte:
//!
//! | family | meaning                     | reply                       |
//! |--------|-----------------------------|-----------------------------|
//! | `D`    | set a value                 | ACK only                    |
//! | `F`    | query control settings      | ACK, then a `G` frame       |
//! | `R`    | query a sensor              | ACK, then an `S` frame      |
//! | `M`    | identity probe, no sub byte | ACK, then `MFFFF`           |
//!
//! Unknown `F` and `R` sub-commands, and unknown families, get a NAK. Unknown
//! `D` sub-commands are still ACKed.

use heapless::Vec;
use log::{debug, error, info, warn};

use crate::error::EncodingError;
use crate::protocol::encoding::{decode_settings, encode_reversed_digits, Encodable};
use crate::protocol::types::TenthDegreesC;
use crate::protocol::{CommandId, Frame, HexDump};
use crate::unit::UnitState;

pub const PAYLOAD_LEN: usize = 4;

type Payload = Vec<u8, PAYLOAD_LEN>;

/// Query replies nobody has decoded yet. Controllers insist on them (a NAK
/// makes them retry forever, and different bytes make some of them fault with
/// error 252), so they go out exactly as a real unit sends them.
const FIXED_REPLIES: [(u8, [u8; PAYLOAD_LEN]); 13] = [
    // Feature set, as reported by CTXM35RVMA / CTXM60RVMA
    (b'2', [0x3d, 0x3b, 0x00, 0x80]),
    (b'4', [0x30, 0x00, 0x80, 0x30]),
    // The rest as reported by an FTXF20D
    (b'B', *b"0360"),
    (b'G', *b"0400"),
    (b'K', *b"qs51"),
    (b'M', *b"3B00"),
    (b'N', *b"0000"),
    (b'P', *b"7300"),
    (b'Q', *b"E300"),
    (b'R', *b"0000"),
    (b'S', *b"0000"),
    (b'T', *b"1000"),
    (b'V', [0x33, 0x37, 0x83, 0x30]),
];

/// Placeholder readings for sensor queries whose meaning is unknown. Distinct
/// values so they can be recognized if they turn up on a controller.
const UNKNOWN_SENSOR_RN: TenthDegreesC = TenthDegreesC(235);
const UNKNOWN_SENSOR_RX: TenthDegreesC = TenthDegreesC(215);

const IDENTITY_COMMAND: &[u8] = b"M";
const IDENTITY_PAYLOAD: &[u8] = b"FFFF";

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Command {
    Set(Option<u8>),
    Query(u8),
    Sensor(u8),
    Identify,
    Unknown,
}

impl From<CommandId> for Command {
    fn from(id: CommandId) -> Self {
        match (id.family, id.sub) {
            (b'D', sub) => Command::Set(sub),
            (b'F', Some(sub)) => Command::Query(sub),
            (b'R', Some(sub)) => Command::Sensor(sub),
            (b'M', _) => Command::Identify,
            _ => Command::Unknown,
        }
    }
}

/// How the unit answers a validated frame.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Reply {
    /// A bare ACK.
    Ack,
    /// A bare NAK. The peer is expected to retry or give up.
    Nak,
    /// An ACK for the request followed by this frame, which the peer must
    /// acknowledge in turn.
    Response(Frame),
}

pub fn dispatch(frame: &Frame, unit: &mut UnitState) -> Reply {
    let id = match frame.command() {
        Some(id) => id,
        None => return Reply::Nak,
    };
    debug!("Got command: {}", id);

    let payload = match Command::from(id) {
        Command::Set(sub) => {
            set(sub, frame, unit);
            return Reply::Ack;
        }
        Command::Query(sub) => query(sub, unit),
        Command::Sensor(sub) => sensor(sub, unit),
        Command::Identify => {
            debug!(" -> unknown ('MM')");
            return build(IDENTITY_COMMAND, IDENTITY_PAYLOAD);
        }
        Command::Unknown => None,
    };

    match payload {
        Some(Ok(payload)) => {
            let sub = id.sub.unwrap_or_default();
            build(&[id.family + 1, sub], &payload)
        }
        Some(Err(e)) => {
            error!("Cannot encode reply to {}: {}", id, e);
            Reply::Nak
        }
        None => {
            info!(" -> Unknown command {}, sending NAK", id);
            Reply::Nak
        }
    }
}

fn build(command: &[u8], payload: &[u8]) -> Reply {
    match Frame::build(command, payload) {
        Ok(frame) => Reply::Response(frame),
        Err(e) => {
            error!("Cannot build reply frame: {}", e);
            Reply::Nak
        }
    }
}

fn set(sub: Option<u8>, frame: &Frame, unit: &mut UnitState) {
    let payload = frame.payload();
    match sub {
        Some(b'1') => match decode_settings(payload) {
            Ok(settings) => {
                unit.settings = settings;
                info!(
                    " Set power {} mode {} temp {} fan {}",
                    settings.power as u8,
                    settings.mode.repr(),
                    settings.target,
                    settings.fan.repr()
                );
            }
            Err(_) => warn!(" Set malformed:{}", HexDump(frame.as_bytes())),
        },
        // Second byte is '?' for on and '0' for off, the last two are always '0'.
        Some(b'5') => match payload.split_first() {
            Some((&digit, spare)) if digit.is_ascii_digit() => {
                unit.swing = digit - b'0';
                info!(" Set swing {} spare bytes{}", unit.swing, HexDump(spare));
            }
            _ => warn!(" Set malformed:{}", HexDump(frame.as_bytes())),
        },
        // '2' or '0'. Eco comes through as "D6 0000" whether it is being
        // switched on or off, so it can't be told apart from powerful off.
        Some(b'6') => match payload.split_first() {
            Some((&flag, spare)) => {
                unit.powerful = flag == b'2';
                info!(" Set powerful {} spare bytes{}", unit.powerful as u8, HexDump(spare));
            }
            None => warn!(" Set malformed:{}", HexDump(frame.as_bytes())),
        },
        _ => info!(" Set unknown:{}", HexDump(frame.as_bytes())),
    }
}

fn fixed(bytes: &[u8]) -> Result<Payload, EncodingError> {
    Vec::from_slice(bytes).map_err(|_| EncodingError::Malformed)
}

fn encoded<E: Encodable>(value: &E) -> Result<Payload, EncodingError> {
    let mut buf = [0u8; PAYLOAD_LEN];
    value.encode(&mut buf)?;
    fixed(&buf)
}

fn query(sub: u8, unit: &UnitState) -> Option<Result<Payload, EncodingError>> {
    let powerful = if unit.powerful { 2 } else { 0 };
    let payload = match sub {
        b'1' => {
            let s = &unit.settings;
            debug!(" -> power {} mode {} temp {}", s.power as u8, s.mode.repr(), s.target);
            encoded(s)
        }
        b'3' => {
            debug!(" -> powerful ('F3') {}", unit.powerful as u8);
            fixed(&[0x30, 0xfe, 0xfe, powerful])
        }
        b'5' => {
            debug!(" -> swing {}", unit.swing);
            fixed(&[unit.swing, 0, 0, 0])
        }
        b'6' => {
            debug!(" -> powerful ('F6') {}", unit.powerful as u8);
            fixed(&[powerful, 0, 0, 0])
        }
        b'7' => {
            debug!(" -> eco {}", unit.eco as u8);
            fixed(&[0, if unit.eco { b'2' } else { b'0' }, 0, 0])
        }
        // Reads backwards as "0020" for version 2
        b'8' => {
            debug!(" -> Protocol version = {}", unit.protocol());
            fixed(&[b'0', b'0' + unit.protocol(), b'0', b'0'])
        }
        b'9' => {
            let sensors = &unit.sensors;
            let home = sensors.home.encode_as_half_deg_plus_offset();
            let outside = sensors.outside.encode_as_half_deg_plus_offset();
            debug!(
                " -> home = 0x{:02X} ({}) outside = 0x{:02X} ({})",
                home, sensors.home, outside, sensors.outside
            );
            fixed(&[home, outside, 0xff, 0x30])
        }
        b'C' => {
            debug!(" -> model = {}", unit.model());
            encoded(unit.model())
        }
        _ => {
            let (_, bytes) = FIXED_REPLIES.iter().find(|(id, _)| *id == sub)?;
            debug!(" -> unknown ('F{}') ={}", sub as char, HexDump(bytes));
            fixed(bytes)
        }
    };
    Some(payload)
}

fn temperature(value: TenthDegreesC, name: &str) -> Result<Payload, EncodingError> {
    debug!(" -> {} = {:+}", name, value.0);
    encoded(&value)
}

fn rpm(value: u16, name: &str) -> Result<Payload, EncodingError> {
    debug!(" -> {} = {:03}", name, value);
    fixed(&encode_reversed_digits(value)?)
}

fn sensor(sub: u8, unit: &UnitState) -> Option<Result<Payload, EncodingError>> {
    let sensors = &unit.sensors;
    let payload = match sub {
        b'H' => temperature(sensors.home, "home"),
        b'I' => temperature(sensors.inlet, "inlet"),
        b'a' => temperature(sensors.outside, "outside"),
        b'L' => rpm(sensors.fan_rpm, "fanrpm"),
        b'd' => rpm(sensors.compressor_rpm, "compressor rpm"),
        b'N' => temperature(UNKNOWN_SENSOR_RN, "unknown ('RN')"),
        b'X' => temperature(UNKNOWN_SENSOR_RX, "unknown ('RX')"),
        _ => return None,
    };
    Some(payload)
}
