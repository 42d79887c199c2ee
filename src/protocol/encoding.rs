//! Wire representations of the unit's values.
//!
//! S21 mixes several conventions, sometimes within one payload:
//!
//! * plain ASCII digits offset from `'0'` (power, mode);
//! * single "letter" bytes (fan speed, target temperature);
//! * decimal strings with an explicit sign, spelled backwards (`+245` goes out
//!   as `5 4 2 +`), used by the `R*` sensor queries;
//! * three zero padded digits, also backwards, for the rpm sensors.

use combine::parser::byte::digit;
use combine::{any, eof, satisfy_map, Parser};

use super::types::{Fan, HalfDegreesC, Mode, ModelCode, Settings, TenthDegreesC};
use crate::error::EncodingError;

/// Largest magnitude a three digit wire field can carry.
pub const MAX_DIGITS_VALUE: u16 = 999;

/// `'@'` on the wire is 18.0 C; every step is half a degree.
const TARGET_TEMP_BASE_BYTE: i16 = b'@' as i16;
const TARGET_TEMP_BASE: HalfDegreesC = HalfDegreesC(36);

pub trait Encodable {
    fn encode<'a>(&self, into: &'a mut [u8]) -> Result<&'a [u8], EncodingError>;
}

macro_rules! one_byte_encodable {
    ( $( $ty:ty ),* ) => {
        $(
            impl Encodable for $ty where $ty: OneByteEncodable {
                fn encode<'a>(&self, into: &'a mut [u8]) -> Result<&'a [u8], EncodingError> {
                    if into.len() != 1 { return Err(EncodingError::Malformed); }
                    into[0] = self.encoded_as_byte()?;
                    Ok(into)
                }
            }
        )*
    }
}

pub trait OneByteEncodable: Sized {
    fn encoded_as_byte(&self) -> Result<u8, EncodingError>;
    fn decode_from_byte(byte: u8) -> Option<Self>;
}

one_byte_encodable!(Mode, Fan, HalfDegreesC);

impl OneByteEncodable for Mode {
    fn encoded_as_byte(&self) -> Result<u8, EncodingError> {
        Ok(b'0' + self.repr())
    }

    fn decode_from_byte(byte: u8) -> Option<Self> {
        byte.checked_sub(b'0').and_then(Mode::from_repr)
    }
}

impl OneByteEncodable for Fan {
    fn encoded_as_byte(&self) -> Result<u8, EncodingError> {
        Ok(encode_fan(*self))
    }

    fn decode_from_byte(byte: u8) -> Option<Self> {
        decode_fan(byte)
    }
}

impl OneByteEncodable for HalfDegreesC {
    fn encoded_as_byte(&self) -> Result<u8, EncodingError> {
        encode_target_temp(*self)
    }

    fn decode_from_byte(byte: u8) -> Option<Self> {
        Some(decode_target_temp(byte))
    }
}

pub fn encode_fan(fan: Fan) -> u8 {
    match fan {
        Fan::Auto => b'A',
        Fan::Quiet => b'B',
        Fan::Speed(n) => b'2' + n,
    }
}

pub fn decode_fan(byte: u8) -> Option<Fan> {
    match byte {
        b'A' => Some(Fan::Auto),
        b'B' => Some(Fan::Quiet),
        b'3'..=b'7' => Some(Fan::Speed(byte - b'2')),
        _ => None,
    }
}

pub fn encode_target_temp(temp: HalfDegreesC) -> Result<u8, EncodingError> {
    let offset = i32::from(temp.0) - i32::from(TARGET_TEMP_BASE.0);
    let byte = i32::from(TARGET_TEMP_BASE_BYTE) + offset;
    u8::try_from(byte).map_err(|_| EncodingError::OutOfRange { value: temp.0.into() })
}

pub fn decode_target_temp(byte: u8) -> HalfDegreesC {
    HalfDegreesC(TARGET_TEMP_BASE.0 + (i16::from(byte) - TARGET_TEMP_BASE_BYTE))
}

pub fn encode_power(on: bool) -> u8 {
    if on { b'1' } else { b'0' }
}

pub fn decode_power(byte: u8) -> Option<bool> {
    match byte {
        b'0' => Some(false),
        b'1' => Some(true),
        _ => None,
    }
}

fn ascii_digits(value: u16) -> [u8; 3] {
    [
        b'0' + (value / 100 % 10) as u8,
        b'0' + (value / 10 % 10) as u8,
        b'0' + (value % 10) as u8,
    ]
}

fn digits_value(hundreds: u8, tens: u8, ones: u8) -> u16 {
    100 * u16::from(hundreds - b'0') + 10 * u16::from(tens - b'0') + u16::from(ones - b'0')
}

/// Sign plus three digits, written backwards: `245` becomes `b"542+"`.
pub fn encode_reversed_decimal(value: i16) -> Result<[u8; 4], EncodingError> {
    let magnitude = value.unsigned_abs();
    if magnitude > MAX_DIGITS_VALUE {
        return Err(EncodingError::OutOfRange { value: value.into() });
    }
    let sign = if value < 0 { b'-' } else { b'+' };
    let [hundreds, tens, ones] = ascii_digits(magnitude);
    Ok([ones, tens, hundreds, sign])
}

pub fn decode_reversed_decimal(bytes: &[u8]) -> Result<i16, EncodingError> {
    let [ones, tens, hundreds, sign] =
        <[u8; 4]>::try_from(bytes).map_err(|_| EncodingError::Malformed)?;
    let ordered = [sign, hundreds, tens, ones];

    let value = (
        satisfy_map(|b: u8| match b {
            b'+' => Some(1i16),
            b'-' => Some(-1i16),
            _ => None,
        }),
        digit(),
        digit(),
        digit(),
        eof(),
    )
        .map(|(sign, h, t, o, ())| sign * digits_value(h, t, o) as i16)
        .parse(&ordered[..])
        .map(|(value, _)| value)
        .map_err(|_| EncodingError::Malformed);
    value
}

/// Three zero padded digits, written backwards: `52` becomes `b"250"`.
pub fn encode_reversed_digits(value: u16) -> Result<[u8; 3], EncodingError> {
    if value > MAX_DIGITS_VALUE {
        return Err(EncodingError::OutOfRange { value: value.into() });
    }
    let [hundreds, tens, ones] = ascii_digits(value);
    Ok([ones, tens, hundreds])
}

pub fn decode_reversed_digits(bytes: &[u8]) -> Result<u16, EncodingError> {
    let [ones, tens, hundreds] =
        <[u8; 3]>::try_from(bytes).map_err(|_| EncodingError::Malformed)?;
    let ordered = [hundreds, tens, ones];

    let value = (digit(), digit(), digit(), eof())
        .map(|(h, t, o, ())| digits_value(h, t, o))
        .parse(&ordered[..])
        .map(|(value, _)| value)
        .map_err(|_| EncodingError::Malformed);
    value
}

/// Decodes the `D1` payload: power digit, mode digit, target temperature,
/// fan speed. Trailing bytes are ignored.
pub fn decode_settings(payload: &[u8]) -> Result<Settings, EncodingError> {
    (
        satisfy_map(decode_power),
        satisfy_map(Mode::decode_from_byte),
        any().map(decode_target_temp),
        satisfy_map(decode_fan),
    )
        .map(|(power, mode, target, fan)| Settings { power, mode, target, fan })
        .parse(payload)
        .map(|(settings, _)| settings)
        .map_err(|_| EncodingError::Malformed)
}

impl Encodable for Settings {
    fn encode<'a>(&self, into: &'a mut [u8]) -> Result<&'a [u8], EncodingError> {
        if into.len() != 4 {
            return Err(EncodingError::Malformed);
        }
        into[0] = encode_power(self.power);
        self.mode.encode(&mut into[1..2])?;
        self.target.encode(&mut into[2..3])?;
        self.fan.encode(&mut into[3..4])?;
        Ok(into)
    }
}

impl Encodable for TenthDegreesC {
    fn encode<'a>(&self, into: &'a mut [u8]) -> Result<&'a [u8], EncodingError> {
        if into.len() != 4 {
            return Err(EncodingError::Malformed);
        }
        into.copy_from_slice(&encode_reversed_decimal(self.0)?);
        Ok(into)
    }
}

// Reported backwards like everything else.
impl Encodable for ModelCode {
    fn encode<'a>(&self, into: &'a mut [u8]) -> Result<&'a [u8], EncodingError> {
        if into.len() != 4 {
            return Err(EncodingError::Malformed);
        }
        for (dst, src) in into.iter_mut().zip(self.as_bytes().iter().rev()) {
            *dst = *src;
        }
        Ok(into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reversed_decimal_test() {
        assert_eq!(encode_reversed_decimal(245), Ok(*b"542+"));
        assert_eq!(encode_reversed_decimal(-5), Ok(*b"500-"));
        assert_eq!(encode_reversed_decimal(0), Ok(*b"000+"));
        assert_eq!(
            encode_reversed_decimal(1000),
            Err(EncodingError::OutOfRange { value: 1000 })
        );
        assert_eq!(decode_reversed_decimal(b"052+"), Ok(250));
        assert_eq!(decode_reversed_decimal(b"500-"), Ok(-5));
        assert_eq!(decode_reversed_decimal(b"052"), Err(EncodingError::Malformed));
        assert_eq!(decode_reversed_decimal(b"05X+"), Err(EncodingError::Malformed));
        assert_eq!(decode_reversed_decimal(b"0520"), Err(EncodingError::Malformed));
    }

    #[test]
    fn reversed_decimal_round_trip_test() {
        for value in -999..=999 {
            let encoded = encode_reversed_decimal(value).unwrap();
            assert_eq!(decode_reversed_decimal(&encoded), Ok(value));
        }
    }

    #[test]
    fn reversed_digits_test() {
        assert_eq!(encode_reversed_digits(52), Ok(*b"250"));
        assert_eq!(encode_reversed_digits(42), Ok(*b"240"));
        assert_eq!(decode_reversed_digits(b"240"), Ok(42));
        assert_eq!(decode_reversed_digits(b"999"), Ok(999));
        assert!(encode_reversed_digits(1000).is_err());
        for value in [0, 7, 99, 520, 999] {
            assert_eq!(decode_reversed_digits(&encode_reversed_digits(value).unwrap()), Ok(value));
        }
    }

    #[test]
    fn target_temp_test() {
        assert_eq!(encode_target_temp(HalfDegreesC(36)), Ok(b'@'));
        assert_eq!(encode_target_temp(HalfDegreesC(45)), Ok(b'I'));
        assert_eq!(encode_target_temp(HalfDegreesC(40)), Ok(b'D'));
        assert_eq!(decode_target_temp(b'@'), HalfDegreesC(36));
        assert_eq!(decode_target_temp(0x00), HalfDegreesC(-28));
        assert_eq!(decode_target_temp(0xff), HalfDegreesC(227));
        assert!(encode_target_temp(HalfDegreesC(-29)).is_err());
        assert!(encode_target_temp(HalfDegreesC(228)).is_err());
        assert_eq!(
            encode_target_temp(HalfDegreesC(i16::MAX)),
            Err(EncodingError::OutOfRange { value: i16::MAX.into() })
        );
        assert_eq!(
            encode_target_temp(HalfDegreesC(i16::MIN)),
            Err(EncodingError::OutOfRange { value: i16::MIN.into() })
        );
    }

    #[test]
    fn target_temp_round_trip_test() {
        for byte in 0..=u8::MAX {
            let temp = decode_target_temp(byte);
            assert_eq!(encode_target_temp(temp), Ok(byte));
            assert_eq!(decode_target_temp(encode_target_temp(temp).unwrap()), temp);
        }
    }

    #[test]
    fn fan_test() {
        assert_eq!(encode_fan(Fan::Auto), b'A');
        assert_eq!(encode_fan(Fan::Quiet), b'B');
        assert_eq!(encode_fan(Fan::Speed(1)), b'3');
        assert_eq!(encode_fan(Fan::Speed(5)), b'7');
        assert_eq!(decode_fan(b'5'), Some(Fan::Speed(3)));
        assert_eq!(decode_fan(b'2'), None);
        assert_eq!(decode_fan(b'8'), None);
    }

    #[test]
    fn settings_test() {
        let settings = Settings {
            power: true,
            mode: Mode::Auto,
            target: HalfDegreesC(45),
            fan: Fan::Speed(3),
        };
        let mut buf = [0u8; 4];
        assert_eq!(settings.encode(&mut buf), Ok(&b"13I5"[..]));
        assert_eq!(decode_settings(b"13I5"), Ok(settings));
        assert_eq!(decode_settings(b"12D3").map(|s| s.mode), Ok(Mode::Cool));
        assert_eq!(decode_settings(b"15D3"), Err(EncodingError::Malformed));
        assert_eq!(decode_settings(b"12D"), Err(EncodingError::Malformed));
        assert!(settings.encode(&mut buf[..3]).is_err());
    }

    #[test]
    fn model_code_test() {
        let model: ModelCode = "135D".parse().unwrap();
        let mut buf = [0u8; 4];
        assert_eq!(model.encode(&mut buf), Ok(&b"D531"[..]));
    }
}
