use core::fmt;
use core::str::FromStr;

use crate::error::ConfigError;

#[repr(u8)]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Mode {
    Fan  = 0,
    Heat = 1,
    Cool = 2,
    Auto = 3,
    Dry  = 7,
}

impl Mode {
    pub fn repr(self) -> u8 {
        self as u8
    }

    pub fn from_repr(value: u8) -> Option<Self> {
        match value {
            0 => Some(Mode::Fan),
            1 => Some(Mode::Heat),
            2 => Some(Mode::Cool),
            3 => Some(Mode::Auto),
            7 => Some(Mode::Dry),
            _ => None,
        }
    }
}

impl FromStr for Mode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: u8 = s.trim().parse().map_err(|_| ConfigError::Number)?;
        Mode::from_repr(value).ok_or(ConfigError::Mode(value))
    }
}

/// Fan speed. `Auto` and `Quiet` are letters on the wire, the five fixed
/// speeds are digits.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Fan {
    Auto,
    Speed(u8),
    Quiet,
}

impl Fan {
    pub const MAX_SPEED: u8 = 5;

    pub fn repr(self) -> u8 {
        match self {
            Fan::Auto => 0,
            Fan::Speed(n) => n,
            Fan::Quiet => 6,
        }
    }

    pub fn from_repr(value: u8) -> Option<Self> {
        match value {
            0 => Some(Fan::Auto),
            1..=Fan::MAX_SPEED => Some(Fan::Speed(value)),
            6 => Some(Fan::Quiet),
            _ => None,
        }
    }
}

impl FromStr for Fan {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: u8 = s.trim().parse().map_err(|_| ConfigError::Number)?;
        Fan::from_repr(value).ok_or(ConfigError::Fan(value))
    }
}

/// Target temperature, counted in half degrees C.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub struct HalfDegreesC(pub i16);

impl fmt::Display for HalfDegreesC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let halves = self.0.unsigned_abs();
        write!(f, "{}{}.{}", sign, halves / 2, (halves % 2) * 5)
    }
}

// Accepts "22.5", "20", "-0.5", "18.50". Anything off the half-degree grid is
// rejected rather than rounded.
impl FromStr for HalfDegreesC {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (whole, fraction) = s.split_once('.').unwrap_or((s, ""));
        let negative = whole.starts_with('-');
        let whole: i32 = whole.parse().map_err(|_| ConfigError::Temperature)?;
        let half = match fraction.trim_end_matches('0') {
            "" => 0,
            "5" => 1,
            _ => return Err(ConfigError::Temperature),
        };
        let halves = whole.abs() * 2 + half;
        let halves = if negative { -halves } else { halves };
        i16::try_from(halves)
            .map(HalfDegreesC)
            .map_err(|_| ConfigError::Temperature)
    }
}

/// Sensor temperature, counted in tenths of a degree C.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub struct TenthDegreesC(pub i16);

impl TenthDegreesC {
    pub fn encode_as_half_deg_plus_offset(&self) -> u8 {
        (self.0 / 5 + 128) as u8
    }
}

impl fmt::Display for TenthDegreesC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let tenths = self.0.unsigned_abs();
        write!(f, "{}{}.{}", sign, tenths / 10, tenths % 10)
    }
}

/// Operating parameters carried together by `D1` and `F1`.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Settings {
    pub power: bool,
    pub mode: Mode,
    pub target: HalfDegreesC,
    pub fan: Fan,
}

/// The four character model code reported by `FC`.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ModelCode([u8; 4]);

impl ModelCode {
    pub const DEFAULT: ModelCode = ModelCode(*b"135D");

    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }

    pub fn as_str(&self) -> &str {
        // Only ASCII gets past from_str.
        core::str::from_utf8(&self.0).unwrap_or("????")
    }
}

impl FromStr for ModelCode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes: [u8; 4] = s.as_bytes().try_into().map_err(|_| ConfigError::ModelCode)?;
        if bytes.iter().all(|b| b.is_ascii_graphic()) {
            Ok(ModelCode(bytes))
        } else {
            Err(ConfigError::ModelCode)
        }
    }
}

impl fmt::Display for ModelCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
