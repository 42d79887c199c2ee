use thiserror::Error;

/// Problems found while reassembling or building a frame. None of these are
/// fatal; the reader simply resynchronizes on the next start marker.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Error)]
pub enum FrameError {
    #[error("garbage byte received: 0x{0:02X}")]
    Garbage(u8),

    #[error("frame exceeded {max} bytes without an end marker")]
    TooLong { max: usize },

    #[error("frame body does not fit in {max} bytes")]
    Overflow { max: usize },
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Error)]
pub enum EncodingError {
    #[error("value {value} cannot be represented on the wire")]
    OutOfRange { value: i32 },

    #[error("malformed wire value")]
    Malformed,
}

/// Rejected simulator configuration.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Error)]
pub enum ConfigError {
    #[error("invalid model code, exactly 4 ASCII characters required")]
    ModelCode,

    #[error("invalid temperature, expected degrees C on a 0.5 grid")]
    Temperature,

    #[error("target temperature {0} is outside the encodable range")]
    TargetOutOfRange(crate::protocol::types::HalfDegreesC),

    #[error("sensor {name} value {value} is outside the reportable range")]
    Sensor { name: &'static str, value: i32 },

    #[error("protocol version {0} must be a single digit")]
    Protocol(u8),

    #[error("unknown mode {0}, expected 0, 1, 2, 3 or 7")]
    Mode(u8),

    #[error("unknown fan speed {0}, expected 0 to 6")]
    Fan(u8),

    #[error("expected a small decimal number")]
    Number,
}

/// A failure of the underlying byte channel. The simulator cannot continue
/// without it.
#[derive(Debug, Eq, PartialEq, Error)]
pub enum ChannelError<R, W> {
    #[error("error reading from serial port: {0:?}")]
    Read(R),

    #[error("error writing to serial port: {0:?}")]
    Write(W),
}
