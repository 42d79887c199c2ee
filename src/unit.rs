//! The simulated air conditioner.

use crate::error::ConfigError;
use crate::protocol::encoding::{encode_target_temp, MAX_DIGITS_VALUE};
use crate::protocol::types::{Fan, HalfDegreesC, Mode, ModelCode, Settings, TenthDegreesC};

/// Sensor readings. They never change; whatever was configured is reported.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Sensors {
    pub home: TenthDegreesC,
    pub outside: TenthDegreesC,
    pub inlet: TenthDegreesC,
    /// Divided by 10.
    pub fan_rpm: u16,
    pub compressor_rpm: u16,
}

/// Everything needed to bring up a simulated unit.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct UnitConfig {
    pub settings: Settings,
    pub swing: u8,
    pub powerful: bool,
    pub eco: bool,
    pub sensors: Sensors,
    pub protocol: u8,
    pub model: ModelCode,
}

// Distinct values, so a controller showing the wrong field is easy to spot.
// The model code is the one reported by an FTXF20D5V1B.
impl Default for UnitConfig {
    fn default() -> Self {
        Self {
            settings: Settings {
                power: false,
                mode: Mode::Auto,
                target: HalfDegreesC(45),
                fan: Fan::Speed(3),
            },
            swing: 0,
            powerful: false,
            eco: false,
            sensors: Sensors {
                home: TenthDegreesC(245),
                outside: TenthDegreesC(205),
                inlet: TenthDegreesC(185),
                fan_rpm: 52,
                compressor_rpm: 42,
            },
            protocol: 2,
            model: ModelCode::DEFAULT,
        }
    }
}

/// Live state of the unit, owned by the device serving one channel.
///
/// Settings change only through `D*` commands. Protocol version and model code
/// are fixed for the lifetime of the unit: a real controller reads the model
/// once after it boots and never asks again.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct UnitState {
    pub settings: Settings,
    pub swing: u8,
    pub powerful: bool,
    pub eco: bool,
    pub sensors: Sensors,
    protocol: u8,
    model: ModelCode,
}

impl UnitState {
    pub fn new(config: UnitConfig) -> Result<Self, ConfigError> {
        encode_target_temp(config.settings.target)
            .map_err(|_| ConfigError::TargetOutOfRange(config.settings.target))?;

        let sensors = &config.sensors;
        for (name, value) in [
            ("home", sensors.home),
            ("outside", sensors.outside),
            ("inlet", sensors.inlet),
        ] {
            if value.0.unsigned_abs() > MAX_DIGITS_VALUE {
                return Err(ConfigError::Sensor { name, value: value.0.into() });
            }
        }
        for (name, value) in [("fan rpm", sensors.fan_rpm), ("compressor rpm", sensors.compressor_rpm)] {
            if value > MAX_DIGITS_VALUE {
                return Err(ConfigError::Sensor { name, value: value.into() });
            }
        }

        if config.protocol > 9 {
            return Err(ConfigError::Protocol(config.protocol));
        }

        Ok(Self {
            settings: config.settings,
            swing: config.swing,
            powerful: config.powerful,
            eco: config.eco,
            sensors: config.sensors,
            protocol: config.protocol,
            model: config.model,
        })
    }

    pub fn protocol(&self) -> u8 {
        self.protocol
    }

    pub fn model(&self) -> &ModelCode {
        &self.model
    }
}
