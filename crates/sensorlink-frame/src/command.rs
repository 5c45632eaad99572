//! Outbound commands understood by the device firmware.

use std::fmt;
use std::str::FromStr;

use serde_json::{Map, Value};

/// Request a fresh `sensor_data` frame.
pub const GET_SENSOR_DATA: &str = "get_sensor_data";
/// Switch the status LED; field `state` (0 or 1).
pub const SET_LED: &str = "set_led";
/// Drive the DC motor; fields `speed` (0-255) and `direction` (-1, 0, 1).
pub const SET_MOTOR: &str = "set_motor";
/// Stop the DC motor.
pub const STOP_MOTOR: &str = "stop_motor";
/// Request a `status` frame.
pub const GET_STATUS: &str = "get_status";

/// Field carrying the command name on every outbound frame.
pub const COMMAND_FIELD: &str = "command";

/// A command and its parameters.
///
/// Built once and then only read. A parameter named `command` is ignored on
/// encode; the command name always wins.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    name: String,
    params: Map<String, Value>,
}

impl Command {
    /// A command with no parameters.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Map::new(),
        }
    }

    /// A command with a prepared parameter map.
    pub fn with_params(name: impl Into<String>, params: Map<String, Value>) -> Self {
        Self {
            name: name.into(),
            params,
        }
    }

    /// Add one parameter.
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &Map<String, Value> {
        &self.params
    }

    /// The full field mapping as it goes on the wire.
    pub fn to_fields(&self) -> Map<String, Value> {
        let mut fields = self.params.clone();
        fields.insert(COMMAND_FIELD.to_string(), Value::from(self.name.as_str()));
        fields
    }

    pub fn get_sensor_data() -> Self {
        Self::new(GET_SENSOR_DATA)
    }

    pub fn set_led(state: LedState) -> Self {
        Self::new(SET_LED).with_param("state", state.as_u8())
    }

    pub fn set_motor(speed: u8, direction: MotorDirection) -> Self {
        Self::new(SET_MOTOR)
            .with_param("speed", speed)
            .with_param("direction", direction.as_i8())
    }

    pub fn stop_motor() -> Self {
        Self::new(STOP_MOTOR)
    }

    pub fn get_status() -> Self {
        Self::new(GET_STATUS)
    }
}

/// A parameter given as text could not be interpreted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {what}: {input:?}")]
pub struct ParamError {
    what: &'static str,
    input: String,
}

/// LED state as sent in `set_led`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedState {
    Off,
    On,
}

impl LedState {
    pub fn as_u8(self) -> u8 {
        match self {
            Self::Off => 0,
            Self::On => 1,
        }
    }
}

impl From<bool> for LedState {
    fn from(on: bool) -> Self {
        if on {
            Self::On
        } else {
            Self::Off
        }
    }
}

impl FromStr for LedState {
    type Err = ParamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "on" | "1" | "true" => Ok(Self::On),
            "off" | "0" | "false" => Ok(Self::Off),
            _ => Err(ParamError {
                what: "led state",
                input: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for LedState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Off => "off",
            Self::On => "on",
        })
    }
}

/// Motor rotation as sent in `set_motor`.
///
/// `Stop` makes the firmware stop the motor regardless of speed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotorDirection {
    Reverse,
    Stop,
    Forward,
}

impl MotorDirection {
    pub fn as_i8(self) -> i8 {
        match self {
            Self::Reverse => -1,
            Self::Stop => 0,
            Self::Forward => 1,
        }
    }
}

impl FromStr for MotorDirection {
    type Err = ParamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "forward" | "fwd" | "1" | "+1" => Ok(Self::Forward),
            "reverse" | "rev" | "-1" => Ok(Self::Reverse),
            "stop" | "0" => Ok(Self::Stop),
            _ => Err(ParamError {
                what: "motor direction",
                input: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for MotorDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Reverse => "reverse",
            Self::Stop => "stop",
            Self::Forward => "forward",
        })
    }
}
