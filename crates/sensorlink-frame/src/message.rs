//! Inbound message payloads.
//!
//! # Sensor failure sentinel
//!
//! The firmware reports a failed DHT22 read by sending `-999` in place of the
//! temperature or humidity value. The sentinel is kept verbatim in the decoded
//! numeric field so values round-trip unchanged; use [`is_sensor_error`] or the
//! `*_failed` accessors to test for it.

use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

use crate::codec::{Frame, TYPE_FIELD};

/// `type` of periodic and on-demand sensor frames.
pub const SENSOR_DATA: &str = "sensor_data";
/// `type` of status frames.
pub const STATUS: &str = "status";

/// Value the firmware substitutes for a failed sensor read.
pub const SENSOR_ERROR: f64 = -999.0;

/// Whether `value` is the sensor failure sentinel.
pub fn is_sensor_error(value: f64) -> bool {
    value == SENSOR_ERROR
}

/// Payload of a `sensor_data` frame.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SensorReading {
    /// Degrees Celsius, or [`SENSOR_ERROR`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Relative humidity in percent, or [`SENSOR_ERROR`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub humidity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub light_level: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub motor_speed: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub motor_running: Option<bool>,
    /// Device `millis()` at the time of the read.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<u64>,
}

impl SensorReading {
    /// Parse the payload of a frame. Fails when a field has the wrong JSON type.
    pub fn from_frame(frame: &Frame) -> serde_json::Result<Self> {
        serde_json::from_value(Value::Object(frame.fields().clone()))
    }

    pub fn temperature_failed(&self) -> bool {
        self.temperature.is_some_and(is_sensor_error)
    }

    pub fn humidity_failed(&self) -> bool {
        self.humidity.is_some_and(is_sensor_error)
    }
}

/// Payload of a `status` frame.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StatusReport {
    /// Milliseconds since device boot.
    #[serde(rename = "uptime", skip_serializing_if = "Option::is_none")]
    pub uptime_ms: Option<u64>,
    /// Free heap in bytes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub free_memory: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arduino_ready: Option<bool>,
    /// False once the last sensor read produced the sentinel.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dht22_connected: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub motor_speed: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub motor_running: Option<bool>,
}

impl StatusReport {
    pub fn from_frame(frame: &Frame) -> serde_json::Result<Self> {
        serde_json::from_value(Value::Object(frame.fields().clone()))
    }
}

/// An inbound frame that was not consumed as a command reply.
#[derive(Debug, Clone, PartialEq)]
pub enum TelemetryEvent {
    Sensor(SensorReading),
    Status(StatusReport),
    /// Unknown or missing `type`, or a typed frame whose fields did not parse.
    /// Carried through unchanged.
    Other(Frame),
}

impl TelemetryEvent {
    /// Classify a frame by its `type` field.
    pub fn from_frame(frame: Frame) -> Self {
        let parsed = match frame.frame_type() {
            Some(SENSOR_DATA) => SensorReading::from_frame(&frame).map(Self::Sensor).ok(),
            Some(STATUS) => StatusReport::from_frame(&frame).map(Self::Status).ok(),
            _ => None,
        };
        parsed.unwrap_or_else(|| Self::Other(frame))
    }

    /// The `type` this event was classified under, if any.
    pub fn kind(&self) -> Option<&str> {
        match self {
            Self::Sensor(_) => Some(SENSOR_DATA),
            Self::Status(_) => Some(STATUS),
            Self::Other(frame) => frame.frame_type(),
        }
    }
}

impl From<Frame> for TelemetryEvent {
    fn from(frame: Frame) -> Self {
        Self::from_frame(frame)
    }
}

impl Serialize for TelemetryEvent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let value = match self {
            Self::Sensor(reading) => tagged(SENSOR_DATA, reading),
            Self::Status(report) => tagged(STATUS, report),
            Self::Other(frame) => return frame.serialize(serializer),
        };
        value
            .map_err(<S::Error as serde::ser::Error>::custom)?
            .serialize(serializer)
    }
}

fn tagged<T: Serialize>(kind: &str, payload: &T) -> serde_json::Result<Value> {
    let mut value = serde_json::to_value(payload)?;
    if let Value::Object(fields) = &mut value {
        fields.insert(TYPE_FIELD.to_string(), Value::from(kind));
    }
    Ok(value)
}
