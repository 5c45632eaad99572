use std::fmt;

use sensorlink_frame::{Frame, SensorReading, StatusReport, SENSOR_DATA, STATUS};
use serde::Serialize;
use serde_json::Value;

/// The frame read back as the result of a command.
///
/// The firmware answers actuator commands with `{"response": ...}`, queries
/// with a `sensor_data` or `status` frame, and rejected input with
/// `{"error": ...}`. All of these are successful replies at this layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Reply {
    frame: Frame,
}

impl Reply {
    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    pub fn into_frame(self) -> Frame {
        self.frame
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.frame.get(key)
    }

    /// Acknowledgement text, e.g. `"LED state changed"`.
    pub fn response(&self) -> Option<&str> {
        self.get("response").and_then(Value::as_str)
    }

    /// Error text reported by the device, e.g. `"Unknown command"`.
    pub fn device_error(&self) -> Option<&str> {
        self.get("error").and_then(Value::as_str)
    }

    /// The reading carried by a `sensor_data` reply.
    pub fn sensor_reading(&self) -> Option<SensorReading> {
        if self.frame.frame_type() != Some(SENSOR_DATA) {
            return None;
        }
        SensorReading::from_frame(&self.frame).ok()
    }

    /// The report carried by a `status` reply.
    pub fn status_report(&self) -> Option<StatusReport> {
        if self.frame.frame_type() != Some(STATUS) {
            return None;
        }
        StatusReport::from_frame(&self.frame).ok()
    }
}

impl From<Frame> for Reply {
    fn from(frame: Frame) -> Self {
        Self { frame }
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.frame, f)
    }
}
