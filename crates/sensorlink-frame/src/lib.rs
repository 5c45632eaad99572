//! Newline-delimited JSON framing for the sensorlink wire protocol.
//!
//! Every message on the wire is one line:
//! - a single JSON object with string keys
//! - UTF-8 encoded
//! - terminated by `\n`
//!
//! Outbound objects carry a `command` field, inbound ones a `type` field.
//! This crate is pure: it never touches a transport.

pub mod codec;
pub mod command;
pub mod error;
pub mod message;

pub use codec::{decode, encode, Frame, TYPE_FIELD};
pub use command::{
    Command, LedState, MotorDirection, ParamError, COMMAND_FIELD, GET_SENSOR_DATA, GET_STATUS,
    SET_LED, SET_MOTOR, STOP_MOTOR,
};
pub use error::{DecodeError, Result};
pub use message::{
    is_sensor_error, SensorReading, StatusReport, TelemetryEvent, SENSOR_DATA, SENSOR_ERROR,
    STATUS,
};
