use std::fmt;

use bytes::Bytes;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::command::Command;
use crate::error::{DecodeError, Result};

/// Field naming the kind of an inbound frame.
pub const TYPE_FIELD: &str = "type";

/// One decoded line: a JSON object with string keys.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Frame {
    fields: Map<String, Value>,
}

impl Frame {
    /// Wrap an already-parsed object.
    pub fn new(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    /// The `type` discriminator, when present and a string.
    pub fn frame_type(&self) -> Option<&str> {
        self.fields.get(TYPE_FIELD).and_then(Value::as_str)
    }

    /// Look up one field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn into_fields(self) -> Map<String, Value> {
        self.fields
    }
}

impl From<Map<String, Value>> for Frame {
    fn from(fields: Map<String, Value>) -> Self {
        Self::new(fields)
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Compact JSON, the same text the device would send.
        let text = serde_json::to_string(&self.fields).map_err(|_| fmt::Error)?;
        f.write_str(&text)
    }
}

/// Encode a command into one wire line.
///
/// Wire format:
/// ```text
/// {"command":"set_motor","direction":1,"speed":128}\n
/// ```
/// Keys are emitted in sorted order, so equal commands encode to equal bytes.
pub fn encode(command: &Command) -> Bytes {
    let mut line = Value::Object(command.to_fields()).to_string();
    line.push('\n');
    Bytes::from(line)
}

/// Decode one line (terminator already stripped).
///
/// Returns `Ok(None)` for empty or whitespace-only lines. Errors are per line:
/// the caller is expected to log them and keep reading.
pub fn decode(line: &str) -> Result<Option<Frame>> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::Object(fields)) => Ok(Some(Frame::new(fields))),
        Ok(_) => Err(DecodeError::NotAnObject {
            raw: line.to_string(),
        }),
        Err(source) => Err(DecodeError::Malformed {
            raw: line.to_string(),
            source,
        }),
    }
}
