/// Errors that can occur while decoding a line into a frame.
///
/// Both variants keep the offending line so callers can log it.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The line is not valid JSON.
    #[error("malformed frame {raw:?}: {source}")]
    Malformed {
        raw: String,
        source: serde_json::Error,
    },

    /// The line is valid JSON but not an object.
    #[error("frame is not a JSON object: {raw:?}")]
    NotAnObject { raw: String },
}

impl DecodeError {
    /// The line that failed to decode.
    pub fn raw_line(&self) -> &str {
        match self {
            Self::Malformed { raw, .. } | Self::NotAnObject { raw } => raw,
        }
    }
}

pub type Result<T> = std::result::Result<T, DecodeError>;
