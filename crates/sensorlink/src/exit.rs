use std::fmt;
use std::io;

use sensorlink_client::ClientError;
use sensorlink_transport::TransportError;

// Exit codes follow the sysexits/timeout(1) conventions.
pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::NotFound | io::ErrorKind::BrokenPipe => TRANSPORT_ERROR,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::Io(source) => io_error(context, source),
        other => CliError::new(TRANSPORT_ERROR, format!("{context}: {other}")),
    }
}

pub fn client_error(context: &str, err: ClientError) -> CliError {
    match err {
        ClientError::Transport(err) => transport_error(context, err),
        ClientError::Timeout(_) => CliError::new(TIMEOUT, format!("{context}: {err}")),
        ClientError::NotConnected => CliError::new(FAILURE, format!("{context}: {err}")),
        ClientError::Spawn(source) => io_error(context, source),
        other => CliError::new(INTERNAL, format!("{context}: {other}")),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn client_errors_map_to_stable_codes() {
        assert_eq!(
            client_error("x", ClientError::Timeout(Duration::from_secs(1))).code,
            TIMEOUT
        );
        assert_eq!(client_error("x", ClientError::NotConnected).code, FAILURE);
        assert_eq!(
            client_error("x", ClientError::Transport(TransportError::Closed)).code,
            TRANSPORT_ERROR
        );
        assert_eq!(client_error("x", ClientError::AlreadyListening).code, INTERNAL);
    }

    #[test]
    fn io_errors_keep_context() {
        let err = transport_error(
            "read failed",
            TransportError::Io(io::Error::new(io::ErrorKind::PermissionDenied, "denied")),
        );
        assert_eq!(err.code, PERMISSION_DENIED);
        assert_eq!(err.to_string(), "read failed: denied");
    }
}
