/// Errors that can occur in client operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The connection is closed, or was closed while the operation waited.
    #[error("not connected")]
    NotConnected,

    /// Transport-level error. The connection is closed when this is returned
    /// from a send or a read.
    #[error("transport error: {0}")]
    Transport(#[from] sensorlink_transport::TransportError),

    /// No reply arrived in time. The connection stays usable.
    #[error("no reply within {0:?}")]
    Timeout(std::time::Duration),

    /// A telemetry listener is already running on this connection.
    #[error("telemetry listener already running")]
    AlreadyListening,

    /// The listener thread could not be started.
    #[error("failed to spawn telemetry listener: {0}")]
    Spawn(std::io::Error),
}

pub type Result<T> = std::result::Result<T, ClientError>;
