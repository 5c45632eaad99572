use std::time::Duration;

/// Behavior of a [`crate::Connection`] on top of its transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// How long a command waits for its reply. `None` uses the transport's
    /// read timeout.
    pub command_timeout: Option<Duration>,
    /// Sleep between listener polls when no input is pending. Also bounds how
    /// long a close takes to reach the listener and a waiting command.
    pub poll_interval: Duration,
}

impl ClientConfig {
    pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

    pub(crate) fn command_timeout_for(&self, read_timeout: Duration) -> Duration {
        self.command_timeout.unwrap_or(read_timeout)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            command_timeout: None,
            poll_interval: Self::DEFAULT_POLL_INTERVAL,
        }
    }
}
