use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::SyncSender;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use sensorlink_frame::{decode, Frame};
use sensorlink_transport::{SerialConfig, SerialTransport, Transport};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};

/// An open session with one device.
///
/// All methods take `&self`; share the connection between the thread issuing
/// commands and anything that needs to close it. Dropping the connection
/// closes it.
pub struct Connection {
    pub(crate) shared: Arc<Shared>,
}

impl Connection {
    /// Open a serial device with default client behavior.
    pub fn open(serial: &SerialConfig) -> Result<Self> {
        Self::open_with_config(serial, ClientConfig::default())
    }

    /// Open a serial device with explicit client behavior.
    pub fn open_with_config(serial: &SerialConfig, config: ClientConfig) -> Result<Self> {
        let transport = SerialTransport::open(serial)?;
        Ok(Self::with_transport(Box::new(transport), config))
    }

    /// Attach an already open transport.
    pub fn with_transport(transport: Box<dyn Transport>, config: ClientConfig) -> Self {
        let name = transport.name().to_string();
        let command_timeout = config.command_timeout_for(transport.read_timeout());
        info!(port = %name, ?command_timeout, "connected");

        Self {
            shared: Arc::new(Shared {
                name,
                command_timeout,
                config,
                cancel: CancellationToken::new(),
                listening: AtomicBool::new(false),
                link: Mutex::new(Link {
                    transport: Some(transport),
                    reply_slot: None,
                }),
                in_flight: Mutex::new(()),
            }),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.shared.is_connected()
    }

    /// Whether a telemetry listener currently owns the read side.
    pub fn is_listening(&self) -> bool {
        self.shared.is_listening()
    }

    /// Transport name, usually the device path.
    pub fn port_name(&self) -> &str {
        &self.shared.name
    }

    /// Bound on the wait for a command reply.
    pub fn command_timeout(&self) -> Duration {
        self.shared.command_timeout
    }

    /// Close the connection. Idempotent.
    ///
    /// A command waiting for its reply returns [`ClientError::NotConnected`];
    /// a running listener exits within one poll interval.
    pub fn close(&self) {
        self.shared.shutdown();
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.shared.shutdown();
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("port", &self.shared.name)
            .field("connected", &self.is_connected())
            .field("listening", &self.is_listening())
            .finish()
    }
}

/// State shared between the connection handle and its listener thread.
pub(crate) struct Shared {
    pub(crate) name: String,
    pub(crate) config: ClientConfig,
    pub(crate) command_timeout: Duration,
    /// Cancelled exactly once, when the connection goes down.
    pub(crate) cancel: CancellationToken,
    pub(crate) listening: AtomicBool,
    link: Mutex<Link>,
    in_flight: Mutex<()>,
}

/// Everything guarded by the read/write lock. Reads, writes and the decision
/// where an inbound frame goes all happen while holding it.
pub(crate) struct Link {
    pub(crate) transport: Option<Box<dyn Transport>>,
    /// Where the next decoded frame goes while a command is waiting.
    pub(crate) reply_slot: Option<SyncSender<Frame>>,
}

/// Outcome of one read attempt.
#[derive(Debug)]
pub(crate) enum Inbound {
    /// Nothing pending on the transport.
    Idle,
    /// A blank or undecodable line was consumed.
    Skipped,
    /// A frame was handed to the waiting command.
    Replied,
    /// A frame nobody was waiting for.
    Telemetry(Frame),
}

impl Shared {
    pub(crate) fn is_connected(&self) -> bool {
        !self.cancel.is_cancelled()
    }

    pub(crate) fn is_listening(&self) -> bool {
        self.listening.load(Ordering::Acquire)
    }

    pub(crate) fn lock_link(&self) -> MutexGuard<'_, Link> {
        self.link.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn lock_in_flight(&self) -> MutexGuard<'_, ()> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn shutdown(&self) {
        self.cancel.cancel();
        let mut link = self.lock_link();
        self.teardown(&mut link);
    }

    /// Mark the connection closed and release the transport. The caller holds
    /// the link lock.
    pub(crate) fn teardown(&self, link: &mut Link) {
        self.cancel.cancel();
        link.reply_slot = None;
        if let Some(mut transport) = link.transport.take() {
            if let Err(err) = transport.close() {
                warn!(port = %self.name, %err, "error while closing transport");
            }
            info!(port = %self.name, "connection closed");
        }
    }

    /// Read and route at most one line.
    ///
    /// Only reads when input is pending, so the link lock is never held for a
    /// full read timeout while the device is silent. A read error closes the
    /// connection.
    pub(crate) fn next_inbound(&self) -> Result<Inbound> {
        let mut guard = self.lock_link();
        let link = &mut *guard;
        let Some(transport) = link.transport.as_mut() else {
            return Err(ClientError::NotConnected);
        };

        let line = match read_pending_line(transport.as_mut()) {
            Ok(Some(line)) => line,
            Ok(None) => return Ok(Inbound::Idle),
            Err(err) => {
                error!(port = %self.name, %err, "read failed; closing connection");
                self.teardown(link);
                return Err(err.into());
            }
        };

        let frame = match decode(&line) {
            Ok(Some(frame)) => frame,
            Ok(None) => return Ok(Inbound::Skipped),
            Err(err) => {
                warn!(port = %self.name, raw = err.raw_line(), %err, "discarding undecodable line");
                return Ok(Inbound::Skipped);
            }
        };
        debug!(port = %self.name, %frame, "frame received");

        match link.reply_slot.take() {
            Some(slot) => {
                if slot.try_send(frame).is_err() {
                    debug!(port = %self.name, "reply arrived after its command gave up");
                }
                Ok(Inbound::Replied)
            }
            None => Ok(Inbound::Telemetry(frame)),
        }
    }
}

fn read_pending_line(
    transport: &mut dyn Transport,
) -> sensorlink_transport::Result<Option<String>> {
    if !transport.line_ready()? {
        return Ok(None);
    }
    transport.read_line()
}
