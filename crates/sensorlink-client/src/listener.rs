//! Background telemetry listener.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use sensorlink_frame::TelemetryEvent;
use tracing::{debug, info, trace, warn};

use crate::connection::{Connection, Inbound, Shared};
use crate::error::{ClientError, Result};
use crate::handler::{TelemetryHandler, TextPresenter};

/// Handle to a running listener thread.
///
/// Dropping the handle detaches the thread; it still stops when the
/// connection closes.
#[derive(Debug)]
pub struct ListenerHandle {
    thread: JoinHandle<()>,
}

impl ListenerHandle {
    /// Wait for the listener to stop. Returns `Err` with the panic payload if
    /// the handler panicked.
    pub fn join(self) -> thread::Result<()> {
        self.thread.join()
    }

    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }
}

impl Connection {
    /// Start delivering unsolicited frames to `handler` on a background thread.
    ///
    /// While the listener runs, command replies are still routed to the
    /// waiting [`Connection::send_command`] call; everything else goes to the
    /// handler. The listener stops when the connection closes or a read fails.
    pub fn listen<H>(&self, handler: H) -> Result<ListenerHandle>
    where
        H: TelemetryHandler + 'static,
    {
        if !self.is_connected() {
            return Err(ClientError::NotConnected);
        }
        if self.shared.listening.swap(true, Ordering::AcqRel) {
            return Err(ClientError::AlreadyListening);
        }

        let shared = Arc::clone(&self.shared);
        let spawned = thread::Builder::new()
            .name("sensorlink-telemetry".into())
            .spawn(move || run(&shared, handler));

        match spawned {
            Ok(thread) => {
                info!(port = %self.shared.name, "telemetry listener started");
                Ok(ListenerHandle { thread })
            }
            Err(err) => {
                self.shared.listening.store(false, Ordering::Release);
                Err(ClientError::Spawn(err))
            }
        }
    }

    /// Start a listener that prints telemetry to stdout.
    pub fn listen_with_presenter(&self) -> Result<ListenerHandle> {
        self.listen(TextPresenter::stdout())
    }
}

/// Clears the listening flag when the listener exits, including by panic.
struct RunningGuard<'a>(&'a Shared);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.listening.store(false, Ordering::Release);
    }
}

fn run<H: TelemetryHandler>(shared: &Shared, mut handler: H) {
    let _running = RunningGuard(shared);

    while !shared.cancel.is_cancelled() {
        match shared.next_inbound() {
            Ok(Inbound::Idle) => thread::sleep(shared.config.poll_interval),
            Ok(Inbound::Skipped) | Ok(Inbound::Replied) => {}
            Ok(Inbound::Telemetry(frame)) => {
                let event = TelemetryEvent::from_frame(frame);
                trace!(port = %shared.name, kind = ?event.kind(), "dispatching telemetry");
                handler.handle_telemetry(event);
            }
            Err(ClientError::NotConnected) => break,
            Err(err) => {
                warn!(port = %shared.name, %err, "telemetry listener stopping");
                break;
            }
        }
    }

    debug!(port = %shared.name, "telemetry listener stopped");
}
