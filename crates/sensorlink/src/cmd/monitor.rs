use std::any::Any;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use sensorlink_client::ChannelHandler;
use tracing::{info, warn};

use crate::cmd::{parse_duration, MonitorArgs};
use crate::exit::{client_error, CliError, CliResult, INTERNAL, SUCCESS, TRANSPORT_ERROR};
use crate::output::{EventPrinter, OutputFormat};

const TICK: Duration = Duration::from_millis(100);

pub fn run(args: MonitorArgs, format: OutputFormat) -> CliResult<i32> {
    let stop_after = args.duration.as_deref().map(parse_duration).transpose()?;
    let connection = args.conn.connect()?;

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let (tx, rx) = mpsc::channel();
    let listener = connection
        .listen(ChannelHandler(tx))
        .map_err(|err| client_error("listener failed", err))?;

    let started = Instant::now();
    let mut printer = EventPrinter::new(connection.port_name(), format);
    let mut printed = 0usize;
    let mut lost = false;

    while running.load(Ordering::SeqCst) {
        if stop_after.is_some_and(|limit| started.elapsed() >= limit) {
            break;
        }

        match rx.recv_timeout(TICK) {
            Ok(event) => {
                printer.print(event);
                printed = printed.saturating_add(1);
                if args.count.is_some_and(|count| printed >= count) {
                    break;
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                lost = true;
                break;
            }
        }
    }

    connection.close();
    listener_outcome(listener.join())?;
    if lost {
        return Err(CliError::new(
            TRANSPORT_ERROR,
            format!("connection to {} lost", connection.port_name()),
        ));
    }
    info!(events = printed, "monitor stopped");
    Ok(SUCCESS)
}

/// A panic on the listener thread is a bug, not a lost device.
fn listener_outcome(joined: thread::Result<()>) -> CliResult<()> {
    joined.map_err(|payload| {
        let reason = panic_reason(payload.as_ref());
        warn!(%reason, "telemetry listener panicked");
        CliError::new(INTERNAL, format!("telemetry listener panicked: {reason}"))
    })
}

fn panic_reason(payload: &(dyn Any + Send)) -> &str {
    if let Some(text) = payload.downcast_ref::<&str>() {
        text
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text
    } else {
        "unknown cause"
    }
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn panicked(payload: impl Any + Send) -> thread::Result<()> {
        Err(Box::new(payload))
    }

    #[test]
    fn clean_listener_exit_is_ok() {
        assert!(listener_outcome(Ok(())).is_ok());
    }

    #[test]
    fn listener_panic_is_internal_error() {
        let err = listener_outcome(panicked("handler failed")).unwrap_err();
        assert_eq!(err.code, INTERNAL);
        assert!(err.message.contains("handler failed"), "{}", err.message);

        let err = listener_outcome(panicked(String::from("bad frame"))).unwrap_err();
        assert!(err.message.contains("bad frame"), "{}", err.message);

        let err = listener_outcome(panicked(42_u8)).unwrap_err();
        assert!(err.message.contains("unknown cause"), "{}", err.message);
    }
}
