//! In-memory transport for exercising the client without hardware.

use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, Instant};

use sensorlink_transport::{Result, Transport, TransportError};

type Responder = Box<dyn FnMut(&str) -> Vec<String> + Send>;

#[derive(Default)]
struct State {
    inbound: VecDeque<String>,
    partial: String,
    written: Vec<String>,
    responder: Option<Responder>,
    closed: bool,
    fail_reads: bool,
    fail_writes: bool,
}

/// Transport half handed to the connection.
pub(crate) struct FakeTransport {
    state: Arc<Mutex<State>>,
    timeout: Duration,
}

/// Test half: scripts the device side.
#[derive(Clone)]
pub(crate) struct FakeDevice {
    state: Arc<Mutex<State>>,
}

pub(crate) fn fake(timeout: Duration) -> (FakeTransport, FakeDevice) {
    let state = Arc::new(Mutex::new(State::default()));
    (
        FakeTransport {
            state: Arc::clone(&state),
            timeout,
        },
        FakeDevice { state },
    )
}

fn lock(state: &Mutex<State>) -> MutexGuard<'_, State> {
    state.lock().unwrap_or_else(|e| e.into_inner())
}

impl FakeDevice {
    /// Queue a line as if the device had sent it.
    pub(crate) fn push_line(&self, line: &str) {
        lock(&self.state).inbound.push_back(line.to_string());
    }

    /// Leave `text` pending with no terminator, as a device cut off mid-line.
    pub(crate) fn push_partial(&self, text: &str) {
        lock(&self.state).partial.push_str(text);
    }

    /// Answer every written line with the lines `responder` returns.
    pub(crate) fn respond_with<F>(&self, responder: F)
    where
        F: FnMut(&str) -> Vec<String> + Send + 'static,
    {
        lock(&self.state).responder = Some(Box::new(responder));
    }

    /// Lines written by the client, terminators stripped.
    pub(crate) fn written(&self) -> Vec<String> {
        lock(&self.state).written.clone()
    }

    pub(crate) fn pending(&self) -> usize {
        lock(&self.state).inbound.len()
    }

    pub(crate) fn is_closed(&self) -> bool {
        lock(&self.state).closed
    }

    pub(crate) fn fail_reads(&self) {
        lock(&self.state).fail_reads = true;
    }

    pub(crate) fn fail_writes(&self) {
        lock(&self.state).fail_writes = true;
    }
}

fn broken() -> TransportError {
    TransportError::Io(io::Error::new(io::ErrorKind::BrokenPipe, "device unplugged"))
}

impl Transport for FakeTransport {
    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        let mut state = lock(&self.state);
        if state.closed {
            return Err(TransportError::Closed);
        }
        if state.fail_writes {
            return Err(broken());
        }
        let line = String::from_utf8_lossy(bytes).trim_end().to_string();
        state.written.push(line.clone());
        if let Some(responder) = state.responder.as_mut() {
            let replies = responder(&line);
            state.inbound.extend(replies);
        }
        Ok(())
    }

    fn read_line(&mut self) -> Result<Option<String>> {
        let deadline = Instant::now() + self.timeout;
        loop {
            {
                let mut state = lock(&self.state);
                if state.closed {
                    return Err(TransportError::Closed);
                }
                if state.fail_reads {
                    return Err(broken());
                }
                if let Some(line) = state.inbound.pop_front() {
                    return Ok(Some(line));
                }
            }
            if Instant::now() >= deadline {
                return Ok(None);
            }
            thread::sleep(Duration::from_millis(2));
        }
    }

    fn bytes_available(&mut self) -> Result<bool> {
        let state = lock(&self.state);
        if state.closed {
            return Err(TransportError::Closed);
        }
        if state.fail_reads {
            return Err(broken());
        }
        Ok(!state.inbound.is_empty() || !state.partial.is_empty())
    }

    fn line_ready(&mut self) -> Result<bool> {
        let state = lock(&self.state);
        if state.closed {
            return Err(TransportError::Closed);
        }
        if state.fail_reads {
            return Err(broken());
        }
        Ok(!state.inbound.is_empty())
    }

    fn close(&mut self) -> Result<()> {
        lock(&self.state).closed = true;
        Ok(())
    }

    fn read_timeout(&self) -> Duration {
        self.timeout
    }

    fn name(&self) -> &str {
        "fake"
    }
}
