//! Command channel: write one command, wait for the frame that answers it.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender};
use std::thread;
use std::time::{Duration, Instant};

use sensorlink_frame::{encode, Command, Frame, LedState, MotorDirection};
use sensorlink_transport::Transport;
use serde_json::{Map, Value};
use tracing::{debug, error, warn};

use crate::connection::{Connection, Inbound, Shared};
use crate::error::{ClientError, Result};
use crate::reply::Reply;

/// Retry interval while waiting for the listener to drain pending input.
const QUIESCE_RETRY: Duration = Duration::from_millis(5);
/// Reply poll interval when no listener is running.
const DIRECT_POLL: Duration = Duration::from_millis(10);

impl Connection {
    /// Send a command by name with the given parameters.
    ///
    /// The `command` key is always the name, even if `params` carries one.
    pub fn send(&self, name: &str, params: Map<String, Value>) -> Result<Reply> {
        self.send_command(&Command::with_params(name, params))
    }

    /// Send `command` and wait for its reply.
    ///
    /// Commands are serialized: a second caller blocks until the first one has
    /// its reply or has given up. The reply is the first frame read after the
    /// command was written; anything that arrived earlier is telemetry (or is
    /// discarded when no listener is running).
    ///
    /// # Errors
    ///
    /// - [`ClientError::NotConnected`] if the connection is closed, or closes
    ///   while waiting
    /// - [`ClientError::Transport`] if the write or a read fails; the
    ///   connection is closed
    /// - [`ClientError::Timeout`] if no reply arrives within
    ///   [`Connection::command_timeout`]; the connection stays usable
    pub fn send_command(&self, command: &Command) -> Result<Reply> {
        let shared = &self.shared;
        let _turn = shared.lock_in_flight();
        if !shared.is_connected() {
            return Err(ClientError::NotConnected);
        }

        let timeout = shared.command_timeout;
        let deadline = Instant::now() + timeout;
        let bytes = encode(command);
        let (slot, reply) = mpsc::sync_channel(1);

        shared.submit(&bytes, slot, deadline, timeout)?;
        debug!(port = %shared.name, command = command.name(), "command sent");

        match shared.await_reply(&reply, deadline, timeout) {
            Ok(frame) => {
                debug!(port = %shared.name, command = command.name(), %frame, "reply received");
                Ok(Reply::from(frame))
            }
            Err(err) => {
                if matches!(err, ClientError::Timeout(_)) {
                    warn!(port = %shared.name, command = command.name(), ?timeout, "no reply");
                }
                Err(err)
            }
        }
    }

    /// Request an immediate sensor reading.
    pub fn get_sensor_data(&self) -> Result<Reply> {
        self.send_command(&Command::get_sensor_data())
    }

    pub fn set_led(&self, state: LedState) -> Result<Reply> {
        self.send_command(&Command::set_led(state))
    }

    pub fn set_motor(&self, speed: u8, direction: MotorDirection) -> Result<Reply> {
        self.send_command(&Command::set_motor(speed, direction))
    }

    pub fn stop_motor(&self) -> Result<Reply> {
        self.send_command(&Command::stop_motor())
    }

    /// Request a status report.
    pub fn get_status(&self) -> Result<Reply> {
        self.send_command(&Command::get_status())
    }
}

impl Shared {
    /// Install the reply slot and write the command.
    ///
    /// Nothing that arrived before the write may become the reply. With a
    /// listener running, wait until it has taken every complete line; without
    /// one, discard them here. A partial line never holds up the write.
    fn submit(
        &self,
        bytes: &[u8],
        slot: SyncSender<Frame>,
        deadline: Instant,
        timeout: Duration,
    ) -> Result<()> {
        loop {
            let mut guard = self.lock_link();
            let link = &mut *guard;
            let Some(transport) = link.transport.as_mut() else {
                return Err(ClientError::NotConnected);
            };

            let drained = if self.is_listening() {
                transport.line_ready().map(|pending| !pending)
            } else {
                self.discard_pending(transport.as_mut()).map(|_| true)
            };

            match drained {
                Ok(true) => {}
                Ok(false) => {
                    drop(guard);
                    if Instant::now() >= deadline {
                        return Err(ClientError::Timeout(timeout));
                    }
                    thread::sleep(QUIESCE_RETRY);
                    continue;
                }
                Err(err) => {
                    error!(port = %self.name, %err, "read failed; closing connection");
                    self.teardown(link);
                    return Err(err.into());
                }
            }

            link.reply_slot = Some(slot);
            if let Err(err) = transport.write(bytes) {
                error!(port = %self.name, %err, "write failed; closing connection");
                self.teardown(link);
                return Err(err.into());
            }
            return Ok(());
        }
    }

    fn discard_pending(&self, transport: &mut dyn Transport) -> sensorlink_transport::Result<()> {
        while transport.line_ready()? {
            match transport.read_line()? {
                Some(line) => debug!(port = %self.name, raw = %line, "discarding stale line"),
                None => break,
            }
        }
        Ok(())
    }

    fn await_reply(
        &self,
        reply: &Receiver<Frame>,
        deadline: Instant,
        timeout: Duration,
    ) -> Result<Frame> {
        loop {
            let listening = self.is_listening();
            if !listening {
                if let Inbound::Telemetry(frame) = self.next_inbound()? {
                    debug!(port = %self.name, %frame, "dropping frame with no waiting command");
                }
            }

            let now = Instant::now();
            if now >= deadline {
                self.clear_reply_slot();
                return reply.try_recv().map_err(|_| ClientError::Timeout(timeout));
            }

            let poll = if listening {
                self.config.poll_interval
            } else {
                DIRECT_POLL
            };
            match reply.recv_timeout(poll.min(deadline - now)) {
                Ok(frame) => return Ok(frame),
                Err(RecvTimeoutError::Disconnected) => return Err(ClientError::NotConnected),
                Err(RecvTimeoutError::Timeout) => {}
            }

            if self.cancel.is_cancelled() {
                return Err(ClientError::NotConnected);
            }
        }
    }

    fn clear_reply_slot(&self) {
        self.lock_link().reply_slot = None;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use sensorlink_frame::TelemetryEvent;

    use super::*;
    use crate::config::ClientConfig;
    use crate::testing::{fake, FakeDevice};

    fn connect(command_timeout: Duration) -> (Connection, FakeDevice) {
        let (transport, device) = fake(Duration::from_millis(50));
        let config = ClientConfig {
            command_timeout: Some(command_timeout),
            ..ClientConfig::default()
        };
        (Connection::with_transport(Box::new(transport), config), device)
    }

    #[test]
    fn set_led_returns_device_acknowledgement() {
        let (conn, device) = connect(Duration::from_secs(1));
        device.respond_with(|line| {
            assert_eq!(line, r#"{"command":"set_led","state":1}"#);
            vec![r#"{"response":"LED state changed"}"#.to_string()]
        });

        let reply = conn.set_led(LedState::On).unwrap();
        assert_eq!(reply.response(), Some("LED state changed"));
        assert_eq!(device.written().len(), 1);
    }

    #[test]
    fn send_returns_echoed_frame() {
        let (conn, device) = connect(Duration::from_secs(1));
        device.respond_with(|line| vec![line.to_string()]);

        let mut params = Map::new();
        params.insert("state".into(), json!(1));
        let reply = conn.send("set_led", params).unwrap();

        assert_eq!(reply.get("command"), Some(&json!("set_led")));
        assert_eq!(reply.get("state"), Some(&json!(1)));
    }

    #[test]
    fn command_name_wins_over_params() {
        let (conn, device) = connect(Duration::from_secs(1));
        device.respond_with(|_| vec![r#"{"response":"ok"}"#.to_string()]);

        let mut params = Map::new();
        params.insert("command".into(), json!("spoofed"));
        params.insert("speed".into(), json!(10));
        conn.send("set_motor", params).unwrap();

        assert_eq!(
            device.written(),
            vec![r#"{"command":"set_motor","speed":10}"#.to_string()]
        );
    }

    #[test]
    fn device_error_is_a_successful_reply() {
        let (conn, device) = connect(Duration::from_secs(1));
        device.respond_with(|_| vec![r#"{"error":"Unknown command"}"#.to_string()]);

        let reply = conn.send("dance", Map::new()).unwrap();
        assert_eq!(reply.device_error(), Some("Unknown command"));
    }

    #[test]
    fn send_on_closed_connection_writes_nothing() {
        let (conn, device) = connect(Duration::from_secs(1));
        conn.close();

        let err = conn.get_status().unwrap_err();
        assert!(matches!(err, ClientError::NotConnected));
        assert!(device.written().is_empty());
    }

    #[test]
    fn timeout_leaves_connection_usable() {
        let (conn, device) = connect(Duration::from_millis(100));

        let started = Instant::now();
        let err = conn.get_status().unwrap_err();
        assert!(matches!(err, ClientError::Timeout(t) if t == Duration::from_millis(100)));
        assert!(started.elapsed() < Duration::from_secs(1));
        assert!(conn.is_connected());

        device.respond_with(|_| vec![r#"{"type":"status","uptime":5}"#.to_string()]);
        let reply = conn.get_status().unwrap();
        assert_eq!(reply.status_report().unwrap().uptime_ms, Some(5));
    }

    #[test]
    fn close_wakes_pending_send() {
        let (conn, _device) = connect(Duration::from_secs(10));
        let conn = Arc::new(conn);

        let sender = {
            let conn = Arc::clone(&conn);
            thread::spawn(move || conn.get_sensor_data())
        };
        thread::sleep(Duration::from_millis(50));
        let closed_at = Instant::now();
        conn.close();

        let err = sender.join().unwrap().unwrap_err();
        assert!(matches!(err, ClientError::NotConnected));
        assert!(closed_at.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn stale_lines_are_not_taken_as_reply() {
        let (conn, device) = connect(Duration::from_secs(1));
        device.push_line(r#"{"type":"sensor_data","temperature":20.5}"#);
        device.push_line(r#"{"type":"status","uptime":1}"#);
        device.respond_with(|_| vec![r#"{"response":"Motor stopped"}"#.to_string()]);

        let reply = conn.stop_motor().unwrap();
        assert_eq!(reply.response(), Some("Motor stopped"));
        assert_eq!(device.pending(), 0);
    }

    #[test]
    fn undecodable_reply_line_is_skipped() {
        let (conn, device) = connect(Duration::from_secs(1));
        device.respond_with(|_| {
            vec![
                "not json".to_string(),
                r#"{"response":"LED state changed"}"#.to_string(),
            ]
        });

        let reply = conn.set_led(LedState::Off).unwrap();
        assert_eq!(reply.response(), Some("LED state changed"));
    }

    #[test]
    fn write_failure_closes_connection() {
        let (conn, device) = connect(Duration::from_secs(1));
        device.fail_writes();

        let err = conn.stop_motor().unwrap_err();
        assert!(matches!(err, ClientError::Transport(_)));
        assert!(!conn.is_connected());
        assert!(matches!(conn.stop_motor(), Err(ClientError::NotConnected)));
    }

    #[test]
    fn read_failure_before_write_closes_connection() {
        let (conn, device) = connect(Duration::from_secs(1));
        device.fail_reads();

        let err = conn.get_status().unwrap_err();
        assert!(matches!(err, ClientError::Transport(_)));
        assert!(!conn.is_connected());
        assert!(device.written().is_empty());
        assert!(device.is_closed());
    }

    #[test]
    fn partial_line_does_not_hold_back_commands_while_listening() {
        let (conn, device) = connect(Duration::from_millis(500));
        let _listener = conn.listen(|_event: TelemetryEvent| {}).unwrap();
        device.push_partial("Arduino Rea");
        device.respond_with(|_| vec![r#"{"response":"LED state changed"}"#.to_string()]);

        let started = Instant::now();
        assert_eq!(
            conn.set_led(LedState::On).unwrap().response(),
            Some("LED state changed")
        );
        assert_eq!(
            conn.set_led(LedState::Off).unwrap().response(),
            Some("LED state changed")
        );
        assert!(started.elapsed() < Duration::from_millis(500));
        assert_eq!(
            device.written(),
            vec![
                r#"{"command":"set_led","state":1}"#.to_string(),
                r#"{"command":"set_led","state":0}"#.to_string(),
            ]
        );
    }

    #[test]
    fn partial_line_does_not_hold_back_direct_commands() {
        let (conn, device) = connect(Duration::from_millis(500));
        device.push_partial("{\"type\":\"sens");
        device.respond_with(|_| vec![r#"{"response":"Motor stopped"}"#.to_string()]);

        let reply = conn.stop_motor().unwrap();
        assert_eq!(reply.response(), Some("Motor stopped"));
        assert_eq!(device.written().len(), 1);
    }
}
