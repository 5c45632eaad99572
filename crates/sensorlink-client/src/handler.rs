//! Telemetry handlers.

use std::fmt::Display;
use std::io::{self, Write};
use std::sync::mpsc::Sender;
use std::time::{SystemTime, UNIX_EPOCH};

use sensorlink_frame::{is_sensor_error, SensorReading, StatusReport, TelemetryEvent};
use tracing::{trace, warn};

/// Receives every inbound frame that is not a command reply.
///
/// Runs on the listener thread, one event at a time in arrival order. A slow
/// handler delays reads; a panicking one stops the listener.
pub trait TelemetryHandler: Send {
    fn handle_telemetry(&mut self, event: TelemetryEvent);
}

impl<F> TelemetryHandler for F
where
    F: FnMut(TelemetryEvent) + Send,
{
    fn handle_telemetry(&mut self, event: TelemetryEvent) {
        self(event)
    }
}

/// Forwards events into a channel. Events are dropped once the receiver is gone.
#[derive(Debug, Clone)]
pub struct ChannelHandler(pub Sender<TelemetryEvent>);

impl TelemetryHandler for ChannelHandler {
    fn handle_telemetry(&mut self, event: TelemetryEvent) {
        if self.0.send(event).is_err() {
            trace!("telemetry receiver dropped");
        }
    }
}

/// Prints each event as a timestamped text block.
///
/// ```text
/// [14:03:27] Sensor data:
///   Temperature: 23.5°C
///   Humidity: sensor error
///   Light level: 512
/// ```
///
/// Timestamps are host wall-clock time in UTC.
#[derive(Debug)]
pub struct TextPresenter<W> {
    out: W,
}

impl TextPresenter<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> TextPresenter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> TelemetryHandler for TextPresenter<W> {
    fn handle_telemetry(&mut self, event: TelemetryEvent) {
        let result = render(&mut self.out, &clock(SystemTime::now()), &event)
            .and_then(|()| self.out.flush());
        if let Err(err) = result {
            warn!(%err, "failed to print telemetry");
        }
    }
}

/// `HH:MM:SS` of `now` in UTC.
fn clock(now: SystemTime) -> String {
    let secs = now
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
        % 86_400;
    format!("{:02}:{:02}:{:02}", secs / 3600, secs % 3600 / 60, secs % 60)
}

fn render(out: &mut impl Write, clock: &str, event: &TelemetryEvent) -> io::Result<()> {
    match event {
        TelemetryEvent::Sensor(reading) => render_sensor(out, clock, reading),
        TelemetryEvent::Status(report) => render_status(out, clock, report),
        TelemetryEvent::Other(frame) => writeln!(out, "[{clock}] {frame}"),
    }
}

fn render_sensor(out: &mut impl Write, clock: &str, reading: &SensorReading) -> io::Result<()> {
    writeln!(out, "[{clock}] Sensor data:")?;
    writeln!(out, "  Temperature: {}", measurement(reading.temperature, "°C"))?;
    writeln!(out, "  Humidity: {}", measurement(reading.humidity, "%"))?;
    writeln!(out, "  Light level: {}", or_na(reading.light_level))?;
    render_motor(out, reading.motor_speed, reading.motor_running)
}

fn render_status(out: &mut impl Write, clock: &str, report: &StatusReport) -> io::Result<()> {
    writeln!(out, "[{clock}] Status:")?;
    writeln!(out, "  Uptime: {}", with_unit(report.uptime_ms, "ms"))?;
    writeln!(out, "  Free memory: {}", with_unit(report.free_memory, " bytes"))?;
    let dht22 = if report.dht22_connected.unwrap_or(false) {
        "connected"
    } else {
        "disconnected"
    };
    writeln!(out, "  DHT22: {dht22}")?;
    render_motor(out, report.motor_speed, report.motor_running)
}

/// A missing running flag reads as stopped.
fn render_motor(out: &mut impl Write, speed: Option<i64>, running: Option<bool>) -> io::Result<()> {
    writeln!(out, "  Motor speed: {}", or_na(speed))?;
    let state = if running.unwrap_or(false) {
        "running"
    } else {
        "stopped"
    };
    writeln!(out, "  Motor: {state}")
}

fn measurement(value: Option<f64>, unit: &str) -> String {
    match value {
        Some(v) if is_sensor_error(v) => "sensor error".to_string(),
        Some(v) => format!("{v}{unit}"),
        None => "N/A".to_string(),
    }
}

fn with_unit<T: Display>(value: Option<T>, unit: &str) -> String {
    value.map_or_else(|| "N/A".to_string(), |v| format!("{v}{unit}"))
}

fn or_na<T: Display>(value: Option<T>) -> String {
    with_unit(value, "")
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;
    use std::time::Duration;

    use sensorlink_frame::decode;

    use super::*;

    fn event(text: &str) -> TelemetryEvent {
        TelemetryEvent::from_frame(decode(text).unwrap().unwrap())
    }

    fn rendered(event: &TelemetryEvent) -> String {
        let mut out = Vec::new();
        render(&mut out, "12:00:00", event).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn sensor_block_shows_sentinel_as_error() {
        let text = rendered(&event(
            r#"{"type":"sensor_data","temperature":-999,"humidity":40.5,"light_level":512}"#,
        ));
        assert_eq!(
            text,
            "[12:00:00] Sensor data:\n  Temperature: sensor error\n  Humidity: 40.5%\n  \
             Light level: 512\n  Motor speed: N/A\n  Motor: stopped\n"
        );
    }

    #[test]
    fn sensor_block_with_motor() {
        let text = rendered(&event(
            r#"{"type":"sensor_data","temperature":21.5,"motor_speed":128,"motor_running":true}"#,
        ));
        assert!(text.contains("  Temperature: 21.5°C\n"));
        assert!(text.contains("  Humidity: N/A\n"));
        assert!(text.ends_with("  Motor speed: 128\n  Motor: running\n"));
    }

    #[test]
    fn status_and_other_blocks() {
        let status = rendered(&event(
            r#"{"type":"status","uptime":1500,"free_memory":812,"dht22_connected":true,"motor_speed":200,"motor_running":true}"#,
        ));
        assert_eq!(
            status,
            "[12:00:00] Status:\n  Uptime: 1500ms\n  Free memory: 812 bytes\n  DHT22: connected\n  \
             Motor speed: 200\n  Motor: running\n"
        );

        let bare = rendered(&event(r#"{"type":"status"}"#));
        assert_eq!(
            bare,
            "[12:00:00] Status:\n  Uptime: N/A\n  Free memory: N/A\n  DHT22: disconnected\n  \
             Motor speed: N/A\n  Motor: stopped\n"
        );

        let other = rendered(&event(r#"{"type":"heartbeat","n":1}"#));
        assert_eq!(other, "[12:00:00] {\"n\":1,\"type\":\"heartbeat\"}\n");
    }

    #[test]
    fn clock_is_utc_time_of_day() {
        let at = UNIX_EPOCH + Duration::from_secs(3 * 86_400 + 13 * 3600 + 5 * 60 + 9);
        assert_eq!(clock(at), "13:05:09");
    }

    #[test]
    fn presenter_writes_to_sink() {
        let mut presenter = TextPresenter::new(Vec::new());
        presenter.handle_telemetry(event(r#"{"type":"status","uptime":1}"#));
        let text = String::from_utf8(presenter.into_inner()).unwrap();
        assert!(text.contains("] Status:\n  Uptime: 1ms\n"));
    }

    #[test]
    fn closures_and_channels_are_handlers() {
        let mut seen = Vec::new();
        {
            let mut handler = |event: TelemetryEvent| seen.push(event.kind().map(str::to_owned));
            handler.handle_telemetry(event(r#"{"type":"status"}"#));
        }
        assert_eq!(seen, vec![Some("status".to_string())]);

        let (tx, rx) = mpsc::channel();
        let mut handler = ChannelHandler(tx);
        handler.handle_telemetry(event(r#"{"type":"sensor_data","humidity":-999}"#));
        match rx.recv().unwrap() {
            TelemetryEvent::Sensor(reading) => assert!(reading.humidity_failed()),
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
