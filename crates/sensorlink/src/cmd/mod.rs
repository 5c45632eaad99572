use std::time::Duration;

use clap::{Args, Subcommand};
use sensorlink_client::Connection;
use sensorlink_frame::{LedState, MotorDirection};
use sensorlink_transport::{available_ports, SerialConfig};
use tracing::info;

use crate::exit::{client_error, transport_error, CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod monitor;
pub mod ports;
pub mod request;
pub mod send;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List serial ports present on this host.
    Ports(PortsArgs),
    /// Print telemetry until interrupted.
    Monitor(MonitorArgs),
    /// Send a command by name and print the reply.
    Send(SendArgs),
    /// Request a sensor reading.
    Sensor(ConnectionArgs),
    /// Request a status report.
    Status(ConnectionArgs),
    /// Switch the LED on or off.
    Led(LedArgs),
    /// Run the motor.
    Motor(MotorArgs),
    /// Stop the motor.
    StopMotor(ConnectionArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Ports(args) => ports::run(args, format),
        Command::Monitor(args) => monitor::run(args, format),
        Command::Send(args) => send::run(args, format),
        Command::Sensor(conn) => request::run(&conn, &request::sensor(), format),
        Command::Status(conn) => request::run(&conn, &request::status(), format),
        Command::Led(args) => request::run(&args.conn, &request::led(args.state), format),
        Command::Motor(args) => request::run(
            &args.conn,
            &request::motor(args.speed, args.direction),
            format,
        ),
        Command::StopMotor(conn) => request::run(&conn, &request::stop_motor(), format),
        Command::Version(args) => version::run(args),
    }
}

/// Flags shared by every command that opens the device.
#[derive(Args, Debug, Clone)]
pub struct ConnectionArgs {
    /// Serial device path. Default: the first port found.
    #[arg(long, short = 'p', env = "SENSORLINK_PORT")]
    pub port: Option<String>,
    /// Line speed.
    #[arg(long, default_value_t = SerialConfig::DEFAULT_BAUD_RATE)]
    pub baud: u32,
    /// Read timeout, also the wait for a reply (e.g. 2s, 500ms).
    #[arg(long, default_value = "1s")]
    pub timeout: String,
}

impl ConnectionArgs {
    pub fn serial_config(&self) -> CliResult<SerialConfig> {
        let port = match &self.port {
            Some(port) => port.clone(),
            None => first_port()?,
        };
        Ok(SerialConfig {
            port,
            baud_rate: self.baud,
            timeout: parse_duration(&self.timeout)?,
            ..SerialConfig::default()
        })
    }

    pub fn connect(&self) -> CliResult<Connection> {
        let config = self.serial_config()?;
        Connection::open(&config).map_err(|err| client_error("connect failed", err))
    }
}

fn first_port() -> CliResult<String> {
    let ports = available_ports().map_err(|err| transport_error("port scan failed", err))?;
    match ports.into_iter().next() {
        Some(port) => {
            info!(port = %port.name, kind = port.kind, "no --port given; using first port found");
            Ok(port.name)
        }
        None => Err(CliError::new(
            USAGE,
            "no serial ports found; pass --port or set SENSORLINK_PORT",
        )),
    }
}

#[derive(Args, Debug, Default)]
pub struct PortsArgs {}

#[derive(Args, Debug)]
pub struct MonitorArgs {
    #[command(flatten)]
    pub conn: ConnectionArgs,
    /// Exit after N telemetry events.
    #[arg(long)]
    pub count: Option<usize>,
    /// Exit after this long (e.g. 30s).
    #[arg(long)]
    pub duration: Option<String>,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    #[command(flatten)]
    pub conn: ConnectionArgs,
    /// Command name, e.g. `get_status`.
    pub command: String,
    /// Parameter as KEY=VALUE; VALUE is parsed as JSON, else taken as a string.
    #[arg(long = "param", value_name = "KEY=VALUE", conflicts_with = "json")]
    pub params: Vec<String>,
    /// All parameters as one JSON object.
    #[arg(long)]
    pub json: Option<String>,
}

#[derive(Args, Debug)]
pub struct LedArgs {
    #[command(flatten)]
    pub conn: ConnectionArgs,
    /// `on` or `off`.
    pub state: LedState,
}

#[derive(Args, Debug)]
pub struct MotorArgs {
    #[command(flatten)]
    pub conn: ConnectionArgs,
    /// Speed, 0-255.
    pub speed: u8,
    /// `forward`, `reverse` or `stop`.
    #[arg(long, short = 'd', default_value = "forward", allow_hyphen_values = true)]
    pub direction: MotorDirection,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Parse `500ms`, `2s` or a bare number of seconds.
pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .trim()
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_durations() {
        assert_eq!(parse_duration("500ms").unwrap(), Duration::from_millis(500));
        assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration(" 3 ").unwrap(), Duration::from_secs(3));
    }

    #[test]
    fn rejects_bad_durations() {
        for input in ["", "0s", "fast", "-1s", "1.5s"] {
            assert_eq!(parse_duration(input).unwrap_err().code, USAGE, "{input}");
        }
    }

    #[test]
    fn explicit_port_skips_scan() {
        let args = ConnectionArgs {
            port: Some("/dev/ttyACM0".into()),
            baud: 9600,
            timeout: "250ms".into(),
        };
        let config = args.serial_config().unwrap();
        assert_eq!(config.port, "/dev/ttyACM0");
        assert_eq!(config.baud_rate, 9600);
        assert_eq!(config.timeout, Duration::from_millis(250));
    }
}
