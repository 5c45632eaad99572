use std::io::Write;
use std::time::Duration;

use serialport::{DataBits, FlowControl, Parity, SerialPort, SerialPortType, StopBits};
use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::reader::{LineReader, DEFAULT_MAX_LINE_LEN};
use crate::traits::Transport;

/// Connection parameters for a serial device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialConfig {
    /// Device path (`/dev/ttyUSB0`, `/dev/ttyACM0`, `COM3`, ...).
    pub port: String,
    /// Line speed. Default: 115200, matching the reference firmware.
    pub baud_rate: u32,
    /// Read timeout for a single line. Default: 1 s.
    pub timeout: Duration,
    /// Longest accepted line in bytes.
    pub max_line_len: usize,
}

impl SerialConfig {
    pub const DEFAULT_PORT: &'static str = "/dev/ttyUSB0";
    pub const DEFAULT_BAUD_RATE: u32 = 115_200;
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);

    /// Default settings for the given device path.
    pub fn new(port: impl Into<String>) -> Self {
        Self {
            port: port.into(),
            ..Self::default()
        }
    }
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: Self::DEFAULT_PORT.to_string(),
            baud_rate: Self::DEFAULT_BAUD_RATE,
            timeout: Self::DEFAULT_TIMEOUT,
            max_line_len: DEFAULT_MAX_LINE_LEN,
        }
    }
}

/// A serial port speaking newline-delimited text, 8N1, no flow control.
pub struct SerialTransport {
    reader: Option<LineReader<Box<dyn SerialPort>>>,
    name: String,
    timeout: Duration,
}

impl SerialTransport {
    /// Open the port described by `config`.
    pub fn open(config: &SerialConfig) -> Result<Self> {
        let port = serialport::new(&config.port, config.baud_rate)
            .timeout(config.timeout)
            .data_bits(DataBits::Eight)
            .stop_bits(StopBits::One)
            .parity(Parity::None)
            .flow_control(FlowControl::None)
            .open()
            .map_err(|source| TransportError::Open {
                port: config.port.clone(),
                source,
            })?;

        info!(port = %config.port, baud = config.baud_rate, "opened serial port");

        Ok(Self {
            reader: Some(LineReader::with_max_line_len(port, config.max_line_len)),
            name: config.port.clone(),
            timeout: config.timeout,
        })
    }

    fn reader(&mut self) -> Result<&mut LineReader<Box<dyn SerialPort>>> {
        self.reader.as_mut().ok_or(TransportError::Closed)
    }
}

impl Transport for SerialTransport {
    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        let port = self.reader()?.get_mut();
        port.write_all(bytes)?;
        port.flush()?;
        Ok(())
    }

    fn read_line(&mut self) -> Result<Option<String>> {
        self.reader()?.read_line()
    }

    fn bytes_available(&mut self) -> Result<bool> {
        let reader = self.reader()?;
        if reader.buffered() > 0 {
            return Ok(true);
        }
        Ok(reader.get_ref().bytes_to_read()? > 0)
    }

    fn line_ready(&mut self) -> Result<bool> {
        let reader = self.reader()?;
        if !reader.has_line() {
            let available = reader.get_ref().bytes_to_read()? as usize;
            reader.fill_available(available)?;
        }
        Ok(reader.has_line())
    }

    fn close(&mut self) -> Result<()> {
        // The descriptor is released when the port is dropped.
        if self.reader.take().is_some() {
            debug!(port = %self.name, "serial port released");
        }
        Ok(())
    }

    fn read_timeout(&self) -> Duration {
        self.timeout
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Debug for SerialTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialTransport")
            .field("port", &self.name)
            .field("open", &self.reader.is_some())
            .finish()
    }
}

/// A serial port present on this host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortInfo {
    /// Device path to pass to [`SerialConfig::new`].
    pub name: String,
    /// `usb`, `pci`, `bluetooth` or `unknown`.
    pub kind: &'static str,
    /// Product/manufacturer string reported by USB adapters.
    pub description: Option<String>,
}

/// List the serial ports present on this host.
///
/// Selection is left to the caller; sensorlink never opens a port to identify it.
pub fn available_ports() -> Result<Vec<PortInfo>> {
    let ports = serialport::available_ports().map_err(TransportError::Enumerate)?;
    Ok(ports
        .into_iter()
        .map(|port| {
            let (kind, description) = match port.port_type {
                SerialPortType::UsbPort(usb) => ("usb", usb.product.or(usb.manufacturer)),
                SerialPortType::PciPort => ("pci", None),
                SerialPortType::BluetoothPort => ("bluetooth", None),
                SerialPortType::Unknown => ("unknown", None),
            };
            PortInfo {
                name: port.port_name,
                kind,
                description,
            }
        })
        .collect())
}
