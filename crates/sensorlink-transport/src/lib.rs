//! Line-oriented transport to a microcontroller.
//!
//! Provides the duplex byte stream the rest of sensorlink talks through:
//! - [`Transport`], the object-safe seam the client is written against
//! - [`SerialTransport`], the serial-port implementation
//! - [`LineReader`], newline framing over any `Read`
//!
//! This is the lowest layer of sensorlink. Opening and closing the link is
//! driven by [`SerialConfig`]; nothing here interprets line contents.

pub mod error;
pub mod reader;
pub mod serial;
pub mod traits;

pub use error::{Result, TransportError};
pub use reader::{LineReader, DEFAULT_MAX_LINE_LEN};
pub use serial::{available_ports, PortInfo, SerialConfig, SerialTransport};
pub use traits::Transport;
