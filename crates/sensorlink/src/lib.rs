//! Host-side serial client for JSON-speaking microcontrollers.
//!
//! sensorlink talks to a device that exchanges newline-delimited JSON over a
//! serial port: commands go out, replies and periodic telemetry come back.
//!
//! # Crate Structure
//!
//! - [`transport`]: serial port and line framing
//! - [`frame`]: JSON codec, commands and telemetry payloads
//! - [`client`]: connection, command channel and telemetry listener (behind
//!   the `client` feature, on by default)
//!
//! ```no_run
//! use sensorlink::client::Connection;
//! use sensorlink::frame::LedState;
//! use sensorlink::transport::SerialConfig;
//!
//! # fn main() -> sensorlink::client::Result<()> {
//! let conn = Connection::open(&SerialConfig::new("/dev/ttyACM0"))?;
//! let _listener = conn.listen_with_presenter()?;
//! let reply = conn.set_led(LedState::On)?;
//! println!("{reply}");
//! # Ok(())
//! # }
//! ```

/// Re-export transport types.
pub mod transport {
    pub use sensorlink_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use sensorlink_frame::*;
}

/// Re-export client types (requires `client` feature).
#[cfg(feature = "client")]
pub mod client {
    pub use sensorlink_client::*;
}
