//! Host-side client for a microcontroller on a serial link.
//!
//! This is the "just works" layer. Open a [`Connection`], issue commands and
//! get their replies, and optionally start a background listener that hands
//! unsolicited telemetry to a [`TelemetryHandler`].
//!
//! The wire protocol has no request ids. At most one command is in flight per
//! connection and its reply is the first frame read after the command was
//! written; a device that interleaves telemetry between a command and its
//! reply cannot be told apart from one that answered early.

pub mod channel;
pub mod config;
pub mod connection;
pub mod error;
pub mod handler;
pub mod listener;
pub mod reply;

#[cfg(test)]
pub(crate) mod testing;

pub use config::ClientConfig;
pub use connection::Connection;
pub use error::{ClientError, Result};
pub use handler::{ChannelHandler, TelemetryHandler, TextPresenter};
pub use listener::ListenerHandle;
pub use reply::Reply;
