//! Unix socket transport for the daemon.
//!
//! The listener accepts connections on a background thread and serves each
//! one on a thread of its own. Connections beyond the admission limit are
//! rejected straight away.

mod admission;
mod errors;
mod framing;
mod handler;
mod listener;

pub(crate) use self::admission::{Admitter, ConnectionGate};
pub(crate) use self::errors::ListenerError;
pub(crate) use self::framing::{FrameError, MAX_REQUEST_BYTES, read_request_line};
pub(crate) use self::handler::ConnectionHandler;
pub(crate) use self::listener::{ListenerHandle, SocketListener};

const LISTENER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::transport");
