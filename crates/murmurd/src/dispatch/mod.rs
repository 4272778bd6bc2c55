//! Newline-delimited JSON dispatch for daemon commands.
//!
//! Clients send a single request line:
//!
//! ```json
//! {"command":"transcribe","audio_path":"/tmp/a.wav","language":"en"}
//! ```
//!
//! and receive a single response line carrying one of `text`, `status`,
//! `models` or `error`:
//!
//! ```json
//! {"text":"hello world"}
//! ```
//!
//! The dispatcher plugs into the transport through [`ConnectionHandler`]
//! (see [`crate::transport`]).
//!
//! [`ConnectionHandler`]: crate::transport::ConnectionHandler

mod errors;
mod handler;
mod request;
mod response;
mod router;

pub(crate) use self::errors::DispatchError;
pub(crate) use self::handler::DispatchConnectionHandler;
