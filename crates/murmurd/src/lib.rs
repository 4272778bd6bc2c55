//! Resident speech recognition daemon for murmur.
//!
//! `murmurd` loads one recognition model at start-up and keeps it resident,
//! serving transcription requests from short-lived clients over a Unix
//! socket. Each connection carries one JSON request line and receives one
//! JSON response line (see [`murmur_daemon_types`]).
//!
//! ## Runtime
//!
//! The accept loop serves every connection on its own thread, up to
//! `max_connections` at once; connections beyond that are answered with
//! `{"error":"daemon busy"}`. Transcriptions share a single engine and are
//! served strictly in arrival order, while `ping`, `list_models`,
//! `download_model` and `shutdown` never wait for the engine.
//!
//! ## Lifecycle
//!
//! Start-up refuses to run when another daemon answers on the socket,
//! removes stale runtime files otherwise, loads the model, binds the socket
//! and records the pid in `<socket>.pid`. A termination signal or the
//! `shutdown` command stops the acceptor, drains in-flight requests within
//! the configured budget and removes both runtime files.

mod bootstrap;
mod cli;
mod context;
mod dispatch;
mod health;
mod process;
mod telemetry;
mod transport;

pub use bootstrap::{
    BootstrapError, Bootstrapped, ConfigLoader, StaticConfigLoader, SystemConfigLoader,
    bootstrap_with,
};
pub use cli::run;
pub use health::{HealthReporter, StructuredHealthReporter};
pub use process::{LaunchError, ShutdownContext, ShutdownReason, run_daemon};
pub use telemetry::{TelemetryError, TelemetryHandle};

#[cfg(test)]
mod tests;
