//! Shutdown coordination shared by signals, the `shutdown` command and the
//! launch sequence.

use std::fmt;
use std::io;
use std::sync::{Arc, Condvar, Mutex};
use std::thread;

use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGQUIT, SIGTERM};
use signal_hook::iterator::Signals;
use thiserror::Error;
use tracing::info;

use super::PROCESS_TARGET;

/// What asked the daemon to stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// A termination signal arrived.
    Signal(i32),
    /// A client sent the `shutdown` command.
    Request,
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Signal(signal) => write!(formatter, "signal {signal}"),
            Self::Request => formatter.write_str("client request"),
        }
    }
}

#[derive(Debug, Default)]
struct ShutdownState {
    reason: Mutex<Option<ShutdownReason>>,
    triggered: Condvar,
}

/// One-shot shutdown latch.
///
/// Clones share the latch. The first trigger wins and later triggers are
/// ignored.
#[derive(Debug, Clone, Default)]
pub struct ShutdownContext {
    inner: Arc<ShutdownState>,
}

impl ShutdownContext {
    /// Creates an untriggered context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests shutdown. Returns `true` for the first trigger only.
    pub fn trigger(&self, reason: ShutdownReason) -> bool {
        let mut current = self
            .inner
            .reason
            .lock()
            .unwrap_or_else(|poison| poison.into_inner());
        if current.is_some() {
            return false;
        }
        *current = Some(reason);
        self.inner.triggered.notify_all();
        true
    }

    /// Whether shutdown has been requested.
    #[must_use]
    pub fn is_triggered(&self) -> bool {
        self.inner
            .reason
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
            .is_some()
    }

    /// Blocks until shutdown is requested and returns the winning reason.
    pub fn wait(&self) -> ShutdownReason {
        let mut current = self
            .inner
            .reason
            .lock()
            .unwrap_or_else(|poison| poison.into_inner());
        loop {
            if let Some(reason) = *current {
                return reason;
            }
            current = self
                .inner
                .triggered
                .wait(current)
                .unwrap_or_else(|poison| poison.into_inner());
        }
    }
}

/// Source of external shutdown requests.
pub trait ShutdownSignal: Send + Sync {
    /// Starts forwarding requests into `shutdown`. Must not block.
    fn install(&self, shutdown: &ShutdownContext) -> Result<(), ShutdownError>;
}

/// Errors reported by shutdown signal listeners.
#[derive(Debug, Error)]
pub enum ShutdownError {
    /// Installing signal handlers failed.
    #[error("failed to install signal handlers: {source}")]
    Install {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// Forwards SIGTERM, SIGINT, SIGQUIT and SIGHUP into the shutdown context.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemShutdownSignal;

impl ShutdownSignal for SystemShutdownSignal {
    fn install(&self, shutdown: &ShutdownContext) -> Result<(), ShutdownError> {
        let mut signals = Signals::new([SIGTERM, SIGINT, SIGQUIT, SIGHUP])
            .map_err(|source| ShutdownError::Install { source })?;
        let shutdown = shutdown.clone();
        thread::Builder::new()
            .name(String::from("murmurd-signals"))
            .spawn(move || {
                for signal in signals.forever() {
                    let first = shutdown.trigger(ShutdownReason::Signal(signal));
                    info!(
                        target: PROCESS_TARGET,
                        signal,
                        first,
                        "shutdown signal received"
                    );
                }
            })
            .map_err(|source| ShutdownError::Install { source })?;
        Ok(())
    }
}
