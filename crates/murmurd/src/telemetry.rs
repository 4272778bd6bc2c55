//! Log output for `murmurd`.
//!
//! Everything the daemon logs goes to stderr through one `tracing`
//! subscriber, installed once per process. Events carry the module target
//! so operators can filter by area:
//!
//! - `murmurd::transport`: socket binding, admission and draining
//! - `murmurd::dispatch`: request failures and unreadable requests
//! - `murmurd::process`: pid record, signals and the launch sequence
//! - `murmurd::health`: bootstrap, model load and shutdown milestones
//!
//! Thread names are included, so lines from the accept loop
//! (`murmurd-accept`) and from individual connections (`murmurd-conn-N`)
//! can be told apart. `--log-filter` takes an `EnvFilter` directive such as
//! `info,murmurd::dispatch=debug`.

use std::io::{self, IsTerminal};

use once_cell::sync::OnceCell;
use tracing::{Subscriber, subscriber::SetGlobalDefaultError};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::{self, time::UtcTime};

use murmur_config::{Config, LogFormat};

static INSTALLED: OnceCell<()> = OnceCell::new();

/// Proof that daemon logging is active.
#[derive(Debug, Default, Clone, Copy)]
pub struct TelemetryHandle;

/// Reasons daemon logging could not be set up.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// `log_filter` is not a valid `EnvFilter` directive.
    #[error("invalid log filter: {0}")]
    Filter(String),
    /// Another global subscriber was installed first.
    #[error("failed to install telemetry subscriber: {0}")]
    Subscriber(SetGlobalDefaultError),
}

/// Starts daemon logging with the configured filter and format.
///
/// The filter is validated on every call. Only the first successful call
/// installs a subscriber; in-process daemons started later (as the tests do)
/// share it.
pub fn initialise(config: &Config) -> Result<TelemetryHandle, TelemetryError> {
    let filter = parse_filter(config.log_filter())?;
    INSTALLED.get_or_try_init(|| install(filter, config.log_format()))?;
    Ok(TelemetryHandle)
}

fn parse_filter(directives: &str) -> Result<EnvFilter, TelemetryError> {
    EnvFilter::try_new(directives).map_err(|error| TelemetryError::Filter(error.to_string()))
}

fn install(filter: EnvFilter, format: LogFormat) -> Result<(), TelemetryError> {
    let stderr_is_tty = io::stderr().is_terminal();
    let base = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(true)
        .with_thread_ids(false)
        .with_writer(io::stderr)
        .with_ansi(stderr_is_tty)
        .with_timer(UtcTime::rfc_3339());

    // JSON lines flatten event fields to the top level for log shippers.
    let subscriber: Box<dyn Subscriber + Send + Sync> = match format {
        LogFormat::Json => Box::new(base.json().flatten_event(true).finish()),
        LogFormat::Compact => Box::new(base.compact().finish()),
    };
    tracing::subscriber::set_global_default(subscriber).map_err(TelemetryError::Subscriber)
}
