//! Shared configuration for the murmur transcription daemon and client.
//!
//! Values are layered by `ortho_config`: built-in defaults, then an optional
//! configuration file (`--config-path` or `MURMUR_CONFIG_PATH`), then
//! `MURMUR_*` environment variables, then command-line flags.

mod arguments;
mod defaults;
mod logging;

use std::fs::DirBuilder;
use std::io;
use std::time::Duration;

use camino::Utf8PathBuf;
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use arguments::{ArgumentPartition, CONFIG_CLI_FLAGS, partition_config_arguments};
pub use defaults::{
    DEFAULT_DRAIN_TIMEOUT_SECS, DEFAULT_ENGINE_COMMAND, DEFAULT_ENGINE_COMPUTE_TYPE,
    DEFAULT_ENGINE_DEVICE, DEFAULT_LANGUAGE, DEFAULT_LOG_FILTER, DEFAULT_MAX_CONNECTIONS,
    DEFAULT_MODEL, DEFAULT_READ_TIMEOUT_SECS, default_drain_timeout_secs, default_engine_command,
    default_engine_compute_type, default_engine_device, default_language, default_log_filter,
    default_log_filter_string, default_log_format, default_max_connections, default_model,
    default_model_cache, default_read_timeout_secs, default_socket_path,
};
pub use logging::{LogFormat, LogFormatParseError};

/// Runtime configuration shared by `murmurd` and `murmur`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "MURMUR")]
pub struct Config {
    /// Unix socket the daemon listens on.
    #[serde(default = "default_socket_path")]
    pub socket_path: Utf8PathBuf,
    /// Supported model name or path to a model directory.
    #[serde(default = "default_model")]
    pub model: String,
    /// Language used when a request does not carry one.
    #[serde(default = "default_language")]
    pub language: String,
    /// Hugging Face hub cache holding downloaded models.
    #[serde(default = "default_model_cache")]
    pub model_cache: Utf8PathBuf,
    /// Executable hosting the resident recognition worker.
    #[serde(default = "default_engine_command")]
    pub engine_command: String,
    /// Device passed to the recognition worker.
    #[serde(default = "default_engine_device")]
    pub engine_device: String,
    /// Compute type passed to the recognition worker.
    #[serde(default = "default_engine_compute_type")]
    pub engine_compute_type: String,
    /// Connections served at once; further clients are told the daemon is busy.
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    /// Seconds allowed for a client to send its request line.
    #[serde(default = "default_read_timeout_secs")]
    pub read_timeout_secs: u64,
    /// Seconds granted to in-flight requests during shutdown.
    #[serde(default = "default_drain_timeout_secs")]
    pub drain_timeout_secs: u64,
    /// `tracing` filter expression.
    #[serde(default = "default_log_filter_string")]
    pub log_filter: String,
    /// Log output format.
    #[serde(default = "default_log_format")]
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            socket_path: default_socket_path(),
            model: default_model(),
            language: default_language(),
            model_cache: default_model_cache(),
            engine_command: default_engine_command(),
            engine_device: default_engine_device(),
            engine_compute_type: default_engine_compute_type(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            read_timeout_secs: DEFAULT_READ_TIMEOUT_SECS,
            drain_timeout_secs: DEFAULT_DRAIN_TIMEOUT_SECS,
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
        }
    }
}

/// Errors raised while preparing the socket directory.
#[derive(Debug, Error)]
pub enum SocketPreparationError {
    /// The socket path has no parent directory.
    #[error("socket path '{path}' has no parent directory")]
    MissingParent {
        /// Offending socket path.
        path: Utf8PathBuf,
    },
    /// Creating the parent directory failed.
    #[error("failed to create socket directory '{path}': {source}")]
    CreateDirectory {
        /// Directory that could not be created.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

impl Config {
    /// Socket the daemon listens on.
    #[must_use]
    pub fn socket_path(&self) -> &Utf8PathBuf {
        &self.socket_path
    }

    /// Pid record sitting next to the socket (`<socket>.pid`).
    #[must_use]
    pub fn pid_path(&self) -> Utf8PathBuf {
        Utf8PathBuf::from(format!("{}.pid", self.socket_path))
    }

    /// Model reference exactly as configured.
    #[must_use]
    pub fn model(&self) -> &str {
        self.model.trim()
    }

    /// Default recognition language.
    #[must_use]
    pub fn language(&self) -> &str {
        self.language.trim()
    }

    /// Hub cache directory.
    #[must_use]
    pub fn model_cache(&self) -> &Utf8PathBuf {
        &self.model_cache
    }

    /// Admission limit for live connections, at least one.
    #[must_use]
    pub fn max_connections(&self) -> usize {
        self.max_connections.max(1)
    }

    /// Request read timeout; zero disables it.
    #[must_use]
    pub fn read_timeout(&self) -> Option<Duration> {
        (self.read_timeout_secs > 0).then(|| Duration::from_secs(self.read_timeout_secs))
    }

    /// Budget for draining in-flight connections at shutdown.
    #[must_use]
    pub fn drain_timeout(&self) -> Duration {
        Duration::from_secs(self.drain_timeout_secs)
    }

    /// Filter expression for the telemetry subscriber.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Output format for the telemetry subscriber.
    #[must_use]
    pub fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Ensures the socket's parent directory exists.
    ///
    /// The directory keeps the process umask so that other local users can
    /// reach the world-connectable socket inside it.
    pub fn prepare_socket_directory(&self) -> Result<(), SocketPreparationError> {
        let Some(parent) = self.socket_path.parent() else {
            return Err(SocketPreparationError::MissingParent {
                path: self.socket_path.clone(),
            });
        };
        if parent.as_str().is_empty() {
            return Ok(());
        }

        let mut builder = DirBuilder::new();
        builder.recursive(true);
        if let Err(source) = builder.create(parent.as_std_path())
            && source.kind() != io::ErrorKind::AlreadyExists
        {
            return Err(SocketPreparationError::CreateDirectory {
                path: parent.to_path_buf(),
                source,
            });
        }
        Ok(())
    }
}
