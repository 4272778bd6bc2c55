//! Error types for the client runtime.

use std::io;
use std::sync::Arc;

use camino::Utf8PathBuf;
use thiserror::Error;

use murmur_engine::{EngineError, ModelRefError};

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("{0}")]
    CliUsage(clap::Error),
    #[error("failed to load configuration: {0}")]
    LoadConfiguration(Arc<ortho_config::OrthoError>),
    #[error("failed to resolve audio path {path}: {source}")]
    AudioPath {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to connect to daemon at {socket}: {source}")]
    Connect {
        socket: Utf8PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to serialise request: {0}")]
    SerialiseRequest(serde_json::Error),
    #[error("failed to send request to daemon: {0}")]
    SendRequest(io::Error),
    #[error("failed to read response from daemon: {0}")]
    ReadResponse(io::Error),
    #[error("daemon closed the connection without a response")]
    MissingResponse,
    #[error("failed to parse daemon response: {0}")]
    ParseResponse(serde_json::Error),
    #[error("failed to write output: {0}")]
    WriteOutput(io::Error),
    #[error("Error: {0}")]
    Model(#[from] ModelRefError),
    #[error("Error: {0}")]
    Engine(#[from] EngineError),
}

/// Determines whether an error means no daemon is listening.
pub(crate) fn is_daemon_not_running(error: &AppError) -> bool {
    match error {
        AppError::Connect { source, .. } => matches!(
            source.kind(),
            io::ErrorKind::ConnectionRefused | io::ErrorKind::NotFound
        ),
        _ => false,
    }
}
