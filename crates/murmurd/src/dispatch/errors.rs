//! Error types for request dispatch failures.
//!
//! Every variant is reported to the client as `{"error": "<display>"}`, so
//! the display strings are part of the wire protocol.

use std::io;

use thiserror::Error;

use murmur_engine::{EngineError, StoreError};

use crate::transport::FrameError;

/// Errors surfaced during request parsing and dispatch.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Request line is not a JSON object with a `command` field.
    #[error("malformed request: {message}")]
    MalformedRequest {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    /// Request exceeds the maximum allowed size.
    #[error("request too large: {size} bytes exceeds {max_size} byte limit")]
    RequestTooLarge { size: usize, max_size: usize },

    /// The client sent no complete request line within the read timeout.
    #[error("timed out waiting for request")]
    ReadTimeout,

    /// IO error during read or write.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Response serialization failed.
    #[error("failed to serialize response: {0}")]
    SerializeResponse(#[from] serde_json::Error),

    /// Command field contains an unrecognised value.
    #[error("Unknown command: {command}")]
    UnknownCommand { command: String },

    /// A required parameter was absent or not a string.
    #[error("missing required parameter '{name}'")]
    MissingParameter { name: &'static str },

    /// A download named a model outside the supported set.
    #[error("Unknown model: {model}")]
    UnknownModel { model: String },

    /// The engine has been unloaded.
    #[error("Model not loaded")]
    ModelNotLoaded,

    /// The engine failed to transcribe.
    #[error("{0}")]
    Engine(#[from] EngineError),

    /// The model store failed to fetch a model.
    #[error("{0}")]
    Store(#[from] StoreError),

    /// The admission limit had no room for the connection.
    #[error("daemon busy")]
    Busy,

    /// Internal error (e.g., lock poisoned).
    #[error("internal error: {message}")]
    Internal { message: String },
}

impl DispatchError {
    /// Creates a malformed request error from a serde error.
    pub fn from_json_error(source: serde_json::Error) -> Self {
        Self::MalformedRequest {
            message: source.to_string(),
            source: Some(source),
        }
    }

    /// Creates a malformed request error with a custom message.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedRequest {
            message: message.into(),
            source: None,
        }
    }

    /// Creates an unknown command error.
    pub fn unknown_command(command: impl Into<String>) -> Self {
        Self::UnknownCommand {
            command: command.into(),
        }
    }

    /// Creates an unknown model error.
    pub fn unknown_model(model: impl Into<String>) -> Self {
        Self::UnknownModel {
            model: model.into(),
        }
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

impl From<FrameError> for DispatchError {
    fn from(error: FrameError) -> Self {
        match error {
            FrameError::TooLarge { size, max_size } => Self::RequestTooLarge { size, max_size },
            FrameError::Io(source)
                if matches!(
                    source.kind(),
                    io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
                ) =>
            {
                Self::ReadTimeout
            }
            FrameError::Io(source) => Self::Io(source),
        }
    }
}
