//! Wire types exchanged between `murmurd` and its clients.
//!
//! A connection carries exactly one request line and one response line, each
//! a JSON object terminated by `\n`. Requests are flat objects keyed by
//! `command`, with the command's parameters alongside it:
//!
//! ```json
//! {"command":"transcribe","audio_path":"/tmp/a.wav","language":"en"}
//! ```
//!
//! Every response carries exactly one of `text`, `status`, `models` or
//! `error`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Text returned when the engine produced no segments or only blank ones.
pub const NO_SPEECH_DETECTED: &str = "(no speech detected)";

/// Command names understood by the daemon.
pub mod command {
    /// Transcribes an audio file with the resident engine.
    pub const TRANSCRIBE: &str = "transcribe";
    /// Liveness probe.
    pub const PING: &str = "ping";
    /// Lists supported models with their install state.
    pub const LIST_MODELS: &str = "list_models";
    /// Fetches a supported model into the local store.
    pub const DOWNLOAD_MODEL: &str = "download_model";
    /// Asks the daemon to stop.
    pub const SHUTDOWN: &str = "shutdown";
}

/// A single client request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientRequest {
    /// Command name, for example `transcribe`.
    pub command: String,
    /// Remaining top-level fields of the request object.
    #[serde(flatten)]
    pub params: Map<String, Value>,
}

impl ClientRequest {
    /// Builds a request without parameters.
    #[must_use]
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            params: Map::new(),
        }
    }

    /// Builds a `transcribe` request; `language` falls back to the daemon default.
    #[must_use]
    pub fn transcribe(audio_path: impl Into<String>, language: Option<&str>) -> Self {
        let request = Self::new(command::TRANSCRIBE).with_param("audio_path", audio_path.into());
        match language {
            Some(language) => request.with_param("language", language),
            None => request,
        }
    }

    /// Builds a `ping` request.
    #[must_use]
    pub fn ping() -> Self {
        Self::new(command::PING)
    }

    /// Builds a `list_models` request.
    #[must_use]
    pub fn list_models() -> Self {
        Self::new(command::LIST_MODELS)
    }

    /// Builds a `download_model` request.
    #[must_use]
    pub fn download_model(model: impl Into<String>) -> Self {
        Self::new(command::DOWNLOAD_MODEL).with_param("model", model.into())
    }

    /// Builds a `shutdown` request.
    #[must_use]
    pub fn shutdown() -> Self {
        Self::new(command::SHUTDOWN)
    }

    /// Adds a string parameter.
    #[must_use]
    pub fn with_param(mut self, key: &str, value: impl Into<String>) -> Self {
        self.params
            .insert(key.to_owned(), Value::String(value.into()));
        self
    }

    /// Returns a string parameter, if present and a string.
    #[must_use]
    pub fn param_str(&self, key: &str) -> Option<&str> {
        self.params.get(key).and_then(Value::as_str)
    }
}

/// Outcome reported in `status` responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyStatus {
    /// The command succeeded.
    Ok,
    /// The requested model was already present; nothing was fetched.
    AlreadyInstalled,
    /// The command ran but did not succeed.
    Error,
    /// The daemon accepted a shutdown request.
    ShuttingDown,
}

/// Install state of one supported model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    /// Symbolic model name, for example `small`.
    pub name: String,
    /// Whether the local store holds a usable snapshot.
    pub installed: bool,
}

/// A single daemon response.
///
/// Serialised without a tag, so each variant appears on the wire as a plain
/// object with its single field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DaemonResponse {
    /// Request-level failure.
    Error {
        /// Human-readable reason.
        error: String,
    },
    /// Transcription result.
    Text {
        /// Joined transcript.
        text: String,
    },
    /// Outcome of a control command.
    Status {
        /// Reported outcome.
        status: ReplyStatus,
    },
    /// Supported models with their install state.
    Models {
        /// One descriptor per supported model.
        models: Vec<ModelDescriptor>,
    },
}

impl DaemonResponse {
    /// Builds an error response.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            error: message.into(),
        }
    }

    /// Builds a transcription response.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Builds a status response.
    #[must_use]
    pub const fn status(status: ReplyStatus) -> Self {
        Self::Status { status }
    }

    /// Builds a model listing response.
    #[must_use]
    pub const fn models(models: Vec<ModelDescriptor>) -> Self {
        Self::Models { models }
    }

    /// Returns `true` for error responses.
    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }
}
