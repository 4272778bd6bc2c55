//! Recognition engine seam and transcript assembly.

use std::io;
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use murmur_daemon_types::NO_SPEECH_DETECTED;
use serde::Deserialize;
use thiserror::Error;

use crate::catalogue::{ModelLocation, ModelRef, WhisperModel};
use crate::store::ModelStore;

/// One recognised span of speech.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Segment {
    /// Start offset in seconds.
    #[serde(default)]
    pub start: f64,
    /// End offset in seconds.
    #[serde(default)]
    pub end: f64,
    /// Recognised text, possibly padded with whitespace.
    pub text: String,
}

impl Segment {
    /// Builds a segment without timing information.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            start: 0.0,
            end: 0.0,
            text: text.into(),
        }
    }
}

/// Errors raised while loading or running a recognition engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A named model has no usable snapshot in the store.
    #[error("model '{model}' is not installed; run: murmurd --download {model}")]
    NotInstalled {
        /// Missing model.
        model: WhisperModel,
    },
    /// An explicit model directory does not exist.
    #[error("model directory '{path}' does not exist")]
    MissingModelPath {
        /// Configured directory.
        path: Utf8PathBuf,
    },
    /// The worker executable could not be found.
    #[error("recognition worker '{command}' not found")]
    WorkerNotFound {
        /// Configured command.
        command: String,
        /// Underlying IO error.
        #[source]
        source: Arc<io::Error>,
    },
    /// The worker process could not be started.
    #[error("failed to start recognition worker '{command}': {source}")]
    Spawn {
        /// Configured command.
        command: String,
        /// Underlying IO error.
        #[source]
        source: Arc<io::Error>,
    },
    /// The worker refused to load the model.
    #[error("recognition worker failed to load '{model}': {message}")]
    Load {
        /// Model label.
        model: String,
        /// Worker-supplied reason.
        message: String,
    },
    /// The worker stream failed.
    #[error("recognition worker IO failed: {0}")]
    Io(#[from] io::Error),
    /// The worker produced a line that is not part of the protocol.
    #[error("recognition worker sent an invalid reply: {message}")]
    Protocol {
        /// Description of the problem.
        message: String,
    },
    /// The worker exited or closed its output.
    #[error("recognition worker exited")]
    WorkerExited,
    /// The worker reported a failure for one request.
    #[error("{0}")]
    Recognition(String),
    /// The requested audio file does not exist.
    #[error("audio file not found: {path}")]
    AudioNotFound {
        /// Requested path.
        path: Utf8PathBuf,
    },
}

/// A loaded recognition model.
///
/// Engines are not thread safe; callers serialise access.
pub trait RecognitionEngine: Send {
    /// Transcribes the audio file at `audio` in `language`.
    fn transcribe(&mut self, audio: &Utf8Path, language: &str) -> Result<Vec<Segment>, EngineError>;
}

/// Builds engines for model directories.
pub trait EngineLoader: Send + Sync {
    /// Loads the model at `location`.
    fn load(&self, location: &ModelLocation) -> Result<Box<dyn RecognitionEngine>, EngineError>;
}

/// Joins segment texts into the transcript returned to clients.
///
/// Each segment is trimmed and blank segments are dropped. The remaining
/// texts are joined by single spaces. An empty result becomes
/// [`NO_SPEECH_DETECTED`].
#[must_use]
pub fn join_segments(segments: &[Segment]) -> String {
    let joined = segments
        .iter()
        .map(|segment| segment.text.trim())
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    if joined.is_empty() {
        String::from(NO_SPEECH_DETECTED)
    } else {
        joined
    }
}

impl ModelRef {
    /// Locates the model directory for this reference.
    pub fn resolve(&self, store: &dyn ModelStore) -> Result<ModelLocation, EngineError> {
        match self {
            Self::Named(model) => store
                .snapshot_path(*model)
                .map(|path| ModelLocation::new(model.name(), path))
                .ok_or(EngineError::NotInstalled { model: *model }),
            Self::Path(path) if path.is_dir() => Ok(ModelLocation::new(path.as_str(), path.clone())),
            Self::Path(path) => Err(EngineError::MissingModelPath { path: path.clone() }),
        }
    }
}
