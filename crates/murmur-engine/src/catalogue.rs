//! Supported model names and model references.

use std::fmt;
use std::str::FromStr;

use camino::Utf8PathBuf;
use strum::{Display, EnumString, IntoStaticStr};
use thiserror::Error;

const REPOSITORY_OWNER: &str = "Systran";
const REPOSITORY_PREFIX: &str = "faster-whisper-";

/// The fixed set of models the daemon can list, download and load by name.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, EnumString, Display, IntoStaticStr,
)]
pub enum WhisperModel {
    /// Fastest, roughly 75 MB.
    #[strum(serialize = "tiny")]
    Tiny,
    /// Roughly 140 MB.
    #[strum(serialize = "base")]
    Base,
    /// Roughly 460 MB.
    #[strum(serialize = "small")]
    Small,
    /// Roughly 1.5 GB.
    #[strum(serialize = "medium")]
    Medium,
    /// Roughly 3 GB.
    #[strum(serialize = "large-v2")]
    LargeV2,
    /// Most accurate, roughly 3 GB.
    #[strum(serialize = "large-v3")]
    LargeV3,
}

impl WhisperModel {
    /// Every supported model in listing order.
    pub const ALL: [Self; 6] = [
        Self::Tiny,
        Self::Base,
        Self::Small,
        Self::Medium,
        Self::LargeV2,
        Self::LargeV3,
    ];

    /// Symbolic name, for example `large-v3`.
    #[must_use]
    pub fn name(self) -> &'static str {
        self.into()
    }

    /// Remote repository, for example `Systran/faster-whisper-small`.
    #[must_use]
    pub fn repo_id(self) -> String {
        format!("{REPOSITORY_OWNER}/{REPOSITORY_PREFIX}{}", self.name())
    }

    /// Directory name inside the hub cache.
    #[must_use]
    pub fn cache_dir_name(self) -> String {
        format!("models--{REPOSITORY_OWNER}--{REPOSITORY_PREFIX}{}", self.name())
    }

    /// Looks up a supported model by its exact symbolic name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        name.parse().ok()
    }

    /// Comma-separated list of supported names for diagnostics.
    #[must_use]
    pub fn supported_names() -> String {
        Self::ALL
            .iter()
            .map(|model| model.name())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Errors raised while parsing a model reference.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelRefError {
    /// The reference was blank.
    #[error("model reference is empty")]
    Empty,
    /// The reference is neither a supported name nor a path.
    #[error("unknown model '{name}' (available: {available})")]
    Unknown {
        /// Rejected reference.
        name: String,
        /// Supported names.
        available: String,
    },
}

/// How the daemon was asked to find its model.
///
/// A reference is a path only when it looks like one (contains a separator,
/// or starts with `.` or `~`). Bare words must be supported names; an
/// unknown bare word is an error, never a relative path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelRef {
    /// A supported model resolved through the hub cache.
    Named(WhisperModel),
    /// An explicit model directory.
    Path(Utf8PathBuf),
}

impl ModelRef {
    /// Parses a configured model reference.
    pub fn parse(input: &str) -> Result<Self, ModelRefError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ModelRefError::Empty);
        }
        if looks_like_path(trimmed) {
            return Ok(Self::Path(expand_home(trimmed)));
        }
        WhisperModel::from_name(trimmed)
            .map(Self::Named)
            .ok_or_else(|| ModelRefError::Unknown {
                name: trimmed.to_owned(),
                available: WhisperModel::supported_names(),
            })
    }
}

impl FromStr for ModelRef {
    type Err = ModelRefError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        Self::parse(input)
    }
}

impl fmt::Display for ModelRef {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(model) => formatter.write_str(model.name()),
            Self::Path(path) => write!(formatter, "{path}"),
        }
    }
}

fn looks_like_path(input: &str) -> bool {
    input.contains('/') || input.contains(std::path::MAIN_SEPARATOR) || input.starts_with(['.', '~'])
}

fn expand_home(input: &str) -> Utf8PathBuf {
    let Some(rest) = input.strip_prefix('~') else {
        return Utf8PathBuf::from(input);
    };
    let home = dirs::home_dir().and_then(|path| Utf8PathBuf::from_path_buf(path).ok());
    match home {
        Some(home) => home.join(rest.trim_start_matches('/')),
        None => Utf8PathBuf::from(input),
    }
}

/// A model directory ready to be handed to an [`crate::EngineLoader`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelLocation {
    label: String,
    directory: Utf8PathBuf,
}

impl ModelLocation {
    /// Builds a location from a display label and a directory.
    #[must_use]
    pub fn new(label: impl Into<String>, directory: impl Into<Utf8PathBuf>) -> Self {
        Self {
            label: label.into(),
            directory: directory.into(),
        }
    }

    /// Name used in logs and diagnostics.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Directory holding the model files.
    #[must_use]
    pub fn directory(&self) -> &Utf8PathBuf {
        &self.directory
    }
}
