//! Local model store backed by the Hugging Face hub cache layout.
//!
//! A supported model `name` lives under
//! `<root>/models--Systran--faster-whisper-<name>/snapshots/<revision>/`.
//! A snapshot counts as installed once it holds `model.bin` or
//! `config.json`.

use std::collections::BTreeSet;
use std::fs;
use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::catalogue::WhisperModel;

const STORE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::store");

const SNAPSHOTS_DIR: &str = "snapshots";
const REFS_MAIN: &str = "refs/main";
const MARKER_FILES: [&str; 2] = ["model.bin", "config.json"];

/// Errors raised by model store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The cache root could not be created.
    #[error("failed to create model cache '{path}': {source}")]
    CreateRoot {
        /// Cache root.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The remote fetch failed.
    #[error("failed to download '{repo}': {message}")]
    Fetch {
        /// Remote repository identifier.
        repo: String,
        /// Description of the failure.
        message: String,
    },
    /// The fetch finished but left no usable snapshot behind.
    #[error("download of '{model}' finished without a usable snapshot")]
    Incomplete {
        /// Model that was fetched.
        model: WhisperModel,
    },
}

/// Read and fetch access to locally installed models.
pub trait ModelStore: Send + Sync {
    /// Directory of a usable snapshot for `model`, if one is installed.
    fn snapshot_path(&self, model: WhisperModel) -> Option<Utf8PathBuf>;

    /// Fetches `model` into the store.
    ///
    /// Implementations fetch unconditionally; callers decide whether an
    /// installed model should be skipped.
    fn download(&self, model: WhisperModel) -> Result<(), StoreError>;

    /// Whether a usable snapshot for `model` exists.
    fn is_installed(&self, model: WhisperModel) -> bool {
        self.snapshot_path(model).is_some()
    }

    /// Every supported model with a usable snapshot.
    fn list_installed(&self) -> BTreeSet<WhisperModel> {
        WhisperModel::ALL
            .into_iter()
            .filter(|model| self.is_installed(*model))
            .collect()
    }
}

/// Remote source of model snapshots.
#[cfg_attr(test, mockall::automock)]
pub trait SnapshotFetcher: Send + Sync {
    /// Downloads every file of `repo_id` into the hub cache at `cache_root`.
    fn fetch(&self, repo_id: &str, cache_root: &Utf8Path) -> Result<(), StoreError>;
}

/// Fetches snapshots from the Hugging Face hub.
#[derive(Debug, Clone, Default)]
pub struct HubFetcher {
    token: Option<String>,
}

impl HubFetcher {
    /// Reads an optional access token from `HF_TOKEN`.
    #[must_use]
    pub fn from_env() -> Self {
        let token = std::env::var("HF_TOKEN")
            .ok()
            .filter(|value| !value.trim().is_empty());
        Self { token }
    }
}

impl SnapshotFetcher for HubFetcher {
    fn fetch(&self, repo_id: &str, cache_root: &Utf8Path) -> Result<(), StoreError> {
        let fetch_error = |message: String| StoreError::Fetch {
            repo: repo_id.to_owned(),
            message,
        };

        let api = hf_hub::api::sync::ApiBuilder::new()
            .with_cache_dir(cache_root.as_std_path().to_path_buf())
            .with_token(self.token.clone())
            .with_progress(false)
            .build()
            .map_err(|error| fetch_error(error.to_string()))?;
        let repo = api.model(repo_id.to_owned());
        let listing = repo.info().map_err(|error| fetch_error(error.to_string()))?;

        for sibling in listing.siblings {
            debug!(target: STORE_TARGET, repo = repo_id, file = %sibling.rfilename, "fetching file");
            repo.get(&sibling.rfilename)
                .map_err(|error| fetch_error(format!("{}: {error}", sibling.rfilename)))?;
        }
        Ok(())
    }
}

/// Model store reading the hub cache directory layout.
#[derive(Debug, Clone)]
pub struct HfCacheStore<F = HubFetcher> {
    root: Utf8PathBuf,
    fetcher: F,
}

impl HfCacheStore<HubFetcher> {
    /// Opens the cache at `root`, fetching from the public hub.
    #[must_use]
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self::with_fetcher(root, HubFetcher::from_env())
    }
}

impl<F> HfCacheStore<F> {
    /// Opens the cache at `root` with a custom fetcher.
    #[must_use]
    pub fn with_fetcher(root: impl Into<Utf8PathBuf>, fetcher: F) -> Self {
        Self {
            root: root.into(),
            fetcher,
        }
    }

    /// Cache root directory.
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    fn snapshots_dir(&self, model: WhisperModel) -> Utf8PathBuf {
        self.root.join(model.cache_dir_name()).join(SNAPSHOTS_DIR)
    }

    fn pinned_revision(&self, model: WhisperModel) -> Option<String> {
        let refs = self.root.join(model.cache_dir_name()).join(REFS_MAIN);
        let revision = fs::read_to_string(refs).ok()?;
        let trimmed = revision.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_owned())
    }
}

fn is_complete_snapshot(directory: &Utf8Path) -> bool {
    MARKER_FILES
        .iter()
        .any(|marker| directory.join(marker).is_file())
}

fn sorted_snapshots(directory: &Utf8Path) -> Vec<Utf8PathBuf> {
    let Ok(entries) = directory.read_dir_utf8() else {
        return Vec::new();
    };
    let mut snapshots: Vec<Utf8PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.into_path())
        .filter(|path| path.is_dir())
        .collect();
    snapshots.sort();
    snapshots
}

impl<F: SnapshotFetcher> ModelStore for HfCacheStore<F> {
    fn snapshot_path(&self, model: WhisperModel) -> Option<Utf8PathBuf> {
        let snapshots = self.snapshots_dir(model);
        if let Some(revision) = self.pinned_revision(model) {
            let pinned = snapshots.join(revision);
            if is_complete_snapshot(&pinned) {
                return Some(pinned);
            }
        }
        sorted_snapshots(&snapshots)
            .into_iter()
            .find(|candidate| is_complete_snapshot(candidate))
    }

    fn download(&self, model: WhisperModel) -> Result<(), StoreError> {
        fs::create_dir_all(&self.root).map_err(|source| StoreError::CreateRoot {
            path: self.root.clone(),
            source,
        })?;

        let repo_id = model.repo_id();
        info!(target: STORE_TARGET, model = %model, repo = %repo_id, "downloading model");
        self.fetcher.fetch(&repo_id, &self.root)?;

        if self.is_installed(model) {
            info!(target: STORE_TARGET, model = %model, "model downloaded");
            Ok(())
        } else {
            warn!(target: STORE_TARGET, model = %model, "download left no usable snapshot");
            Err(StoreError::Incomplete { model })
        }
    }
}
