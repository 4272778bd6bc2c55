//! Speech recognition engine and local model store for murmur.
//!
//! The [`ModelStore`] answers which supported models are installed and
//! fetches missing ones. An [`EngineLoader`] turns a resolved model directory
//! into a resident [`RecognitionEngine`]; the production loader runs the
//! model inside a long-lived worker process so it is loaded exactly once.

mod catalogue;
mod engine;
mod store;
mod worker;

pub use catalogue::{ModelLocation, ModelRef, ModelRefError, WhisperModel};
pub use engine::{EngineError, EngineLoader, RecognitionEngine, Segment, join_segments};
pub use store::{HfCacheStore, HubFetcher, ModelStore, SnapshotFetcher, StoreError};
pub use worker::{WorkerEngine, WorkerLoader, WorkerSettings};
