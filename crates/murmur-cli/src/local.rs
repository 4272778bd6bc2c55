//! One-shot transcription without a daemon.
//!
//! Resolves the configured model through the local store, loads it in this
//! process, transcribes a single file and drops the engine.

use std::sync::Arc;

use camino::Utf8Path;

use murmur_config::Config;
use murmur_engine::{
    EngineLoader, HfCacheStore, ModelRef, ModelStore, WorkerLoader, WorkerSettings,
    join_segments,
};

use crate::AppError;

/// Supplies the model store and engine loader for local runs.
pub(crate) trait EngineServices {
    fn store(&self, config: &Config) -> Arc<dyn ModelStore>;
    fn engines(&self, config: &Config) -> Arc<dyn EngineLoader>;
}

/// Production services: the Hugging Face cache and the worker process.
pub(crate) struct SystemEngineServices;

impl EngineServices for SystemEngineServices {
    fn store(&self, config: &Config) -> Arc<dyn ModelStore> {
        Arc::new(HfCacheStore::new(config.model_cache().clone()))
    }

    fn engines(&self, config: &Config) -> Arc<dyn EngineLoader> {
        Arc::new(WorkerLoader::new(WorkerSettings::new(
            config.engine_command.clone(),
            config.engine_device.clone(),
            config.engine_compute_type.clone(),
        )))
    }
}

/// Transcribes `audio` with the configured model and language.
pub(crate) fn transcribe_locally(
    config: &Config,
    services: &dyn EngineServices,
    audio: &Utf8Path,
) -> Result<String, AppError> {
    let model = ModelRef::parse(config.model())?;
    let store = services.store(config);
    let location = model.resolve(store.as_ref())?;
    let mut engine = services.engines(config).load(&location)?;
    let segments = engine.transcribe(audio, config.language())?;
    Ok(join_segments(&segments))
}
