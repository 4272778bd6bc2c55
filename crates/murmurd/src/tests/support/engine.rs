//! Scripted engine, loader and model store used in place of real models.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use camino::{Utf8Path, Utf8PathBuf};

use murmur_config::Config;
use murmur_engine::{
    EngineError, EngineLoader, ModelLocation, ModelStore, RecognitionEngine, Segment, StoreError,
    WhisperModel,
};

use crate::process::launch::ModelServices;

const GATE_TIMEOUT: Duration = Duration::from_secs(5);

/// Observes what the scripted engine is doing.
///
/// Audio paths drive the script: names containing `silence` yield no
/// segments, names containing `slow` block until [`EngineProbe::release`],
/// anything else yields `"hello world"`.
#[derive(Debug, Default)]
pub(crate) struct EngineProbe {
    active: AtomicUsize,
    peak: AtomicUsize,
    completed: AtomicUsize,
    slow_started: AtomicBool,
    released: Mutex<bool>,
    gate: Condvar,
    unloaded: AtomicBool,
}

impl EngineProbe {
    /// Highest number of transcriptions observed running at once.
    pub(crate) fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    /// Transcriptions that ran to completion.
    pub(crate) fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    /// Whether a slow transcription has entered the engine.
    pub(crate) fn slow_started(&self) -> bool {
        self.slow_started.load(Ordering::SeqCst)
    }

    /// Whether the engine was dropped.
    pub(crate) fn unloaded(&self) -> bool {
        self.unloaded.load(Ordering::SeqCst)
    }

    /// Lets every slow transcription finish.
    pub(crate) fn release(&self) {
        let mut released = self.released.lock().expect("gate mutex poisoned");
        *released = true;
        self.gate.notify_all();
    }

    fn wait_for_release(&self) {
        let deadline = Instant::now() + GATE_TIMEOUT;
        let mut released = self.released.lock().expect("gate mutex poisoned");
        while !*released && Instant::now() < deadline {
            released = self
                .gate
                .wait_timeout(released, deadline.saturating_duration_since(Instant::now()))
                .expect("gate mutex poisoned")
                .0;
        }
    }
}

struct ScriptedEngine {
    probe: Arc<EngineProbe>,
}

impl RecognitionEngine for ScriptedEngine {
    fn transcribe(&mut self, audio: &Utf8Path, _language: &str) -> Result<Vec<Segment>, EngineError> {
        let running = self.probe.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.probe.peak.fetch_max(running, Ordering::SeqCst);

        let name = audio.as_str();
        if name.contains("slow") {
            self.probe.slow_started.store(true, Ordering::SeqCst);
            self.probe.wait_for_release();
        } else {
            std::thread::sleep(Duration::from_millis(10));
        }
        let segments = if name.contains("silence") {
            Vec::new()
        } else {
            vec![Segment::text(" hello "), Segment::text("world ")]
        };

        self.probe.active.fetch_sub(1, Ordering::SeqCst);
        self.probe.completed.fetch_add(1, Ordering::SeqCst);
        Ok(segments)
    }
}

impl Drop for ScriptedEngine {
    fn drop(&mut self) {
        self.probe.unloaded.store(true, Ordering::SeqCst);
    }
}

/// Loader handing out scripted engines that report to one probe.
#[derive(Debug, Default)]
pub(crate) struct ScriptedLoader {
    probe: Arc<EngineProbe>,
    loaded: Mutex<Vec<Utf8PathBuf>>,
}

impl ScriptedLoader {
    pub(crate) fn probe(&self) -> Arc<EngineProbe> {
        Arc::clone(&self.probe)
    }

    /// Directories passed to [`EngineLoader::load`].
    pub(crate) fn loaded(&self) -> Vec<Utf8PathBuf> {
        self.loaded.lock().expect("loader mutex poisoned").clone()
    }
}

impl EngineLoader for ScriptedLoader {
    fn load(&self, location: &ModelLocation) -> Result<Box<dyn RecognitionEngine>, EngineError> {
        self.loaded
            .lock()
            .expect("loader mutex poisoned")
            .push(location.directory().clone());
        Ok(Box::new(ScriptedEngine {
            probe: Arc::clone(&self.probe),
        }))
    }
}

/// In-memory model store rooted at a scratch directory.
#[derive(Debug)]
pub(crate) struct FakeStore {
    root: Utf8PathBuf,
    installed: Mutex<BTreeSet<WhisperModel>>,
    downloads: Mutex<Vec<WhisperModel>>,
}

impl FakeStore {
    pub(crate) fn new(root: Utf8PathBuf) -> Self {
        Self {
            root,
            installed: Mutex::new(BTreeSet::new()),
            downloads: Mutex::new(Vec::new()),
        }
    }

    /// Marks `model` installed and creates its snapshot directory.
    pub(crate) fn install(&self, model: WhisperModel) {
        std::fs::create_dir_all(self.root.join(model.name())).expect("create snapshot directory");
        self.installed
            .lock()
            .expect("store mutex poisoned")
            .insert(model);
    }

    /// Models passed to [`ModelStore::download`].
    pub(crate) fn downloads(&self) -> Vec<WhisperModel> {
        self.downloads.lock().expect("store mutex poisoned").clone()
    }
}

impl ModelStore for FakeStore {
    fn snapshot_path(&self, model: WhisperModel) -> Option<Utf8PathBuf> {
        self.installed
            .lock()
            .expect("store mutex poisoned")
            .contains(&model)
            .then(|| self.root.join(model.name()))
    }

    fn download(&self, model: WhisperModel) -> Result<(), StoreError> {
        self.downloads
            .lock()
            .expect("store mutex poisoned")
            .push(model);
        self.install(model);
        Ok(())
    }
}

/// Hands the launch sequence the shared fake store and scripted loader.
#[derive(Clone)]
pub(crate) struct TestModelServices {
    pub(crate) store: Arc<FakeStore>,
    pub(crate) loader: Arc<ScriptedLoader>,
}

impl ModelServices for TestModelServices {
    fn store(&self, _config: &Config) -> Arc<dyn ModelStore> {
        self.store.clone()
    }

    fn engines(&self, _config: &Config) -> Arc<dyn EngineLoader> {
        self.loader.clone()
    }
}
