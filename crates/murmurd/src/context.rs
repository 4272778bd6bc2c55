//! Shared state handed to every connection.

use std::sync::{Arc, Condvar, Mutex, MutexGuard};

use murmur_engine::{ModelStore, RecognitionEngine};

use crate::dispatch::DispatchError;
use crate::process::shutdown::ShutdownContext;

/// State shared by every connection for the lifetime of one daemon run.
pub struct DaemonContext {
    default_language: String,
    engine: EngineGuard,
    store: Arc<dyn ModelStore>,
    shutdown: ShutdownContext,
}

impl DaemonContext {
    /// Builds a context around a loaded engine.
    pub fn new(
        engine: Box<dyn RecognitionEngine>,
        store: Arc<dyn ModelStore>,
        default_language: impl Into<String>,
        shutdown: ShutdownContext,
    ) -> Self {
        Self {
            default_language: default_language.into(),
            engine: EngineGuard::new(engine),
            store,
            shutdown,
        }
    }

    /// Language used when a request carries none.
    pub fn default_language(&self) -> &str {
        &self.default_language
    }

    /// Exclusive, FIFO-ordered access to the engine.
    pub fn engine(&self) -> &EngineGuard {
        &self.engine
    }

    /// Local model store.
    pub fn store(&self) -> &dyn ModelStore {
        self.store.as_ref()
    }

    /// Shutdown latch for the daemon run.
    pub fn shutdown(&self) -> &ShutdownContext {
        &self.shutdown
    }
}

struct EngineSlot {
    engine: Option<Box<dyn RecognitionEngine>>,
    next_ticket: u64,
    now_serving: u64,
}

/// Serialises engine use in arrival order.
///
/// Callers take a ticket and wait for their turn. The engine is moved out of
/// the slot while in use, so the lock is never held across recognition and
/// other connections can still take tickets.
pub struct EngineGuard {
    slot: Mutex<EngineSlot>,
    turn: Condvar,
}

impl EngineGuard {
    fn new(engine: Box<dyn RecognitionEngine>) -> Self {
        Self {
            slot: Mutex::new(EngineSlot {
                engine: Some(engine),
                next_ticket: 0,
                now_serving: 0,
            }),
            turn: Condvar::new(),
        }
    }

    /// Runs `operation` with exclusive use of the engine.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::ModelNotLoaded`] once the engine has been
    /// unloaded, or an internal error when the lock is poisoned.
    pub fn with_engine<T>(
        &self,
        operation: impl FnOnce(&mut dyn RecognitionEngine) -> T,
    ) -> Result<T, DispatchError> {
        let mut turn = self.wait_turn()?;
        let Some(engine) = turn.slot()?.engine.take() else {
            return Err(DispatchError::ModelNotLoaded);
        };
        turn.release_lock();

        let engine = turn.restored.insert(engine);
        Ok(operation(engine.as_mut()))
    }

    /// Drops the engine once every earlier ticket has been served.
    ///
    /// Later callers receive [`DispatchError::ModelNotLoaded`].
    pub fn unload(&self) -> Result<(), DispatchError> {
        let mut turn = self.wait_turn()?;
        let engine = turn.slot()?.engine.take();
        turn.release_lock();
        drop(engine);
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, EngineSlot>, DispatchError> {
        self.slot
            .lock()
            .map_err(|_| DispatchError::internal("engine lock poisoned"))
    }

    fn wait_turn(&self) -> Result<Turn<'_>, DispatchError> {
        let mut slot = self.lock()?;
        let ticket = slot.next_ticket;
        slot.next_ticket += 1;
        while slot.now_serving != ticket {
            slot = self
                .turn
                .wait(slot)
                .map_err(|_| DispatchError::internal("engine lock poisoned"))?;
        }
        Ok(Turn {
            guard: self,
            held: Some(slot),
            restored: None,
        })
    }
}

/// The current holder's turn. Dropping it hands the engine back and wakes
/// the next ticket, even when the operation panicked.
struct Turn<'a> {
    guard: &'a EngineGuard,
    held: Option<MutexGuard<'a, EngineSlot>>,
    restored: Option<Box<dyn RecognitionEngine>>,
}

impl Turn<'_> {
    fn slot(&mut self) -> Result<&mut EngineSlot, DispatchError> {
        self.held
            .as_deref_mut()
            .ok_or_else(|| DispatchError::internal("engine turn lost its lock"))
    }

    fn release_lock(&mut self) {
        self.held = None;
    }
}

impl Drop for Turn<'_> {
    fn drop(&mut self) {
        let mut slot = match self.held.take() {
            Some(slot) => slot,
            None => self
                .guard
                .slot
                .lock()
                .unwrap_or_else(|poison| poison.into_inner()),
        };
        if let Some(engine) = self.restored.take() {
            slot.engine = Some(engine);
        }
        slot.now_serving += 1;
        drop(slot);
        self.guard.turn.notify_all();
    }
}
