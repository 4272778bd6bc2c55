//! Thread-per-connection serving with an admission limit.
//!
//! Every admitted connection gets its own thread, so a client blocked on the
//! engine or slow to send its request never delays anyone else. The limit
//! counts live connections; once it is reached new clients are refused at
//! once instead of queueing.

use std::os::unix::net::UnixStream;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use super::{ConnectionHandler, LISTENER_TARGET};

struct GateState {
    handler: Arc<dyn ConnectionHandler>,
    limit: usize,
    active: Mutex<usize>,
    released: Condvar,
    closed: AtomicBool,
    next_id: AtomicU64,
}

impl GateState {
    fn lock_active(&self) -> MutexGuard<'_, usize> {
        self.active
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
    }
}

/// Owner of the admission limit; drains live connections at shutdown.
pub(crate) struct ConnectionGate {
    state: Arc<GateState>,
}

/// Cloneable entry point used by the accept loop.
#[derive(Clone)]
pub(crate) struct Admitter {
    state: Arc<GateState>,
}

/// Occupies one admission slot until dropped.
struct Slot {
    state: Arc<GateState>,
}

impl Drop for Slot {
    fn drop(&mut self) {
        let mut active = self.state.lock_active();
        *active = active.saturating_sub(1);
        drop(active);
        self.state.released.notify_all();
    }
}

impl ConnectionGate {
    /// Admits at most `limit` concurrent connections, each served by `handler`.
    pub(crate) fn new(limit: usize, handler: Arc<dyn ConnectionHandler>) -> Self {
        debug!(target: LISTENER_TARGET, limit, "connection gate ready");
        Self {
            state: Arc::new(GateState {
                handler,
                limit: limit.max(1),
                active: Mutex::new(0),
                released: Condvar::new(),
                closed: AtomicBool::new(false),
                next_id: AtomicU64::new(0),
            }),
        }
    }

    pub(crate) fn admitter(&self) -> Admitter {
        Admitter {
            state: Arc::clone(&self.state),
        }
    }

    /// Stops admitting and waits up to `timeout` for live connections.
    ///
    /// Returns `false` when connections were still running at the deadline;
    /// their threads are left to finish on their own.
    pub(crate) fn drain(self, timeout: Duration) -> bool {
        self.state.closed.store(true, Ordering::SeqCst);
        let deadline = Instant::now() + timeout;
        let mut active = self.state.lock_active();
        while *active > 0 {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                warn!(
                    target: LISTENER_TARGET,
                    busy = *active,
                    "drain timed out; abandoning in-flight connections"
                );
                return false;
            }
            active = match self.state.released.wait_timeout(active, remaining) {
                Ok((guard, _)) => guard,
                Err(poison) => poison.into_inner().0,
            };
        }
        info!(target: LISTENER_TARGET, "connections drained");
        true
    }
}

impl Admitter {
    /// Serves `stream` on its own thread, or refuses it when the gate is full.
    pub(crate) fn submit(&self, stream: UnixStream) {
        if self.state.closed.load(Ordering::SeqCst) {
            debug!(target: LISTENER_TARGET, "gate closed; dropping connection");
            return;
        }
        let Some(slot) = self.reserve() else {
            warn!(
                target: LISTENER_TARGET,
                limit = self.state.limit,
                "connection limit reached; rejecting connection"
            );
            self.state.handler.reject(stream);
            return;
        };

        let id = self.state.next_id.fetch_add(1, Ordering::Relaxed);
        let handler = Arc::clone(&self.state.handler);
        let spawned = thread::Builder::new()
            .name(format!("murmurd-conn-{id}"))
            .spawn(move || {
                let _slot = slot;
                if panic::catch_unwind(AssertUnwindSafe(|| handler.handle(stream))).is_err() {
                    warn!(target: LISTENER_TARGET, "connection handler panicked");
                }
            });
        if let Err(error) = spawned {
            warn!(target: LISTENER_TARGET, %error, "failed to spawn connection thread");
        }
    }

    fn reserve(&self) -> Option<Slot> {
        let mut active = self.state.lock_active();
        if *active >= self.state.limit {
            return None;
        }
        *active += 1;
        Some(Slot {
            state: Arc::clone(&self.state),
        })
    }
}
