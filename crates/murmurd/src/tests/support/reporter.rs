//! Test double for [`HealthReporter`] that records lifecycle events.

use std::sync::Mutex;

use camino::Utf8Path;

use murmur_config::Config;
use murmur_engine::EngineError;

use crate::bootstrap::BootstrapError;
use crate::health::HealthReporter;
use crate::process::ShutdownReason;

/// Lifecycle events tracked during scenarios.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum HealthEvent {
    BootstrapStarting,
    BootstrapSucceeded,
    BootstrapFailed(String),
    ModelLoading(String),
    ModelReady(String),
    ModelFailed(String),
    ListenerReady,
    ShutdownRequested(ShutdownReason),
    ShutdownCompleted { drained: bool },
}

/// Records health events for assertions.
#[derive(Debug, Default)]
pub(crate) struct RecordingHealthReporter {
    events: Mutex<Vec<HealthEvent>>,
}

impl RecordingHealthReporter {
    /// Captures a copy of the recorded events.
    pub(crate) fn events(&self) -> Vec<HealthEvent> {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .clone()
    }

    fn record(&self, event: HealthEvent) {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .push(event);
    }
}

impl HealthReporter for RecordingHealthReporter {
    fn bootstrap_starting(&self) {
        self.record(HealthEvent::BootstrapStarting);
    }

    fn bootstrap_succeeded(&self, _config: &Config) {
        self.record(HealthEvent::BootstrapSucceeded);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        self.record(HealthEvent::BootstrapFailed(error.to_string()));
    }

    fn model_loading(&self, model: &str) {
        self.record(HealthEvent::ModelLoading(model.to_owned()));
    }

    fn model_ready(&self, model: &str) {
        self.record(HealthEvent::ModelReady(model.to_owned()));
    }

    fn model_failed(&self, error: &EngineError) {
        self.record(HealthEvent::ModelFailed(error.to_string()));
    }

    fn listener_ready(&self, _socket: &Utf8Path) {
        self.record(HealthEvent::ListenerReady);
    }

    fn shutdown_requested(&self, reason: ShutdownReason) {
        self.record(HealthEvent::ShutdownRequested(reason));
    }

    fn shutdown_completed(&self, drained: bool) {
        self.record(HealthEvent::ShutdownCompleted { drained });
    }
}
