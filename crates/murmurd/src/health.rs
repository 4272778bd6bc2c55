//! Structured health reporting for daemon lifecycle events.

use std::sync::Arc;

use camino::Utf8Path;

use murmur_config::Config;
use murmur_engine::EngineError;

use crate::bootstrap::BootstrapError;
use crate::process::shutdown::ShutdownReason;

const HEALTH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::health");

/// Observer trait used to surface lifecycle events to telemetry sinks.
pub trait HealthReporter: Send + Sync {
    /// Invoked before configuration loading begins.
    fn bootstrap_starting(&self);

    /// Invoked after bootstrap completes successfully.
    fn bootstrap_succeeded(&self, config: &Config);

    /// Invoked when bootstrap fails.
    fn bootstrap_failed(&self, error: &BootstrapError);

    /// Invoked before the model is loaded into the engine.
    fn model_loading(&self, model: &str);

    /// Invoked once the engine holds the model.
    fn model_ready(&self, model: &str);

    /// Invoked when the model cannot be resolved or loaded.
    fn model_failed(&self, error: &EngineError);

    /// Invoked when the socket accepts connections.
    fn listener_ready(&self, socket: &Utf8Path);

    /// Invoked when shutdown begins.
    fn shutdown_requested(&self, reason: ShutdownReason);

    /// Invoked after teardown. `drained` is false when in-flight requests
    /// were abandoned at the drain deadline.
    fn shutdown_completed(&self, drained: bool);
}

impl<T> HealthReporter for Arc<T>
where
    T: HealthReporter + ?Sized,
{
    fn bootstrap_starting(&self) {
        (**self).bootstrap_starting();
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        (**self).bootstrap_succeeded(config);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        (**self).bootstrap_failed(error);
    }

    fn model_loading(&self, model: &str) {
        (**self).model_loading(model);
    }

    fn model_ready(&self, model: &str) {
        (**self).model_ready(model);
    }

    fn model_failed(&self, error: &EngineError) {
        (**self).model_failed(error);
    }

    fn listener_ready(&self, socket: &Utf8Path) {
        (**self).listener_ready(socket);
    }

    fn shutdown_requested(&self, reason: ShutdownReason) {
        (**self).shutdown_requested(reason);
    }

    fn shutdown_completed(&self, drained: bool) {
        (**self).shutdown_completed(drained);
    }
}

/// Default reporter that records lifecycle events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredHealthReporter;

impl StructuredHealthReporter {
    /// Builds a new reporter.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl HealthReporter for StructuredHealthReporter {
    fn bootstrap_starting(&self) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_starting",
            "starting daemon bootstrap"
        );
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_succeeded",
            socket = %config.socket_path(),
            model = config.model(),
            language = config.language(),
            max_connections = config.max_connections(),
            log_filter = %config.log_filter(),
            log_format = %config.log_format(),
            "daemon bootstrap completed"
        );
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        tracing::error!(
            target: HEALTH_TARGET,
            event = "bootstrap_failed",
            error = %error,
            "daemon bootstrap failed"
        );
    }

    fn model_loading(&self, model: &str) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "model_loading",
            model,
            "loading model"
        );
    }

    fn model_ready(&self, model: &str) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "model_ready",
            model,
            "model loaded"
        );
    }

    fn model_failed(&self, error: &EngineError) {
        tracing::error!(
            target: HEALTH_TARGET,
            event = "model_failed",
            error = %error,
            "model failed to load"
        );
    }

    fn listener_ready(&self, socket: &Utf8Path) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "listener_ready",
            socket = %socket,
            "daemon ready for connections"
        );
    }

    fn shutdown_requested(&self, reason: ShutdownReason) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "shutdown_requested",
            reason = %reason,
            "shutting down"
        );
    }

    fn shutdown_completed(&self, drained: bool) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "shutdown_completed",
            drained,
            "daemon stopped"
        );
    }
}
