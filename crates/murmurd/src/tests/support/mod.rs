//! Shared fixtures for the daemon behaviour suites.

mod engine;
mod reporter;
mod runtime;

pub(crate) use engine::{EngineProbe, FakeStore, ScriptedLoader, TestModelServices};
pub(crate) use reporter::{HealthEvent, RecordingHealthReporter};
pub(crate) use runtime::{DaemonRun, NoopSignals, TestRuntime, exchange};
