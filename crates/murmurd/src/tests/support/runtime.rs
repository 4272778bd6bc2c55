//! Runs the full launch sequence on a background thread against a scratch
//! directory.

use std::io::{BufRead, BufReader, Write};
use std::net::Shutdown;
use std::os::unix::net::UnixStream;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use camino::{Utf8Path, Utf8PathBuf};
use tempfile::TempDir;

use murmur_config::{Config, LogFormat};
use murmur_daemon_types::{ClientRequest, DaemonResponse};

use crate::bootstrap::StaticConfigLoader;
use crate::health::HealthReporter;
use crate::process::launch::{LaunchPlan, ProcessControl, ServiceDeps, run_daemon_with};
use crate::process::shutdown::{ShutdownContext, ShutdownError, ShutdownSignal};
use crate::process::{LaunchError, ShutdownReason};

use super::engine::{FakeStore, ScriptedLoader, TestModelServices};
use super::reporter::RecordingHealthReporter;

const READY_TIMEOUT: Duration = Duration::from_secs(5);
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Signal source that never fires; scenarios trigger shutdown directly.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct NoopSignals;

impl ShutdownSignal for NoopSignals {
    fn install(&self, _shutdown: &ShutdownContext) -> Result<(), ShutdownError> {
        Ok(())
    }
}

/// Scratch directory, configuration and fakes for one scenario.
pub(crate) struct TestRuntime {
    _dir: TempDir,
    root: Utf8PathBuf,
    pub(crate) services: TestModelServices,
    pub(crate) reporter: Arc<RecordingHealthReporter>,
}

impl TestRuntime {
    pub(crate) fn new() -> Self {
        let dir = tempfile::tempdir().expect("temp dir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf8 temp dir");
        let store = Arc::new(FakeStore::new(root.join("models")));
        Self {
            _dir: dir,
            services: TestModelServices {
                store,
                loader: Arc::new(ScriptedLoader::default()),
            },
            reporter: Arc::new(RecordingHealthReporter::default()),
            root,
        }
    }

    pub(crate) fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub(crate) fn config(&self) -> Config {
        Config {
            socket_path: self.socket_path(),
            model: String::from("tiny"),
            language: String::from("en"),
            model_cache: self.root.join("models"),
            max_connections: 16,
            read_timeout_secs: 5,
            drain_timeout_secs: 2,
            log_filter: String::from("warn"),
            log_format: LogFormat::Compact,
            ..Config::default()
        }
    }

    pub(crate) fn socket_path(&self) -> Utf8PathBuf {
        self.root.join("run").join("daemon.sock")
    }

    pub(crate) fn pid_path(&self) -> Utf8PathBuf {
        self.config().pid_path()
    }

    /// Launches the daemon with `config` on a background thread.
    pub(crate) fn launch(&self, config: Config) -> DaemonRun {
        let shutdown = ShutdownContext::new();
        let plan = LaunchPlan {
            process: ProcessControl {
                signals: NoopSignals,
                shutdown: shutdown.clone(),
            },
            services: ServiceDeps {
                loader: StaticConfigLoader::new(config),
                reporter: Arc::clone(&self.reporter) as Arc<dyn HealthReporter>,
                models: self.services.clone(),
            },
        };
        let handle = thread::spawn(move || run_daemon_with(plan));
        DaemonRun {
            socket: self.socket_path(),
            shutdown,
            handle: Some(handle),
        }
    }
}

/// A daemon running on a background thread.
pub(crate) struct DaemonRun {
    socket: Utf8PathBuf,
    shutdown: ShutdownContext,
    handle: Option<thread::JoinHandle<Result<(), LaunchError>>>,
}

impl DaemonRun {
    /// Waits until the daemon answers a ping, or the run ends early.
    ///
    /// A bare connect is not enough: the socket accepts into its backlog
    /// before the pid record is written and the accept loop starts.
    pub(crate) fn wait_until_ready(&self) -> Result<(), String> {
        let deadline = Instant::now() + READY_TIMEOUT;
        while Instant::now() < deadline {
            if exchange(&self.socket, &ClientRequest::ping()).is_ok() {
                return Ok(());
            }
            if self.handle.as_ref().is_some_and(thread::JoinHandle::is_finished) {
                return Err(String::from("daemon exited before becoming ready"));
            }
            thread::sleep(POLL_INTERVAL);
        }
        Err(String::from("daemon did not become ready"))
    }

    pub(crate) fn socket(&self) -> &Utf8Path {
        &self.socket
    }

    /// Triggers shutdown as a signal would.
    pub(crate) fn signal(&self, signal: i32) {
        self.shutdown.trigger(ShutdownReason::Signal(signal));
    }

    /// Waits for the launch sequence to return.
    pub(crate) fn join(&mut self) -> Result<Result<(), LaunchError>, String> {
        let handle = self
            .handle
            .take()
            .ok_or_else(|| String::from("daemon already joined"))?;
        handle
            .join()
            .map_err(|_| String::from("daemon thread panicked"))
    }
}

impl Drop for DaemonRun {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.shutdown.trigger(ShutdownReason::Request);
            let _ = handle.join();
        }
    }
}

/// Sends one request line and reads one response line.
pub(crate) fn exchange(socket: &Utf8Path, request: &ClientRequest) -> Result<DaemonResponse, String> {
    let mut stream = UnixStream::connect(socket).map_err(|error| error.to_string())?;
    stream
        .set_read_timeout(Some(READY_TIMEOUT))
        .map_err(|error| error.to_string())?;
    let mut line = serde_json::to_string(request).map_err(|error| error.to_string())?;
    line.push('\n');
    stream
        .write_all(line.as_bytes())
        .map_err(|error| error.to_string())?;
    stream
        .shutdown(Shutdown::Write)
        .map_err(|error| error.to_string())?;

    let mut reply = String::new();
    BufReader::new(stream)
        .read_line(&mut reply)
        .map_err(|error| error.to_string())?;
    serde_json::from_str(&reply).map_err(|error| format!("{error}: {reply:?}"))
}
