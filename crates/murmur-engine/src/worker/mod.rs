//! Recognition engine hosted in a resident child process.
//!
//! The worker executable loads the model once at start-up and then answers
//! transcription requests over its standard streams until stdin closes.

mod protocol;

use std::io::{self, BufReader, BufWriter};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use camino::Utf8Path;
use tracing::{debug, info, warn};

use self::protocol::{WorkerReply, WorkerRequest, read_reply, send_request};
use crate::catalogue::ModelLocation;
use crate::engine::{EngineError, EngineLoader, RecognitionEngine, Segment};

const WORKER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::worker");

/// Time a worker gets to exit after its stdin closes.
const EXIT_GRACE: Duration = Duration::from_millis(500);
const EXIT_POLL: Duration = Duration::from_millis(20);

/// How to start the recognition worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerSettings {
    command: String,
    device: String,
    compute_type: String,
}

impl WorkerSettings {
    /// Builds settings from a command line and the model placement options.
    ///
    /// `command` is split on whitespace; the first word is the executable.
    #[must_use]
    pub fn new(
        command: impl Into<String>,
        device: impl Into<String>,
        compute_type: impl Into<String>,
    ) -> Self {
        Self {
            command: command.into(),
            device: device.into(),
            compute_type: compute_type.into(),
        }
    }

    /// Command line used to start the worker.
    #[must_use]
    pub fn command(&self) -> &str {
        &self.command
    }

    fn build_command(&self, location: &ModelLocation) -> Result<Command, EngineError> {
        let mut words = self.command.split_whitespace();
        let Some(program) = words.next() else {
            return Err(EngineError::Spawn {
                command: self.command.clone(),
                source: Arc::new(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "worker command is empty",
                )),
            });
        };

        let mut command = Command::new(program);
        command
            .args(words)
            .arg("--model")
            .arg(location.directory().as_std_path())
            .arg("--device")
            .arg(&self.device)
            .arg("--compute-type")
            .arg(&self.compute_type)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit());
        Ok(command)
    }
}

/// Loads models by starting one worker process per engine.
#[derive(Debug, Clone)]
pub struct WorkerLoader {
    settings: WorkerSettings,
}

impl WorkerLoader {
    /// Creates a loader for the given worker settings.
    #[must_use]
    pub fn new(settings: WorkerSettings) -> Self {
        Self { settings }
    }
}

impl EngineLoader for WorkerLoader {
    fn load(&self, location: &ModelLocation) -> Result<Box<dyn RecognitionEngine>, EngineError> {
        Ok(Box::new(WorkerEngine::start(&self.settings, location)?))
    }
}

/// A running worker with its model loaded.
pub struct WorkerEngine {
    child: Child,
    reader: BufReader<ChildStdout>,
    writer: Option<BufWriter<ChildStdin>>,
    label: String,
    alive: bool,
}

impl WorkerEngine {
    /// Starts the worker and waits for its handshake.
    pub fn start(settings: &WorkerSettings, location: &ModelLocation) -> Result<Self, EngineError> {
        let mut command = settings.build_command(location)?;
        debug!(
            target: WORKER_TARGET,
            command = settings.command(),
            model = location.label(),
            "starting recognition worker"
        );
        let mut child = command.spawn().map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                EngineError::WorkerNotFound {
                    command: settings.command.clone(),
                    source: Arc::new(source),
                }
            } else {
                EngineError::Spawn {
                    command: settings.command.clone(),
                    source: Arc::new(source),
                }
            }
        })?;

        let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(EngineError::Spawn {
                command: settings.command.clone(),
                source: Arc::new(io::Error::other("worker streams were not captured")),
            });
        };

        let mut engine = Self {
            child,
            reader: BufReader::new(stdout),
            writer: Some(BufWriter::new(stdin)),
            label: location.label().to_owned(),
            alive: true,
        };
        engine.await_ready()?;
        info!(
            target: WORKER_TARGET,
            model = %engine.label,
            pid = engine.child.id(),
            "recognition worker ready"
        );
        Ok(engine)
    }

    fn await_ready(&mut self) -> Result<(), EngineError> {
        match read_reply(&mut self.reader) {
            Ok(WorkerReply::Ready { ready: true }) => Ok(()),
            Ok(WorkerReply::Failed { error }) => Err(EngineError::Load {
                model: self.label.clone(),
                message: error,
            }),
            Ok(other) => Err(EngineError::Protocol {
                message: format!("unexpected handshake {other:?}"),
            }),
            Err(EngineError::WorkerExited) => Err(EngineError::Load {
                model: self.label.clone(),
                message: String::from("worker exited before reporting ready"),
            }),
            Err(error) => Err(error),
        }
    }

    fn exchange(&mut self, request: &WorkerRequest<'_>) -> Result<Vec<Segment>, EngineError> {
        let writer = self.writer.as_mut().ok_or(EngineError::WorkerExited)?;
        send_request(writer, request)?;
        match read_reply(&mut self.reader)? {
            WorkerReply::Segments { segments } => Ok(segments),
            WorkerReply::Failed { error } => Err(EngineError::Recognition(error)),
            WorkerReply::Ready { .. } => Err(EngineError::Protocol {
                message: String::from("unexpected handshake after start-up"),
            }),
        }
    }

    fn terminate(&mut self) {
        drop(self.writer.take());
        let deadline = Instant::now() + EXIT_GRACE;
        loop {
            match self.child.try_wait() {
                Ok(Some(status)) => {
                    debug!(target: WORKER_TARGET, model = %self.label, ?status, "recognition worker exited");
                    return;
                }
                Ok(None) if Instant::now() < deadline => thread::sleep(EXIT_POLL),
                Ok(None) | Err(_) => break,
            }
        }
        warn!(
            target: WORKER_TARGET,
            model = %self.label,
            "recognition worker did not exit after stdin closed; killing"
        );
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

impl RecognitionEngine for WorkerEngine {
    fn transcribe(&mut self, audio: &Utf8Path, language: &str) -> Result<Vec<Segment>, EngineError> {
        if !audio.is_file() {
            return Err(EngineError::AudioNotFound {
                path: audio.to_path_buf(),
            });
        }
        if !self.alive {
            return Err(EngineError::WorkerExited);
        }

        let request = WorkerRequest {
            audio_path: audio.as_str(),
            language,
        };
        let result = self.exchange(&request);
        if matches!(
            result,
            Err(EngineError::WorkerExited | EngineError::Io(_) | EngineError::Protocol { .. })
        ) {
            warn!(target: WORKER_TARGET, model = %self.label, "recognition worker is unusable");
            self.alive = false;
        }
        result
    }
}

impl Drop for WorkerEngine {
    fn drop(&mut self) {
        self.terminate();
    }
}
