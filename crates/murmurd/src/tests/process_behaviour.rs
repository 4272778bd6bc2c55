//! Behavioural tests covering daemon start-up, runtime files and shutdown.

use std::cell::RefCell;
use std::fs;
use std::os::unix::net::{UnixListener, UnixStream};
use std::process::Command;

use camino::Utf8PathBuf;
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use signal_hook::consts::signal::SIGTERM;

use murmur_config::Config;
use murmur_daemon_types::{ClientRequest, DaemonResponse, ReplyStatus};
use murmur_engine::WhisperModel;

use crate::process::LaunchError;
use crate::tests::support::{DaemonRun, HealthEvent, TestRuntime, exchange};

type StepResult = Result<(), String>;

// Field order matters: the daemon must stop before the scratch directory
// is removed.
struct ProcessWorld {
    daemon: Option<DaemonRun>,
    runtime: TestRuntime,
    config: Config,
    result: Option<Result<(), LaunchError>>,
    reply: Option<DaemonResponse>,
}

impl ProcessWorld {
    fn new() -> Self {
        let runtime = TestRuntime::new();
        let config = runtime.config();
        Self {
            daemon: None,
            runtime,
            config,
            result: None,
            reply: None,
        }
    }

    fn daemon(&self) -> Result<&DaemonRun, String> {
        self.daemon.as_ref().ok_or_else(|| String::from("daemon not started"))
    }

    fn join(&mut self) -> StepResult {
        let mut daemon = self.daemon.take().ok_or("daemon not started")?;
        self.result = Some(daemon.join()?);
        Ok(())
    }
}

fn reaped_pid() -> Result<u32, String> {
    let mut child = Command::new("true").spawn().map_err(|error| error.to_string())?;
    let pid = child.id();
    child.wait().map_err(|error| error.to_string())?;
    Ok(pid)
}

#[fixture]
fn world() -> RefCell<ProcessWorld> {
    RefCell::new(ProcessWorld::new())
}

#[given("a daemon runtime with the model installed")]
fn given_model_installed(world: &RefCell<ProcessWorld>) {
    world.borrow().runtime.services.store.install(WhisperModel::Tiny);
}

#[given("a daemon runtime without the model installed")]
fn given_model_missing(world: &RefCell<ProcessWorld>) {
    let _ = world;
}

#[given("a daemon runtime with a model directory")]
fn given_model_directory(world: &RefCell<ProcessWorld>) -> StepResult {
    let mut world = world.borrow_mut();
    let directory = world.runtime.root().join("custom-model");
    fs::create_dir_all(&directory).map_err(|error| error.to_string())?;
    world.config.model = directory.into_string();
    Ok(())
}

#[given("stale runtime files from a dead daemon")]
fn given_stale_files(world: &RefCell<ProcessWorld>) -> StepResult {
    let world = world.borrow();
    let socket = world.runtime.socket_path();
    if let Some(parent) = socket.parent() {
        fs::create_dir_all(parent).map_err(|error| error.to_string())?;
    }
    drop(UnixListener::bind(&socket).map_err(|error| error.to_string())?);
    fs::write(world.runtime.pid_path(), format!("{}\n", reaped_pid()?))
        .map_err(|error| error.to_string())?;
    Ok(())
}

#[when("the daemon starts")]
fn when_daemon_starts(world: &RefCell<ProcessWorld>) -> StepResult {
    let mut world = world.borrow_mut();
    let daemon = world.runtime.launch(world.config.clone());
    daemon.wait_until_ready()?;
    world.daemon = Some(daemon);
    Ok(())
}

#[when("the daemon is launched")]
fn when_daemon_launched(world: &RefCell<ProcessWorld>) -> StepResult {
    let mut world = world.borrow_mut();
    let daemon = world.runtime.launch(world.config.clone());
    world.daemon = Some(daemon);
    world.join()
}

#[when("a termination signal arrives")]
fn when_signal(world: &RefCell<ProcessWorld>) -> StepResult {
    let mut world = world.borrow_mut();
    world.daemon()?.signal(SIGTERM);
    world.join()
}

#[when("a client sends the shutdown command")]
fn when_shutdown_command(world: &RefCell<ProcessWorld>) -> StepResult {
    let mut world = world.borrow_mut();
    let reply = exchange(world.daemon()?.socket(), &ClientRequest::shutdown())?;
    world.reply = Some(reply);
    world.join()
}

#[then("the pid record names this process")]
fn then_pid_record(world: &RefCell<ProcessWorld>) {
    let content =
        fs::read_to_string(world.borrow().runtime.pid_path()).expect("pid record readable");
    assert_eq!(content, format!("{}\n", std::process::id()));
}

#[then("the socket accepts connections")]
fn then_socket_accepts(world: &RefCell<ProcessWorld>) -> StepResult {
    let socket = world.borrow().runtime.socket_path();
    let reply = exchange(&socket, &ClientRequest::ping())?;
    assert_eq!(reply, DaemonResponse::status(ReplyStatus::Ok));
    Ok(())
}

#[then("the client is told the daemon is shutting down")]
fn then_told_shutting_down(world: &RefCell<ProcessWorld>) {
    assert_eq!(
        world.borrow().reply,
        Some(DaemonResponse::status(ReplyStatus::ShuttingDown))
    );
}

#[then("the daemon run succeeds")]
fn then_run_succeeds(world: &RefCell<ProcessWorld>) {
    let world = world.borrow();
    let result = world.result.as_ref().expect("daemon result recorded");
    assert!(result.is_ok(), "daemon run should succeed: {result:?}");
}

#[then("the runtime files are removed")]
fn then_runtime_removed(world: &RefCell<ProcessWorld>) {
    let world = world.borrow();
    assert!(!world.runtime.socket_path().exists(), "socket should be removed");
    assert!(!world.runtime.pid_path().exists(), "pid record should be removed");
}

#[then("no runtime files remain")]
fn then_no_runtime_files(world: &RefCell<ProcessWorld>) {
    then_runtime_removed(world);
}

#[then("the engine was unloaded after draining")]
fn then_engine_unloaded(world: &RefCell<ProcessWorld>) {
    let world = world.borrow();
    assert!(world.runtime.services.loader.probe().unloaded());
    assert!(
        world
            .runtime
            .reporter
            .events()
            .contains(&HealthEvent::ShutdownCompleted { drained: true })
    );
}

#[then("starting a second daemon fails with already running")]
fn then_second_daemon_refused(world: &RefCell<ProcessWorld>) -> StepResult {
    let world = world.borrow();
    let mut second = world.runtime.launch(world.config.clone());
    match second.join()? {
        Err(LaunchError::AlreadyRunning { pid, .. }) => {
            assert_eq!(pid, Some(std::process::id()));
            Ok(())
        }
        other => Err(format!("expected AlreadyRunning, got {other:?}")),
    }
}

#[then("the launch fails naming the missing model")]
fn then_launch_fails(world: &RefCell<ProcessWorld>) {
    let world = world.borrow();
    let error = world
        .result
        .as_ref()
        .and_then(|result| result.as_ref().err())
        .expect("launch should fail");
    assert_eq!(
        error.to_string(),
        "failed to load model: model 'tiny' is not installed; run: murmurd --download tiny"
    );
    assert!(
        world
            .runtime
            .reporter
            .events()
            .iter()
            .any(|event| matches!(event, HealthEvent::ModelFailed(_)))
    );
}

#[then("the engine loaded the model directory")]
fn then_loaded_directory(world: &RefCell<ProcessWorld>) {
    let world = world.borrow();
    let expected = Utf8PathBuf::from(world.config.model.as_str());
    assert_eq!(world.runtime.services.loader.loaded(), vec![expected]);
    assert!(UnixStream::connect(world.runtime.socket_path()).is_ok());
}

#[scenario(path = "tests/features/daemon_process.feature")]
fn daemon_process(#[from(world)] _: RefCell<ProcessWorld>) -> Result<(), String> {
    Ok(())
}
