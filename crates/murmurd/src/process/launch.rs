//! Supervises daemon launch sequencing and runtime orchestration.

use std::ffi::OsString;
use std::sync::Arc;

use tracing::{info, warn};

use murmur_config::Config;
use murmur_engine::{
    EngineLoader, HfCacheStore, ModelRef, ModelStore, RecognitionEngine, WorkerLoader,
    WorkerSettings,
};

use crate::bootstrap::{ConfigLoader, SystemConfigLoader, bootstrap_with};
use crate::context::DaemonContext;
use crate::dispatch::DispatchConnectionHandler;
use crate::health::{HealthReporter, StructuredHealthReporter};
use crate::transport::{ConnectionGate, SocketListener};

use super::PROCESS_TARGET;
use super::errors::LaunchError;
use super::guard::ProcessGuard;
use super::shutdown::{ShutdownContext, ShutdownSignal, SystemShutdownSignal};

/// Builds the model store and engine loader once configuration is known.
pub(crate) trait ModelServices: Send + Sync {
    /// Store holding installed models.
    fn store(&self, config: &Config) -> Arc<dyn ModelStore>;

    /// Loader producing the resident engine.
    fn engines(&self, config: &Config) -> Arc<dyn EngineLoader>;
}

/// Hub cache store plus the worker-process engine.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct SystemModelServices;

impl ModelServices for SystemModelServices {
    fn store(&self, config: &Config) -> Arc<dyn ModelStore> {
        Arc::new(HfCacheStore::new(config.model_cache().clone()))
    }

    fn engines(&self, config: &Config) -> Arc<dyn EngineLoader> {
        Arc::new(WorkerLoader::new(WorkerSettings::new(
            config.engine_command.as_str(),
            config.engine_device.as_str(),
            config.engine_compute_type.as_str(),
        )))
    }
}

/// Process-level collaborators needed to control daemon lifecycle.
pub(crate) struct ProcessControl<S> {
    pub(crate) signals: S,
    pub(crate) shutdown: ShutdownContext,
}

/// Service dependencies required to construct the daemon runtime.
pub(crate) struct ServiceDeps<L, M> {
    pub(crate) loader: L,
    pub(crate) reporter: Arc<dyn HealthReporter>,
    pub(crate) models: M,
}

/// Collaborators required to launch the daemon runtime.
pub(crate) struct LaunchPlan<L, M, S> {
    pub(crate) process: ProcessControl<S>,
    pub(crate) services: ServiceDeps<L, M>,
}

/// Runs the daemon using the production collaborators.
///
/// `config_args` holds the program name followed by configuration flags.
pub fn run_daemon(config_args: Vec<OsString>) -> Result<(), LaunchError> {
    let plan = LaunchPlan {
        process: ProcessControl {
            signals: SystemShutdownSignal,
            shutdown: ShutdownContext::new(),
        },
        services: ServiceDeps {
            loader: SystemConfigLoader::new(config_args),
            reporter: Arc::new(StructuredHealthReporter::new()),
            models: SystemModelServices,
        },
    };
    run_daemon_with(plan)
}

/// Runs the daemon with injected collaborators until shutdown completes.
pub(crate) fn run_daemon_with<L, M, S>(plan: LaunchPlan<L, M, S>) -> Result<(), LaunchError>
where
    L: ConfigLoader,
    M: ModelServices,
    S: ShutdownSignal,
{
    let LaunchPlan { process, services } = plan;
    let ProcessControl { signals, shutdown } = process;
    let ServiceDeps {
        loader,
        reporter,
        models,
    } = services;

    let config = bootstrap_with(&loader, reporter.as_ref())?.into_config();
    let socket = config.socket_path().clone();
    info!(
        target: PROCESS_TARGET,
        socket = %socket,
        "starting daemon runtime"
    );

    let mut guard = ProcessGuard::acquire(&socket, &config.pid_path())?;
    let model = ModelRef::parse(config.model())?;
    let store = models.store(&config);
    let engine = load_engine(
        &model,
        store.as_ref(),
        models.engines(&config).as_ref(),
        reporter.as_ref(),
    )?;

    let listener = SocketListener::bind(&socket)?;
    guard.mark_socket_bound();
    guard.write_pid(std::process::id())?;

    let context = Arc::new(DaemonContext::new(
        engine,
        store,
        config.language(),
        shutdown.clone(),
    ));
    signals.install(&shutdown)?;

    let handler = Arc::new(DispatchConnectionHandler::new(
        Arc::clone(&context),
        config.read_timeout(),
    ));
    let gate = ConnectionGate::new(config.max_connections(), handler);
    let listener_handle = listener.start(gate.admitter())?;
    reporter.listener_ready(&socket);

    let reason = shutdown.wait();
    reporter.shutdown_requested(reason);
    listener_handle.shutdown();
    let stopped = listener_handle.join();

    let drained = gate.drain(config.drain_timeout());
    if drained && let Err(error) = context.engine().unload() {
        warn!(target: PROCESS_TARGET, %error, "failed to unload engine");
    }
    guard.release();
    reporter.shutdown_completed(drained);
    stopped?;

    info!(
        target: PROCESS_TARGET,
        "shutdown sequence completed"
    );
    Ok(())
}

fn load_engine(
    model: &ModelRef,
    store: &dyn ModelStore,
    engines: &dyn EngineLoader,
    reporter: &dyn HealthReporter,
) -> Result<Box<dyn RecognitionEngine>, LaunchError> {
    reporter.model_loading(&model.to_string());
    let loaded = model
        .resolve(store)
        .and_then(|location| engines.load(&location));
    match loaded {
        Ok(engine) => {
            reporter.model_ready(&model.to_string());
            Ok(engine)
        }
        Err(error) => {
            reporter.model_failed(&error);
            Err(error.into())
        }
    }
}
