//! Command-line entry for `murmurd`.
//!
//! Without an action flag the daemon is started. `--list-models` and
//! `--download` work against the local model store and exit without
//! binding the socket.

use std::ffi::OsString;
use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use ortho_config::OrthoError;
use thiserror::Error;

use murmur_config::{Config, partition_config_arguments};
use murmur_engine::{ModelStore, StoreError, WhisperModel};

use crate::bootstrap::{ConfigLoader, SystemConfigLoader};
use crate::process::LaunchError;
use crate::process::launch::{ModelServices, SystemModelServices, run_daemon};
use crate::telemetry::{self, TelemetryError};

const CONFIG_HELP: &str = "\
Configuration flags (also read from MURMUR_* variables and the config file):
  --config-path <PATH>          --socket-path <PATH>       --model <NAME|PATH>
  --language <CODE>             --model-cache <DIR>        --engine-command <CMD>
  --engine-device <DEVICE>      --engine-compute-type <T>  --max-connections <N>
  --read-timeout-secs <S>       --drain-timeout-secs <S>   --log-filter <FILTER>
  --log-format <json|compact>";

/// Resident speech recognition daemon.
#[derive(Parser, Debug)]
#[command(name = "murmurd", version, after_help = CONFIG_HELP)]
pub(crate) struct DaemonCli {
    /// Lists supported models with their install state and exits.
    #[arg(long, conflicts_with = "download")]
    pub(crate) list_models: bool,
    /// Downloads a supported model and exits.
    #[arg(long, value_name = "MODEL")]
    pub(crate) download: Option<String>,
}

/// Errors reported by the `murmurd` command line.
#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("{0}")]
    CliUsage(clap::Error),
    #[error("failed to load configuration: {0}")]
    LoadConfiguration(Arc<OrthoError>),
    #[error("failed to initialise telemetry: {0}")]
    Telemetry(#[from] TelemetryError),
    #[error("Error: Unknown model '{name}'\nAvailable: {available}")]
    UnknownModel { name: String, available: String },
    #[error("Error: failed to download '{model}': {source}")]
    Download {
        model: WhisperModel,
        #[source]
        source: StoreError,
    },
    #[error("{0}")]
    Launch(#[from] LaunchError),
}

/// Parses `args`, runs the selected action and maps the outcome to an exit
/// code. Diagnostics go to `stderr`.
pub fn run<I, W, E>(args: I, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    let args: Vec<OsString> = args.into_iter().collect();
    let split = partition_config_arguments(&args);

    let cli = match DaemonCli::try_parse_from(&split.action_arguments) {
        Ok(cli) => cli,
        Err(error) if !error.use_stderr() => {
            let _ = write!(stdout, "{error}");
            return ExitCode::SUCCESS;
        }
        Err(error) => return report(stderr, &AppError::CliUsage(error)),
    };

    let outcome = if cli.list_models {
        load_store(&SystemConfigLoader::new(split.config_arguments))
            .map(|store| list_models(store.as_ref(), stdout))
    } else if let Some(name) = cli.download.as_deref() {
        load_store(&SystemConfigLoader::new(split.config_arguments))
            .and_then(|store| download(store.as_ref(), name, stdout))
    } else {
        run_daemon(split.config_arguments).map_err(AppError::from)
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => report(stderr, &error),
    }
}

fn load_store(loader: &dyn ConfigLoader) -> Result<Arc<dyn ModelStore>, AppError> {
    let config: Config = loader.load().map_err(AppError::LoadConfiguration)?;
    telemetry::initialise(&config)?;
    Ok(SystemModelServices.store(&config))
}

fn list_models<W: Write>(store: &dyn ModelStore, stdout: &mut W) {
    let installed = store.list_installed();
    let _ = writeln!(stdout, "Available models:");
    for model in WhisperModel::ALL {
        let status = if installed.contains(&model) {
            "✓ installed"
        } else {
            "✗ not installed"
        };
        let _ = writeln!(stdout, "  {model}: {status}");
    }
}

fn download<W: Write>(store: &dyn ModelStore, name: &str, stdout: &mut W) -> Result<(), AppError> {
    let model = WhisperModel::from_name(name).ok_or_else(|| AppError::UnknownModel {
        name: name.to_owned(),
        available: WhisperModel::supported_names(),
    })?;

    if store.is_installed(model) {
        let _ = writeln!(stdout, "Model '{model}' is already installed");
        return Ok(());
    }

    let _ = writeln!(stdout, "Downloading model '{model}'...");
    store
        .download(model)
        .map_err(|source| AppError::Download { model, source })?;
    let _ = writeln!(stdout, "Model '{model}' downloaded");
    Ok(())
}

fn report<E: Write>(stderr: &mut E, error: &AppError) -> ExitCode {
    let _ = writeln!(stderr, "{error}");
    ExitCode::FAILURE
}
