//! Command-line client for the murmur transcription daemon.
//!
//! Every command opens one connection to the daemon socket, sends a single
//! JSON request line and prints the single response line. `transcribe
//! --local` skips the daemon and loads the model in-process instead.

use std::ffi::OsString;
use std::io::{self, Write};
use std::path;
use std::process::ExitCode;

use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;

use murmur_config::{Config, partition_config_arguments};
use murmur_daemon_types::ClientRequest;

mod cli;
mod config;
mod errors;
mod local;
mod output;
mod transport;

use cli::{Cli, CliCommand};
use config::{ConfigLoader, OrthoConfigLoader, language_flag_given};
pub(crate) use errors::AppError;
use errors::is_daemon_not_running;
use local::{EngineServices, SystemEngineServices, transcribe_locally};
use output::render_response;
use transport::{connect, exchange};


/// Runs the CLI using the provided arguments and IO handles.
#[must_use]
pub fn run<I, W, E>(args: I, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    run_with(args, stdout, stderr, &OrthoConfigLoader, &SystemEngineServices)
}

pub(crate) fn run_with<I, W, E>(
    args: I,
    stdout: &mut W,
    stderr: &mut E,
    loader: &dyn ConfigLoader,
    services: &dyn EngineServices,
) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    let args: Vec<OsString> = args.into_iter().collect();
    let split = partition_config_arguments(&args);

    let cli = match Cli::try_parse_from(&split.action_arguments) {
        Ok(cli) => cli,
        Err(error) if !error.use_stderr() => {
            let _ = write!(stdout, "{error}");
            return ExitCode::SUCCESS;
        }
        Err(error) => return report(stderr, &AppError::CliUsage(error)),
    };

    let result = loader.load(&split.config_arguments).and_then(|config| {
        let explicit_language = language_flag_given(&split.config_arguments);
        execute(cli.command, &config, explicit_language, services, stdout, stderr)
    });
    match result {
        Ok(code) => code,
        Err(error) => report(stderr, &error),
    }
}

fn execute<W: Write, E: Write>(
    command: CliCommand,
    config: &Config,
    explicit_language: bool,
    services: &dyn EngineServices,
    stdout: &mut W,
    stderr: &mut E,
) -> Result<ExitCode, AppError> {
    let request = match command {
        CliCommand::Transcribe { audio, local: true } => {
            let text = transcribe_locally(config, services, &audio)?;
            writeln!(stdout, "{text}").map_err(AppError::WriteOutput)?;
            return Ok(ExitCode::SUCCESS);
        }
        CliCommand::Transcribe { audio, local: false } => ClientRequest::transcribe(
            absolute_audio_path(&audio)?.into_string(),
            explicit_language.then(|| config.language()),
        ),
        CliCommand::Ping => ClientRequest::ping(),
        CliCommand::Models => ClientRequest::list_models(),
        CliCommand::Download { model } => ClientRequest::download_model(model),
        CliCommand::Shutdown => ClientRequest::shutdown(),
    };

    let mut connection = connect(config.socket_path())?;
    let response = exchange(&mut connection, &request)?;
    render_response(&response, stdout, stderr)
}

/// Anchors `audio` at the client's working directory; the daemon has its own.
fn absolute_audio_path(audio: &Utf8Path) -> Result<Utf8PathBuf, AppError> {
    let resolve_error = |source| AppError::AudioPath {
        path: audio.to_path_buf(),
        source,
    };
    let absolute = path::absolute(audio.as_std_path()).map_err(resolve_error)?;
    Utf8PathBuf::from_path_buf(absolute).map_err(|_| {
        resolve_error(io::Error::new(
            io::ErrorKind::InvalidData,
            "working directory is not valid UTF-8",
        ))
    })
}

fn report<E: Write>(stderr: &mut E, error: &AppError) -> ExitCode {
    let _ = writeln!(stderr, "{error}");
    if is_daemon_not_running(error) {
        let _ = writeln!(stderr, "hint: start the daemon with `murmurd`");
    }
    ExitCode::FAILURE
}
