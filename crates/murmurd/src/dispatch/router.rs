//! Command routing for the dispatch loop.
//!
//! Each request names one command. `transcribe` is the only command that
//! touches the engine guard; the others run concurrently with an in-flight
//! transcription.

use camino::Utf8Path;
use tracing::{debug, info, warn};

use murmur_daemon_types::{ClientRequest, DaemonResponse, ModelDescriptor, ReplyStatus, command};
use murmur_engine::{WhisperModel, join_segments};

use crate::context::DaemonContext;

use super::errors::DispatchError;

/// Tracing target for dispatch operations.
pub(crate) const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");

/// Known daemon commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Command {
    Transcribe,
    Ping,
    ListModels,
    DownloadModel,
    Shutdown,
}

impl Command {
    /// Parses a command name. Names are matched exactly.
    pub(crate) fn parse(value: &str) -> Result<Self, DispatchError> {
        match value {
            command::TRANSCRIBE => Ok(Self::Transcribe),
            command::PING => Ok(Self::Ping),
            command::LIST_MODELS => Ok(Self::ListModels),
            command::DOWNLOAD_MODEL => Ok(Self::DownloadModel),
            command::SHUTDOWN => Ok(Self::Shutdown),
            _ => Err(DispatchError::unknown_command(value)),
        }
    }
}

/// Response for one request plus whether the daemon should stop after
/// sending it.
#[derive(Debug)]
pub(crate) struct Routed {
    pub(crate) response: DaemonResponse,
    pub(crate) shutdown_after: bool,
}

impl Routed {
    fn reply(response: DaemonResponse) -> Self {
        Self {
            response,
            shutdown_after: false,
        }
    }
}

/// Runs `request` against the daemon context.
pub(crate) fn route(
    request: &ClientRequest,
    context: &DaemonContext,
) -> Result<Routed, DispatchError> {
    let command = Command::parse(&request.command)?;
    debug!(target: DISPATCH_TARGET, command = %request.command, "dispatching request");
    match command {
        Command::Transcribe => transcribe(request, context).map(Routed::reply),
        Command::Ping => Ok(Routed::reply(DaemonResponse::status(ReplyStatus::Ok))),
        Command::ListModels => Ok(Routed::reply(list_models(context))),
        Command::DownloadModel => download_model(request, context).map(Routed::reply),
        Command::Shutdown => {
            info!(target: DISPATCH_TARGET, "shutdown requested by client");
            Ok(Routed {
                response: DaemonResponse::status(ReplyStatus::ShuttingDown),
                shutdown_after: true,
            })
        }
    }
}

fn transcribe(
    request: &ClientRequest,
    context: &DaemonContext,
) -> Result<DaemonResponse, DispatchError> {
    let audio = request
        .param_str("audio_path")
        .ok_or(DispatchError::MissingParameter { name: "audio_path" })?;
    let language = request
        .param_str("language")
        .map(str::trim)
        .filter(|language| !language.is_empty())
        .unwrap_or(context.default_language());

    let segments = context
        .engine()
        .with_engine(|engine| engine.transcribe(Utf8Path::new(audio), language))??;
    debug!(
        target: DISPATCH_TARGET,
        audio,
        language,
        segments = segments.len(),
        "transcription finished"
    );
    Ok(DaemonResponse::text(join_segments(&segments)))
}

fn list_models(context: &DaemonContext) -> DaemonResponse {
    let installed = context.store().list_installed();
    let models = WhisperModel::ALL
        .into_iter()
        .map(|model| ModelDescriptor {
            name: model.name().to_owned(),
            installed: installed.contains(&model),
        })
        .collect();
    DaemonResponse::models(models)
}

fn download_model(
    request: &ClientRequest,
    context: &DaemonContext,
) -> Result<DaemonResponse, DispatchError> {
    let name = request
        .param_str("model")
        .ok_or(DispatchError::MissingParameter { name: "model" })?;
    let model = WhisperModel::from_name(name).ok_or_else(|| DispatchError::unknown_model(name))?;

    let store = context.store();
    if store.is_installed(model) {
        return Ok(DaemonResponse::status(ReplyStatus::AlreadyInstalled));
    }

    info!(target: DISPATCH_TARGET, model = %model, "downloading model");
    let status = match store.download(model) {
        Ok(()) => ReplyStatus::Ok,
        Err(error) => {
            warn!(target: DISPATCH_TARGET, model = %model, %error, "model download failed");
            ReplyStatus::Error
        }
    };
    Ok(DaemonResponse::status(status))
}
