//! Renders daemon responses for the terminal.

use std::io::Write;
use std::process::ExitCode;

use murmur_daemon_types::{DaemonResponse, ModelDescriptor, ReplyStatus};

use crate::AppError;

/// Writes `response` to the matching stream and picks the exit code.
///
/// Error responses and `error` statuses fail; everything else succeeds.
pub(crate) fn render_response<W: Write, E: Write>(
    response: &DaemonResponse,
    stdout: &mut W,
    stderr: &mut E,
) -> Result<ExitCode, AppError> {
    match response {
        DaemonResponse::Text { text } => {
            writeln!(stdout, "{text}").map_err(AppError::WriteOutput)?;
            Ok(ExitCode::SUCCESS)
        }
        DaemonResponse::Status { status } => {
            writeln!(stdout, "{}", status_label(*status)).map_err(AppError::WriteOutput)?;
            Ok(match status {
                ReplyStatus::Error => ExitCode::FAILURE,
                _ => ExitCode::SUCCESS,
            })
        }
        DaemonResponse::Models { models } => {
            write_models(stdout, models).map_err(AppError::WriteOutput)?;
            Ok(ExitCode::SUCCESS)
        }
        DaemonResponse::Error { error } => {
            writeln!(stderr, "Error: {error}").map_err(AppError::WriteOutput)?;
            Ok(ExitCode::FAILURE)
        }
    }
}

const fn status_label(status: ReplyStatus) -> &'static str {
    match status {
        ReplyStatus::Ok => "ok",
        ReplyStatus::AlreadyInstalled => "already installed",
        ReplyStatus::Error => "error",
        ReplyStatus::ShuttingDown => "shutting down",
    }
}

fn write_models<W: Write>(stdout: &mut W, models: &[ModelDescriptor]) -> std::io::Result<()> {
    writeln!(stdout, "Available models:")?;
    for model in models {
        let state = if model.installed {
            "✓ installed"
        } else {
            "✗ not installed"
        };
        writeln!(stdout, "  {}: {state}", model.name)?;
    }
    Ok(())
}
