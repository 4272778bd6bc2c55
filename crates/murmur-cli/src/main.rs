//! CLI entrypoint for the murmur transcription client.
//!
//! The binary delegates to [`murmur_cli::run`], which loads configuration,
//! parses the command and talks to the daemon socket (or, for
//! `transcribe --local`, runs the engine in-process).

use std::io::{self, StderrLock, StdoutLock};
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut stdout: StdoutLock<'_> = io::stdout().lock();
    let mut stderr: StderrLock<'_> = io::stderr().lock();
    murmur_cli::run(std::env::args_os(), &mut stdout, &mut stderr)
}
