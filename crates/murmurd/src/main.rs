//! Binary entrypoint for the murmur transcription daemon.

use std::io;
use std::process::ExitCode;

fn main() -> ExitCode {
    // Streams stay unlocked: daemon threads log to stderr concurrently.
    murmurd::run(std::env::args_os(), &mut io::stdout(), &mut io::stderr())
}
