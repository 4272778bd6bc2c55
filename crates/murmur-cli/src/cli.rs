//! Command-line grammar for `murmur`.

use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};

const CONFIG_HELP: &str = "\
Configuration flags (also read from MURMUR_* variables and the config file):
  --config-path <PATH>   --socket-path <PATH>   --model <NAME|PATH>
  --language <CODE>      --model-cache <DIR>    --engine-command <CMD>
  --engine-device <D>    --engine-compute-type <T>
  --log-filter <FILTER>  --log-format <json|compact>

`--language` given on the command line is sent with `transcribe`; otherwise
the daemon applies its own default.";

/// Client for the murmur transcription daemon.
#[derive(Parser, Debug)]
#[command(name = "murmur", version, after_help = CONFIG_HELP)]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub(crate) command: CliCommand,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub(crate) enum CliCommand {
    /// Checks that the daemon is answering.
    Ping,
    /// Transcribes an audio file.
    Transcribe {
        /// Audio file to transcribe.
        audio: Utf8PathBuf,
        /// Loads the model in this process instead of asking the daemon.
        #[arg(long)]
        local: bool,
    },
    /// Lists supported models with their install state.
    Models,
    /// Downloads a supported model through the daemon.
    Download {
        /// Model name, for example `small`.
        model: String,
    },
    /// Asks the daemon to stop.
    Shutdown,
}
