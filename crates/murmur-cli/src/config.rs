//! Configuration loading for the client.

use std::ffi::OsString;

use murmur_config::Config;
use ortho_config::OrthoConfig;

use crate::AppError;

pub(crate) trait ConfigLoader {
    /// Loads configuration from the configuration half of the command line.
    fn load(&self, args: &[OsString]) -> Result<Config, AppError>;
}

pub(crate) struct OrthoConfigLoader;

impl ConfigLoader for OrthoConfigLoader {
    fn load(&self, args: &[OsString]) -> Result<Config, AppError> {
        Config::load_from_iter(args.iter().cloned()).map_err(AppError::LoadConfiguration)
    }
}

/// Whether `--language` was given on the command line itself.
///
/// Only an explicit flag is forwarded to the daemon, so a client's file or
/// environment defaults never override the daemon's own default language.
pub(crate) fn language_flag_given(config_arguments: &[OsString]) -> bool {
    config_arguments.iter().skip(1).any(|argument| {
        let text = argument.to_string_lossy();
        text == "--language" || text.starts_with("--language=")
    })
}
