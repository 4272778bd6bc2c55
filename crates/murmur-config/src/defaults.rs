use std::env;

use camino::Utf8PathBuf;

#[cfg(unix)]
use libc::geteuid;

use crate::logging::LogFormat;

/// Default log filter expression used by the binaries.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Model loaded when no `--model` is supplied.
pub const DEFAULT_MODEL: &str = "small";

/// Recognition language used when a request does not name one.
pub const DEFAULT_LANGUAGE: &str = "ru";

/// Executable that hosts the resident recognition worker.
pub const DEFAULT_ENGINE_COMMAND: &str = "murmur-whisper-worker";

/// Device requested from the recognition worker.
pub const DEFAULT_ENGINE_DEVICE: &str = "cpu";

/// Quantisation requested from the recognition worker.
pub const DEFAULT_ENGINE_COMPUTE_TYPE: &str = "int8";

/// Connections served concurrently before new clients are turned away.
///
/// Each connection owns a thread, so waiting transcriptions and idle
/// clients count against this limit but never delay other commands.
pub const DEFAULT_MAX_CONNECTIONS: usize = 64;

/// Seconds a client may take to deliver its request line.
pub const DEFAULT_READ_TIMEOUT_SECS: u64 = 30;

/// Seconds granted to in-flight requests once shutdown begins.
pub const DEFAULT_DRAIN_TIMEOUT_SECS: u64 = 30;

/// Default log filter expression used by the binaries.
pub fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format for the binaries.
pub fn default_log_format() -> LogFormat {
    LogFormat::Json
}

/// Owned default model reference.
pub fn default_model() -> String {
    DEFAULT_MODEL.to_owned()
}

/// Owned default language code.
pub fn default_language() -> String {
    DEFAULT_LANGUAGE.to_owned()
}

/// Owned default worker executable.
pub fn default_engine_command() -> String {
    DEFAULT_ENGINE_COMMAND.to_owned()
}

/// Owned default worker device.
pub fn default_engine_device() -> String {
    DEFAULT_ENGINE_DEVICE.to_owned()
}

/// Owned default worker compute type.
pub fn default_engine_compute_type() -> String {
    DEFAULT_ENGINE_COMPUTE_TYPE.to_owned()
}

/// Serde default for the admission limit.
pub fn default_max_connections() -> usize {
    DEFAULT_MAX_CONNECTIONS
}

/// Serde default for the request read timeout.
pub fn default_read_timeout_secs() -> u64 {
    DEFAULT_READ_TIMEOUT_SECS
}

/// Serde default for the shutdown drain budget.
pub fn default_drain_timeout_secs() -> u64 {
    DEFAULT_DRAIN_TIMEOUT_SECS
}

/// Computes the default daemon socket path.
///
/// The socket lives in the per-user application data directory
/// (`~/Library/Application Support/murmur` on macOS, `$XDG_DATA_HOME/murmur`
/// elsewhere). Hosts without such a directory fall back to a per-user
/// namespace under the temporary directory.
pub fn default_socket_path() -> Utf8PathBuf {
    let (mut base, apply_namespace) = match data_base_directory() {
        Some(dir) => (dir, false),
        None => (fallback_base_directory(), true),
    };

    base.push("murmur");
    if apply_namespace {
        base.push(user_namespace());
    }

    base.join("daemon.sock")
}

/// Computes the Hugging Face hub cache that holds downloaded models.
///
/// Resolution order: `HF_HUB_CACHE`, then `HF_HOME/hub`, then
/// `~/.cache/huggingface/hub`.
pub fn default_model_cache() -> Utf8PathBuf {
    if let Some(cache) = env_path("HF_HUB_CACHE") {
        return cache;
    }
    if let Some(home) = env_path("HF_HOME") {
        return home.join("hub");
    }
    home_directory().join(".cache").join("huggingface").join("hub")
}

fn env_path(key: &str) -> Option<Utf8PathBuf> {
    env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .map(Utf8PathBuf::from)
}

#[cfg(unix)]
fn data_base_directory() -> Option<Utf8PathBuf> {
    dirs::data_dir().and_then(|path| Utf8PathBuf::from_path_buf(path).ok())
}

#[cfg(not(unix))]
fn data_base_directory() -> Option<Utf8PathBuf> {
    None
}

#[cfg(unix)]
fn home_directory() -> Utf8PathBuf {
    dirs::home_dir()
        .and_then(|path| Utf8PathBuf::from_path_buf(path).ok())
        .unwrap_or_else(fallback_base_directory)
}

#[cfg(not(unix))]
fn home_directory() -> Utf8PathBuf {
    fallback_base_directory()
}

fn fallback_base_directory() -> Utf8PathBuf {
    let candidate = env::temp_dir();
    Utf8PathBuf::from_path_buf(candidate).unwrap_or_else(|_| Utf8PathBuf::from("/tmp"))
}

#[cfg(unix)]
fn user_namespace() -> String {
    let uid = unsafe { geteuid() };
    format!("uid-{uid}")
}

#[cfg(not(unix))]
fn user_namespace() -> String {
    String::from("shared")
}
