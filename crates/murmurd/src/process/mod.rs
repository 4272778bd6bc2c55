//! Process lifecycle: runtime files, shutdown coordination and the launch
//! sequence.

mod errors;
mod files;
mod guard;
pub(crate) mod launch;
pub(crate) mod shutdown;

pub use errors::LaunchError;
pub use launch::run_daemon;
pub use shutdown::{ShutdownContext, ShutdownReason};

pub(crate) const PROCESS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::process");
