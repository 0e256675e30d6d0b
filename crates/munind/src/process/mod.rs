//! Daemon process supervision: launch sequencing and shutdown handling.

mod errors;
mod launch;
pub(crate) mod shutdown;


pub use errors::LaunchError;
pub use launch::{run_daemon, run_daemon_with};
pub use shutdown::{ShutdownError, ShutdownSignal, SystemShutdownSignal};

pub(crate) const PROCESS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::process");
