//! Munin node daemon.
//!
//! The daemon answers collectors over a line-oriented TCP protocol. Each
//! accepted peer is checked against the configured `allow` rules, then served
//! on its own thread: `list` enumerates the plugin directory, and `config`
//! and `fetch` run a contained plugin executable with the environment
//! resolved for its name.
//!
//! Start-up follows a fixed sequence. Configuration is loaded from the node
//! file and command-line flags, structured telemetry is installed, the
//! listener is bound, and the process then waits for a termination signal.
//! Health hooks emit a structured event at each stage.

pub mod access;
mod bootstrap;
mod health;
mod process;
mod session;
mod telemetry;
mod transport;

pub use access::{AccessGuard, is_allowed, peer_text};
pub use bootstrap::{
    BootstrapError, ConfigLoader, Daemon, StaticConfigLoader, SystemConfigLoader, bootstrap_with,
};
pub use health::{HealthReporter, StructuredHealthReporter};
pub use process::{
    LaunchError, ShutdownError, ShutdownSignal, SystemShutdownSignal, run_daemon, run_daemon_with,
};
pub use session::{PluginService, ProtocolError, SessionEnd, SessionHandler};
pub use telemetry::{TelemetryError, TelemetryHandle};
pub use transport::{ConnectionHandler, ListenerError, ListenerHandle, SocketListener};

#[cfg(test)]
mod tests;
