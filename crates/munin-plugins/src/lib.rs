//! Plugin discovery and execution for the munin node.
//!
//! Plugins are executables installed in a single directory. The node lists
//! them by name and runs them on request, with no argument to fetch values or
//! with `config` to describe their graphs, relaying whatever they print on
//! standard output.
//!
//! Plugin names arrive from the network, so every run passes through the same
//! gates in order:
//!
//! 1. [`PluginPath::validate`] joins the name onto the plugin directory,
//!    requires the canonical result to sit strictly inside the canonical
//!    directory, and rejects symbolic links.
//! 2. [`EnvironmentResolver::resolve`] reads the plugin configuration file and
//!    builds an [`EnvironmentSet`] from every section whose header matches
//!    the plugin name.
//! 3. A [`PluginExecutor`] runs the plugin with that environment attached to
//!    the child process alone.
//!
//! # Example
//!
//! ```rust,no_run
//! use munin_plugins::{
//!     EnvironmentResolver, PluginDirectory, PluginMode, PluginRunner, ProcessExecutor,
//! };
//!
//! let runner = PluginRunner::new(
//!     PluginDirectory::new("/etc/munin/plugins"),
//!     EnvironmentResolver::new(Some("/etc/munin/plugin-conf.d/munin-node".into())),
//!     ProcessExecutor,
//! );
//! let output = runner.run("cpu", PluginMode::Fetch);
//! ```

pub mod containment;
pub mod directory;
pub mod environment;
pub mod error;
pub mod invocation;
pub mod process;
pub mod runner;

#[cfg(test)]
mod tests;

pub use self::containment::PluginPath;
pub use self::directory::PluginDirectory;
pub use self::environment::{EnvironmentResolver, EnvironmentSet, section_candidates};
pub use self::error::PluginError;
pub use self::invocation::{Invocation, PluginMode};
pub use self::process::ProcessExecutor;
pub use self::runner::{PluginExecutor, PluginRunner};
