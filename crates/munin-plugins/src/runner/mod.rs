//! Plugin runner orchestrating lookup, validation and execution.
//!
//! The [`PluginRunner`] is the API the daemon calls for `list`, `config` and
//! `fetch`. Each run re-validates the requested name against the plugin
//! directory, resolves a fresh environment, and delegates to a
//! [`PluginExecutor`]. Nothing about a plugin is cached between runs, so a
//! file replaced after `list` is checked again before it executes.
//!
//! The executor abstraction enables test doubles that return pre-configured
//! output without spawning real processes.

use std::time::Duration;

use tracing::debug;

use crate::containment::PluginPath;
use crate::directory::PluginDirectory;
use crate::environment::EnvironmentResolver;
use crate::error::PluginError;
use crate::invocation::{Invocation, PluginMode};

const RUNNER_TARGET: &str = "munin_plugins::runner";

/// Trait abstracting plugin process execution for testability.
///
/// The production implementation is
/// [`ProcessExecutor`](crate::process::ProcessExecutor), which spawns a
/// child process. Test code can implement this trait to inject canned output.
pub trait PluginExecutor {
    /// Runs the plugin described by `invocation` and returns its standard
    /// output.
    ///
    /// # Errors
    ///
    /// Returns a [`PluginError`] if the plugin cannot be spawned, times out,
    /// or exits with a non-zero status.
    fn execute(&self, invocation: &Invocation) -> Result<Vec<u8>, PluginError>;
}

/// Composes the plugin directory, environment resolver and executor.
#[derive(Debug)]
pub struct PluginRunner<E> {
    directory: PluginDirectory,
    resolver: EnvironmentResolver,
    executor: E,
    timeout: Option<Duration>,
}

impl<E> PluginRunner<E> {
    /// Creates a runner with no execution bound.
    #[must_use]
    pub const fn new(directory: PluginDirectory, resolver: EnvironmentResolver, executor: E) -> Self {
        Self {
            directory,
            resolver,
            executor,
            timeout: None,
        }
    }

    /// Sets the upper bound applied to every run.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Plugin directory consulted by this runner.
    #[must_use]
    pub const fn directory(&self) -> &PluginDirectory {
        &self.directory
    }

    /// Names of installed plugins.
    #[must_use]
    pub fn list(&self) -> Vec<String> {
        self.directory.names()
    }
}

impl<E: PluginExecutor> PluginRunner<E> {
    /// Validates `name`, resolves its environment and runs it in `mode`.
    ///
    /// # Errors
    ///
    /// Returns the first failing gate: a path security or lookup error from
    /// [`PluginPath::validate`], an environment error from
    /// [`EnvironmentResolver::resolve`], or any error produced by the
    /// executor.
    pub fn run(&self, name: &str, mode: PluginMode) -> Result<Vec<u8>, PluginError> {
        let executable = PluginPath::validate(self.directory.path(), name)?;
        let environment = self.resolver.resolve(name)?;
        debug!(
            target: RUNNER_TARGET,
            plugin = name,
            %mode,
            executable = %executable.as_path().display(),
            variables = environment.len(),
            "running plugin"
        );
        let invocation = Invocation::new(name, executable, mode, environment, self.timeout);
        self.executor.execute(&invocation)
    }
}
