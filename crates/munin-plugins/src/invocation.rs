//! A single, fully validated plugin run.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use crate::containment::PluginPath;
use crate::environment::EnvironmentSet;

/// Which plugin operation a run performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginMode {
    /// Fetch current values; the plugin receives no argument.
    Fetch,
    /// Describe graphs and fields; the plugin receives `config`.
    Config,
}

impl PluginMode {
    /// Positional argument passed to the plugin, if any.
    #[must_use]
    pub const fn argument(self) -> Option<&'static str> {
        match self {
            Self::Fetch => None,
            Self::Config => Some("config"),
        }
    }
}

impl fmt::Display for PluginMode {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(match self {
            Self::Fetch => "fetch",
            Self::Config => "config",
        })
    }
}

/// Everything an executor needs to run one plugin.
///
/// The environment belongs to this invocation alone and is handed to the
/// child process without touching the daemon's own environment.
#[derive(Debug, Clone)]
pub struct Invocation {
    name: String,
    executable: PluginPath,
    mode: PluginMode,
    environment: EnvironmentSet,
    timeout: Option<Duration>,
}

impl Invocation {
    /// Builds an invocation from a validated executable path.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        executable: PluginPath,
        mode: PluginMode,
        environment: EnvironmentSet,
        timeout: Option<Duration>,
    ) -> Self {
        Self {
            name: name.into(),
            executable,
            mode,
            environment,
            timeout,
        }
    }

    /// Plugin name as requested by the client.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Validated executable path.
    #[must_use]
    pub fn executable(&self) -> &Path {
        self.executable.as_path()
    }

    /// Requested operation.
    #[must_use]
    pub const fn mode(&self) -> PluginMode {
        self.mode
    }

    /// Variables visible to the plugin process.
    #[must_use]
    pub const fn environment(&self) -> &EnvironmentSet {
        &self.environment
    }

    /// Upper bound on the run, if any.
    #[must_use]
    pub const fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}
