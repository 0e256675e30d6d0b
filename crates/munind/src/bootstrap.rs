//! Daemon bootstrap orchestration.

use std::sync::Arc;

use munin_config::{CliOverrides, Config, ConfigError};
use munin_plugins::{EnvironmentResolver, PluginDirectory, PluginRunner, ProcessExecutor};
use thiserror::Error;

use crate::access::AccessGuard;
use crate::health::HealthReporter;
use crate::session::SessionHandler;
use crate::telemetry::{self, TelemetryError, TelemetryHandle};

/// Trait abstracting configuration loading for testability.
pub trait ConfigLoader: Send + Sync {
    /// Loads the daemon configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the configuration cannot be read or a
    /// value is invalid.
    fn load(&self) -> Result<Config, ConfigError>;
}

/// Loader that reads the node file named on the command line and applies
/// the remaining flags on top.
#[derive(Debug, Clone)]
pub struct SystemConfigLoader {
    overrides: CliOverrides,
}

impl SystemConfigLoader {
    /// Builds a loader from parsed command-line flags.
    #[must_use]
    pub const fn new(overrides: CliOverrides) -> Self {
        Self { overrides }
    }
}

impl ConfigLoader for SystemConfigLoader {
    fn load(&self) -> Result<Config, ConfigError> {
        Config::load_with(&self.overrides)
    }
}

/// Loader that hands out a configuration resolved elsewhere.
#[derive(Debug, Clone)]
pub struct StaticConfigLoader {
    config: Config,
}

impl StaticConfigLoader {
    /// Wraps an already resolved configuration.
    #[must_use]
    pub const fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self) -> Result<Config, ConfigError> {
        Ok(self.config.clone())
    }
}

/// Errors surfaced during bootstrap.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Configuration failed to load.
    #[error("failed to load configuration: {source}")]
    Configuration {
        /// Underlying loader error.
        #[source]
        source: ConfigError,
    },
    /// Telemetry initialisation failed.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        /// Underlying telemetry error.
        #[source]
        source: TelemetryError,
    },
}

/// Result of a successful bootstrap invocation.
pub struct Daemon {
    config: Config,
    telemetry: TelemetryHandle,
    reporter: Arc<dyn HealthReporter>,
}

impl Daemon {
    /// Accessor for the resolved configuration.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Accessor for the telemetry handle, primarily useful for testing.
    #[must_use]
    pub const fn telemetry(&self) -> TelemetryHandle {
        self.telemetry
    }

    /// Reporter that received the bootstrap events.
    #[must_use]
    pub fn reporter(&self) -> Arc<dyn HealthReporter> {
        Arc::clone(&self.reporter)
    }

    /// Compiles the configured `allow` rules.
    #[must_use]
    pub fn access_guard(&self) -> AccessGuard {
        AccessGuard::new(self.config.allow())
    }

    /// Builds the session handler backed by the configured plugin directory.
    #[must_use]
    pub fn session_handler(&self) -> SessionHandler {
        let directory = PluginDirectory::new(self.config.plugin_directory().as_std_path());
        let resolver = EnvironmentResolver::new(
            self.config
                .plugin_config()
                .map(|path| path.as_std_path().to_path_buf()),
        );
        let runner = PluginRunner::new(directory, resolver, ProcessExecutor)
            .with_timeout(self.config.plugin_timeout());
        SessionHandler::new(self.config.host_name(), Arc::new(runner))
    }
}

/// Bootstraps the daemon using the supplied collaborators.
///
/// # Errors
///
/// Returns [`BootstrapError`] when configuration or telemetry fails. The
/// reporter is told about the failure before it is returned.
pub fn bootstrap_with(
    loader: &dyn ConfigLoader,
    reporter: Arc<dyn HealthReporter>,
) -> Result<Daemon, BootstrapError> {
    reporter.bootstrap_starting();

    let config = match loader.load() {
        Ok(config) => config,
        Err(source) => {
            let error = BootstrapError::Configuration { source };
            reporter.bootstrap_failed(&error);
            return Err(error);
        }
    };

    let telemetry = match telemetry::initialise(&config) {
        Ok(handle) => handle,
        Err(source) => {
            let error = BootstrapError::Telemetry { source };
            reporter.bootstrap_failed(&error);
            return Err(error);
        }
    };

    reporter.bootstrap_succeeded(&config);
    Ok(Daemon {
        config,
        telemetry,
        reporter,
    })
}
