//! Shared configuration for the munin node daemon.
//!
//! The node reads a flat `key value` file once at startup and never mutates
//! the result afterwards. [`Config`] is that immutable snapshot: the host name
//! echoed to collectors, the listen address, the `allow` patterns guarding
//! connections, and the plugin directory and environment file consulted on
//! every plugin invocation. Command-line flags parsed into [`CliOverrides`]
//! take precedence over the file.

mod cli;
mod defaults;
mod error;
mod logging;
mod node_file;

use std::fs;
use std::str::FromStr;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};

pub use cli::CliOverrides;
pub use defaults::{
    ALL_INTERFACES, DEFAULT_CONFIG_PATH, DEFAULT_LOG_FILTER, DEFAULT_PLUGIN_DIRECTORY,
    DEFAULT_PLUGIN_TIMEOUT, DEFAULT_PORT, FALLBACK_HOST_NAME, default_host_name,
};
pub use error::ConfigError;
pub use logging::{LogFormat, LogFormatParseError};

/// Immutable node identity and runtime settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    host_name: String,
    allow: Vec<String>,
    bind_host: String,
    port: u16,
    plugin_directory: Utf8PathBuf,
    plugin_config: Option<Utf8PathBuf>,
    log_filter: String,
    log_format: LogFormat,
    plugin_timeout: Option<Duration>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host_name: default_host_name(),
            allow: Vec::new(),
            bind_host: ALL_INTERFACES.to_owned(),
            port: DEFAULT_PORT,
            plugin_directory: Utf8PathBuf::from(DEFAULT_PLUGIN_DIRECTORY),
            plugin_config: None,
            log_filter: DEFAULT_LOG_FILTER.to_owned(),
            log_format: LogFormat::default(),
            plugin_timeout: Some(DEFAULT_PLUGIN_TIMEOUT),
        }
    }
}

impl Config {
    /// Loads the configuration file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] when the file cannot be read and
    /// [`ConfigError::InvalidValue`] when a directive is malformed.
    pub fn load(path: &Utf8Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        text.parse()
    }

    /// Loads the file named by `overrides` and applies the flag overrides.
    ///
    /// # Errors
    ///
    /// Propagates any error reported by [`Config::load`].
    pub fn load_with(overrides: &CliOverrides) -> Result<Self, ConfigError> {
        let mut config = Self::load(&overrides.config_path)?;
        config.apply_overrides(overrides);
        Ok(config)
    }

    /// Applies command-line overrides on top of file values.
    pub fn apply_overrides(&mut self, overrides: &CliOverrides) {
        if let Some(host) = &overrides.host {
            self.bind_host = node_file::bind_host(host);
        }
        if let Some(port) = overrides.port {
            self.port = port;
        }
        if let Some(filter) = &overrides.log_filter {
            self.log_filter.clone_from(filter);
        }
        if let Some(format) = overrides.log_format {
            self.log_format = format;
        }
    }

    /// Host name echoed in the banner and `nodes` reply.
    #[must_use]
    pub fn host_name(&self) -> &str {
        &self.host_name
    }

    /// Address patterns permitted to connect, in file order.
    #[must_use]
    pub fn allow(&self) -> &[String] {
        &self.allow
    }

    /// Address the listener binds to.
    #[must_use]
    pub fn bind_host(&self) -> &str {
        &self.bind_host
    }

    /// Port the listener binds to.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Root directory of all plugin lookups.
    #[must_use]
    pub fn plugin_directory(&self) -> &Utf8Path {
        &self.plugin_directory
    }

    /// Plugin environment file, when one is configured.
    #[must_use]
    pub fn plugin_config(&self) -> Option<&Utf8Path> {
        self.plugin_config.as_deref()
    }

    /// Tracing filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Log output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Upper bound on a single plugin run; `None` waits indefinitely.
    #[must_use]
    pub const fn plugin_timeout(&self) -> Option<Duration> {
        self.plugin_timeout
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let mut config = Self::default();
        node_file::apply(&mut config, text)?;
        Ok(config)
    }
}
