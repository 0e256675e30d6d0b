//! Domain errors raised by plugin operations.
//!
//! All errors use `thiserror`-derived enums with structured context so callers
//! can inspect the failure programmatically. I/O errors are wrapped in `Arc`
//! to satisfy the `result_large_err` Clippy lint.

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

/// Errors arising from plugin lookup, environment resolution and execution.
#[derive(Debug, Error)]
pub enum PluginError {
    /// The requested name is empty or contains a path separator.
    #[error("plugin name '{name}' is not a plain file name")]
    InvalidName {
        /// Name that was requested.
        name: String,
    },

    /// No directory entry exists for the requested plugin.
    #[error("plugin '{name}' not found at {path}")]
    NotFound {
        /// Name that was requested.
        name: String,
        /// Candidate path that was checked.
        path: PathBuf,
    },

    /// The plugin resolved to a location outside the plugin directory.
    #[error("plugin '{name}' resolves to {resolved}, outside {directory}")]
    OutsideDirectory {
        /// Name that was requested.
        name: String,
        /// Canonical location of the candidate.
        resolved: PathBuf,
        /// Canonical plugin directory.
        directory: PathBuf,
    },

    /// The plugin directory entry is a symbolic link.
    #[error("plugin '{name}' is a symbolic link: {path}")]
    SymbolicLink {
        /// Name that was requested.
        name: String,
        /// Path of the link.
        path: PathBuf,
    },

    /// The plugin directory entry is not a regular file.
    #[error("plugin '{name}' is not a regular file: {path}")]
    NotAFile {
        /// Name that was requested.
        name: String,
        /// Path of the entry.
        path: PathBuf,
    },

    /// The plugin environment file could not be read.
    #[error("failed to read plugin configuration {path}: {source}")]
    ConfigRead {
        /// Environment file path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// An `env.` line in the plugin environment file has no value.
    #[error("invalid line format at {path}:{line_number}: {line}")]
    InvalidConfigLine {
        /// Environment file path.
        path: PathBuf,
        /// One-based line number.
        line_number: usize,
        /// Offending line, trimmed.
        line: String,
    },

    /// The plugin process could not be spawned.
    #[error("plugin '{name}' failed to start: {message}")]
    SpawnFailed {
        /// Plugin name.
        name: String,
        /// Human-readable failure description.
        message: String,
        /// Optional underlying I/O error.
        #[source]
        source: Option<Arc<std::io::Error>>,
    },

    /// The plugin did not complete within the configured timeout.
    #[error("plugin '{name}' timed out after {timeout_secs}s")]
    Timeout {
        /// Plugin name.
        name: String,
        /// Configured timeout in seconds.
        timeout_secs: u64,
    },

    /// The plugin exited with a non-zero status code.
    #[error("plugin '{name}' exited with non-zero status {status}")]
    NonZeroExit {
        /// Plugin name.
        name: String,
        /// Process exit status, `-1` when terminated by a signal.
        status: i32,
    },

    /// An I/O error occurred while communicating with the plugin process.
    #[error("I/O error communicating with plugin '{name}': {source}")]
    Io {
        /// Plugin name.
        name: String,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },
}

impl PluginError {
    /// Returns `true` for failures of the path containment and link checks.
    ///
    /// These are logged with full detail locally and never described to
    /// network clients.
    #[must_use]
    pub const fn is_security_violation(&self) -> bool {
        matches!(
            self,
            Self::InvalidName { .. }
                | Self::OutsideDirectory { .. }
                | Self::SymbolicLink { .. }
                | Self::NotAFile { .. }
        )
    }
}
