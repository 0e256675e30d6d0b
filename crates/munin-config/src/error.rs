use camino::Utf8PathBuf;
use thiserror::Error;

/// Errors raised while loading the node configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be opened or read.
    #[error("failed to read configuration file '{path}': {source}")]
    Read {
        /// File that was being read.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
    /// A directive carried a value that could not be interpreted.
    #[error("line {line}: invalid value '{value}' for '{key}': {reason}")]
    InvalidValue {
        /// One-based line number of the offending directive.
        line: usize,
        /// Directive key.
        key: String,
        /// Raw directive value.
        value: String,
        /// Why the value was rejected.
        reason: String,
    },
}
