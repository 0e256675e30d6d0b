//! Read-only view of the installed plugin directory.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::warn;

const DIRECTORY_TARGET: &str = "munin_plugins::directory";

/// Enumerates plugins installed in a directory.
#[derive(Debug, Clone)]
pub struct PluginDirectory {
    path: PathBuf,
}

impl PluginDirectory {
    /// Creates a view over `path`. The directory is not touched until queried.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Directory root.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Names of every non-directory entry, sorted by name.
    ///
    /// A directory that cannot be read yields an empty list and a warning.
    /// Names that are not valid UTF-8 are skipped.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let entries = match fs::read_dir(&self.path) {
            Ok(entries) => entries,
            Err(error) => {
                warn!(
                    target: DIRECTORY_TARGET,
                    directory = %self.path.display(),
                    %error,
                    "failed to read plugin directory"
                );
                return Vec::new();
            }
        };

        let mut names: Vec<String> = entries
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_ok_and(|kind| !kind.is_dir()))
            .filter_map(|entry| entry.file_name().into_string().ok())
            .collect();
        names.sort_unstable();
        names
    }
}
