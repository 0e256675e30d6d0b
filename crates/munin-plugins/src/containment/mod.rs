//! Path containment and link checks applied before every plugin run.
//!
//! A plugin name is never trusted. Each lookup joins it onto the plugin
//! directory and first refuses a directory entry that is a symbolic link,
//! whatever it points at, even nothing. It then canonicalises both sides and
//! requires the candidate to sit strictly below the directory on a
//! path-component boundary.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::PluginError;

/// An executable path that passed the containment and link checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginPath {
    path: PathBuf,
}

impl PluginPath {
    /// Validates that `name` denotes a regular file directly inside `directory`.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::InvalidName`] for empty names or names with a
    /// path separator, [`PluginError::NotFound`] when the candidate or the
    /// directory cannot be resolved, [`PluginError::OutsideDirectory`] when
    /// the canonical candidate escapes the canonical directory,
    /// [`PluginError::SymbolicLink`] for links and
    /// [`PluginError::NotAFile`] for anything other than a regular file.
    pub fn validate(directory: &Path, name: &str) -> Result<Self, PluginError> {
        if !is_plain_name(name) {
            return Err(PluginError::InvalidName {
                name: name.to_owned(),
            });
        }

        let candidate = directory.join(name);
        let not_found = || PluginError::NotFound {
            name: name.to_owned(),
            path: candidate.clone(),
        };
        // Checked on the entry itself so dangling links are still links.
        let metadata = fs::symlink_metadata(&candidate).map_err(|_| not_found())?;
        if metadata.file_type().is_symlink() {
            return Err(PluginError::SymbolicLink {
                name: name.to_owned(),
                path: candidate,
            });
        }

        let root = directory.canonicalize().map_err(|_| not_found())?;
        let resolved = candidate.canonicalize().map_err(|_| not_found())?;
        if !is_strictly_within(&root, &resolved) {
            return Err(PluginError::OutsideDirectory {
                name: name.to_owned(),
                resolved,
                directory: root,
            });
        }
        if !metadata.is_file() {
            return Err(PluginError::NotAFile {
                name: name.to_owned(),
                path: candidate,
            });
        }

        Ok(Self { path: resolved })
    }

    /// Canonical path of the validated executable.
    #[must_use]
    pub fn as_path(&self) -> &Path {
        &self.path
    }

    /// Consumes the value, returning the canonical path.
    #[must_use]
    pub fn into_path_buf(self) -> PathBuf {
        self.path
    }
}

impl AsRef<Path> for PluginPath {
    fn as_ref(&self) -> &Path {
        &self.path
    }
}

fn is_plain_name(name: &str) -> bool {
    !name.is_empty() && !name.contains(['/', '\\', '\0'])
}

/// Component-wise containment: `/plugins-evil/x` is not within `/plugins`,
/// and the directory is not within itself.
pub(crate) fn is_strictly_within(root: &Path, candidate: &Path) -> bool {
    candidate != root && candidate.starts_with(root)
}
