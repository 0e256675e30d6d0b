//! Per-invocation environment resolution from the plugin configuration file.
//!
//! The file is INI-like: `[section]` headers followed by `env.KEY value`
//! lines. A section applies to a plugin when its header names `*` or one of
//! the plugin's underscore-delimited prefixes followed by `_*`. Matching
//! sections contribute their assignments in file order, so a later
//! assignment to the same key wins.
//!
//! Every resolution builds a fresh [`EnvironmentSet`] that is handed to
//! exactly one subprocess. Nothing is staged in the daemon's own process
//! environment.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::error::PluginError;

const ENVIRONMENT_TARGET: &str = "munin_plugins::environment";
const GLOBAL_SECTION: &str = "*";
const ENV_PREFIX: &str = "env.";

/// Environment variables visible to a single plugin invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvironmentSet {
    variables: BTreeMap<String, String>,
}

impl EnvironmentSet {
    /// Creates an empty set.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            variables: BTreeMap::new(),
        }
    }

    /// Assigns `value` to `key`, replacing any earlier assignment.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.variables.insert(key.into(), value.into());
    }

    /// Returns the value assigned to `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.variables.get(key).map(String::as_str)
    }

    /// Number of assigned variables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.variables.len()
    }

    /// Returns `true` when no variable is assigned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// Iterates over assignments in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.variables
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for EnvironmentSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut set = Self::new();
        for (key, value) in iter {
            set.insert(key, value);
        }
        set
    }
}

/// Section headers that apply to `plugin`: `*` followed by each
/// underscore-delimited prefix suffixed with `_*`, longest first.
///
/// `diskio_sda` yields `["*", "diskio_sda_*", "diskio_*"]`.
#[must_use]
pub fn section_candidates(plugin: &str) -> Vec<String> {
    let tokens: Vec<&str> = plugin.split('_').collect();
    let mut candidates = Vec::with_capacity(tokens.len() + 1);
    candidates.push(GLOBAL_SECTION.to_owned());
    for count in (1..=tokens.len()).rev() {
        let prefix = tokens.get(..count).unwrap_or_default().join("_");
        candidates.push(format!("{prefix}_*"));
    }
    candidates
}

/// Resolves plugin environments from an optional configuration file.
#[derive(Debug, Clone, Default)]
pub struct EnvironmentResolver {
    config_path: Option<PathBuf>,
}

impl EnvironmentResolver {
    /// Creates a resolver reading `config_path`; `None` yields empty sets.
    #[must_use]
    pub fn new(config_path: Option<PathBuf>) -> Self {
        Self { config_path }
    }

    /// Configured environment file, if any.
    #[must_use]
    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    /// Reads the configuration file afresh and resolves `plugin`'s variables.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::ConfigRead`] when the file cannot be opened or
    /// read, and [`PluginError::InvalidConfigLine`] for an `env.` line
    /// without a value inside an applicable section.
    pub fn resolve(&self, plugin: &str) -> Result<EnvironmentSet, PluginError> {
        let Some(path) = self.config_path.as_deref() else {
            return Ok(EnvironmentSet::new());
        };
        let file = File::open(path).map_err(|source| PluginError::ConfigRead {
            path: path.to_path_buf(),
            source: Arc::new(source),
        })?;
        let environment = resolve_from_reader(BufReader::new(file), path, plugin)?;
        debug!(
            target: ENVIRONMENT_TARGET,
            plugin,
            variables = environment.len(),
            "resolved plugin environment"
        );
        Ok(environment)
    }
}

/// Resolves `plugin`'s variables from configuration text read from `reader`.
///
/// `path` is used only for error reporting.
///
/// # Errors
///
/// See [`EnvironmentResolver::resolve`].
pub fn resolve_from_reader(
    reader: impl BufRead,
    path: &Path,
    plugin: &str,
) -> Result<EnvironmentSet, PluginError> {
    let candidates = section_candidates(plugin);
    let mut environment = EnvironmentSet::new();
    let mut section_open = false;

    for (index, read) in reader.lines().enumerate() {
        let raw = read.map_err(|source| PluginError::ConfigRead {
            path: path.to_path_buf(),
            source: Arc::new(source),
        })?;
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if let Some(header) = section_header(line) {
            section_open = candidates.iter().any(|candidate| candidate == header);
            continue;
        }

        if !section_open {
            continue;
        }
        let Some(assignment) = line.strip_prefix(ENV_PREFIX) else {
            continue;
        };
        let (key, value) = split_assignment(assignment).ok_or_else(|| {
            PluginError::InvalidConfigLine {
                path: path.to_path_buf(),
                line_number: index + 1,
                line: line.to_owned(),
            }
        })?;
        environment.insert(key, value);
    }

    Ok(environment)
}

fn section_header(line: &str) -> Option<&str> {
    line.strip_prefix('[')?.strip_suffix(']')
}

fn split_assignment(assignment: &str) -> Option<(&str, &str)> {
    let (key, value) = assignment.split_once(char::is_whitespace)?;
    let value = value.trim();
    (!key.is_empty() && !value.is_empty()).then_some((key, value))
}
