//! Seam between the protocol and plugin execution.

use munin_plugins::{PluginError, PluginExecutor, PluginMode, PluginRunner};

/// Plugin operations needed by a session.
pub trait PluginService: Send + Sync {
    /// Names offered by `list`.
    fn list(&self) -> Vec<String>;

    /// Runs `name` in `mode` and returns its standard output.
    ///
    /// # Errors
    ///
    /// Returns any validation, configuration, or execution failure.
    fn run(&self, name: &str, mode: PluginMode) -> Result<Vec<u8>, PluginError>;
}

impl<E> PluginService for PluginRunner<E>
where
    E: PluginExecutor + Send + Sync,
{
    fn list(&self) -> Vec<String> {
        PluginRunner::list(self)
    }

    fn run(&self, name: &str, mode: PluginMode) -> Result<Vec<u8>, PluginError> {
        PluginRunner::run(self, name, mode)
    }
}
