//! Supervises daemon launch sequencing and runtime orchestration.

use std::sync::Arc;

use munin_config::CliOverrides;
use tracing::info;

use crate::StructuredHealthReporter;
use crate::bootstrap::{ConfigLoader, SystemConfigLoader, bootstrap_with};
use crate::health::HealthReporter;
use crate::transport::SocketListener;

use super::PROCESS_TARGET;
use super::errors::LaunchError;
use super::shutdown::{ShutdownSignal, SystemShutdownSignal};

/// Runs the daemon in the foreground using the production collaborators.
///
/// # Errors
///
/// Returns [`LaunchError`] when bootstrap, binding, or signal handling fails.
pub fn run_daemon(overrides: CliOverrides) -> Result<(), LaunchError> {
    let loader = SystemConfigLoader::new(overrides);
    let reporter = Arc::new(StructuredHealthReporter::new());
    run_daemon_with(&loader, reporter, &SystemShutdownSignal::new())
}

/// Runs the daemon with injected collaborators.
///
/// Returns once `shutdown` fires and the accept loop has stopped. Sessions
/// already in progress run to completion on their own threads.
///
/// # Errors
///
/// Returns [`LaunchError`] when bootstrap, binding, or signal handling fails.
pub fn run_daemon_with<S>(
    loader: &dyn ConfigLoader,
    reporter: Arc<dyn HealthReporter>,
    shutdown: &S,
) -> Result<(), LaunchError>
where
    S: ShutdownSignal + ?Sized,
{
    let daemon = bootstrap_with(loader, Arc::clone(&reporter))?;
    let config = daemon.config();
    info!(
        target: PROCESS_TARGET,
        host = config.bind_host(),
        port = config.port(),
        "starting node runtime"
    );

    let listener = SocketListener::bind(config.bind_host(), config.port())?;
    let handler = Arc::new(daemon.session_handler());
    let guard = Arc::new(daemon.access_guard());
    let listener_handle = listener.start(handler, guard)?;
    reporter.listener_ready(listener_handle.local_addr());

    shutdown.wait()?;
    listener_handle.shutdown();
    listener_handle.join()?;
    reporter.shutdown_completed();
    Ok(())
}
