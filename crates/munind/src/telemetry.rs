//! Structured telemetry initialisation for the node daemon.

use std::io::{self, IsTerminal};

use once_cell::sync::OnceCell;
use tracing::level_filters::LevelFilter;
use tracing::{Subscriber, subscriber::SetGlobalDefaultError};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;

use munin_config::{Config, LogFormat};

static TELEMETRY_GUARD: OnceCell<()> = OnceCell::new();

/// Crates whose records follow a bare `log_filter` level.
const NODE_TARGETS: [&str; 2] = ["munind", "munin_plugins"];

/// Level kept for every other target when `log_filter` is a bare level.
const DEPENDENCY_LEVEL: &str = "warn";

/// Handle returned when telemetry has been initialised.
#[derive(Debug, Default, Clone, Copy)]
pub struct TelemetryHandle;

/// Errors encountered while configuring telemetry.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// Failed to parse the configured log filter expression.
    #[error("invalid log filter: {0}")]
    Filter(String),
    /// Failed to install the tracing subscriber.
    #[error("failed to install telemetry subscriber: {0}")]
    Subscriber(SetGlobalDefaultError),
}

/// Configures the global tracing subscriber on first use.
///
/// A bare level such as `debug` applies to the node's own crates only, with
/// everything else held at `warn`. Any other value is used as a full
/// `EnvFilter` directive.
///
/// Later calls return a fresh [`TelemetryHandle`] without touching the
/// global subscriber, so the filter and format of the first call win.
///
/// # Errors
///
/// Returns [`TelemetryError::Filter`] when `log_filter` is not a valid
/// directive and [`TelemetryError::Subscriber`] when another subscriber was
/// installed outside this module.
pub fn initialise(config: &Config) -> Result<TelemetryHandle, TelemetryError> {
    TELEMETRY_GUARD
        .get_or_try_init(|| install_subscriber(config))
        .map(|_| TelemetryHandle)
}

fn install_subscriber(config: &Config) -> Result<(), TelemetryError> {
    let filter = EnvFilter::try_new(scoped_directive(config.log_filter()))
        .map_err(|error| TelemetryError::Filter(error.to_string()))?;

    let builder = |filter: EnvFilter| {
        fmt::Subscriber::builder()
            .with_env_filter(filter)
            .with_target(true)
            .with_level(true)
            .with_thread_ids(false)
            .with_thread_names(false)
            .with_writer(io::stderr)
            .with_ansi(io::stderr().is_terminal())
            .with_timer(fmt::time::UtcTime::rfc_3339())
    };

    let subscriber: Box<dyn Subscriber + Send + Sync> = match config.log_format() {
        LogFormat::Json => Box::new(builder(filter).json().flatten_event(true).finish()),
        LogFormat::Compact => Box::new(builder(filter).compact().finish()),
    };

    tracing::subscriber::set_global_default(subscriber).map_err(TelemetryError::Subscriber)
}

fn scoped_directive(log_filter: &str) -> String {
    let directive = log_filter.trim();
    if directive.parse::<LevelFilter>().is_err() {
        return directive.to_owned();
    }
    let mut scoped = String::from(DEPENDENCY_LEVEL);
    for target in NODE_TARGETS {
        scoped.push(',');
        scoped.push_str(target);
        scoped.push('=');
        scoped.push_str(directive);
    }
    scoped
}
