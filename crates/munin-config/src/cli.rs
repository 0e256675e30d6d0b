use camino::Utf8PathBuf;
use clap::Parser;

use crate::defaults::DEFAULT_CONFIG_PATH;
use crate::logging::LogFormat;

/// Command-line flags accepted by the node daemon.
///
/// Every flag except `--config` overrides the matching directive read from
/// the configuration file.
#[derive(Debug, Clone, Parser)]
#[command(name = "munind", version, about = "Munin-compatible monitoring node")]
pub struct CliOverrides {
    /// Path to the node configuration file.
    #[arg(long = "config", value_name = "PATH", default_value = DEFAULT_CONFIG_PATH)]
    pub config_path: Utf8PathBuf,
    /// Address to listen on; `*` binds every interface.
    #[arg(long, value_name = "HOST")]
    pub host: Option<String>,
    /// TCP port to listen on.
    #[arg(long, value_name = "PORT")]
    pub port: Option<u16>,
    /// Tracing filter expression, e.g. `munind=debug`.
    #[arg(long, value_name = "FILTER")]
    pub log_filter: Option<String>,
    /// Log output format.
    #[arg(long, value_name = "FORMAT")]
    pub log_format: Option<LogFormat>,
}
