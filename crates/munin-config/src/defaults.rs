use std::time::Duration;

/// TCP port munin collectors expect a node to listen on.
pub const DEFAULT_PORT: u16 = 4949;

/// Address bound when the configuration asks for all interfaces. The IPv6
/// wildcard accepts IPv4 peers too on dual-stack hosts.
pub const ALL_INTERFACES: &str = "::";

/// Startup configuration file read when no `--config` flag is supplied.
pub const DEFAULT_CONFIG_PATH: &str = "node.conf";

/// Directory holding plugin executables when none is configured.
pub const DEFAULT_PLUGIN_DIRECTORY: &str = "/etc/munin/plugins";

/// Default log filter expression used by the daemon.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Upper bound on a single plugin invocation.
pub const DEFAULT_PLUGIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Host name reported when the system one cannot be determined.
pub const FALLBACK_HOST_NAME: &str = "localhost.localdomain";

/// Returns the host name advertised to collectors when `host_name` is unset.
#[must_use]
pub fn default_host_name() -> String {
    system_host_name().unwrap_or_else(|| FALLBACK_HOST_NAME.to_owned())
}

#[cfg(unix)]
fn system_host_name() -> Option<String> {
    let mut buffer = [0_u8; 256];
    let status = unsafe { libc::gethostname(buffer.as_mut_ptr().cast(), buffer.len()) };
    if status != 0 {
        return None;
    }
    let end = buffer.iter().position(|byte| *byte == 0).unwrap_or(buffer.len());
    let name = String::from_utf8_lossy(buffer.get(..end)?).trim().to_owned();
    (!name.is_empty()).then_some(name)
}

#[cfg(not(unix))]
fn system_host_name() -> Option<String> {
    std::env::var("COMPUTERNAME")
        .ok()
        .filter(|name| !name.trim().is_empty())
}
