//! Reader for the flat `key value` node configuration format.
//!
//! One directive per line, split at the first run of whitespace. Blank lines
//! and `#` comments are skipped, as are directives without a value and keys
//! the node does not understand.

use std::str::FromStr;
use std::time::Duration;

use camino::Utf8PathBuf;

use crate::defaults::ALL_INTERFACES;
use crate::{Config, ConfigError, LogFormat};

/// Applies every directive in `text` to `config`, in file order.
pub(crate) fn apply(config: &mut Config, text: &str) -> Result<(), ConfigError> {
    for (index, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once(char::is_whitespace) else {
            continue;
        };
        let value = value.trim();
        if value.is_empty() {
            continue;
        }
        apply_directive(config, index + 1, key, value)?;
    }
    Ok(())
}

fn apply_directive(
    config: &mut Config,
    line: usize,
    key: &str,
    value: &str,
) -> Result<(), ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidValue {
        line,
        key: key.to_owned(),
        value: value.to_owned(),
        reason,
    };

    match key {
        "host_name" => config.host_name = value.to_owned(),
        "allow" => config.allow.push(value.to_owned()),
        "host" => config.bind_host = bind_host(value),
        "port" => {
            config.port = value
                .parse::<u16>()
                .map_err(|error| invalid(error.to_string()))?;
        }
        "plugins" => config.plugin_directory = Utf8PathBuf::from(value),
        "plugins_config" => config.plugin_config = Some(Utf8PathBuf::from(value)),
        "log_filter" => config.log_filter = value.to_owned(),
        "log_format" => {
            config.log_format =
                LogFormat::from_str(value).map_err(|error| invalid(error.to_string()))?;
        }
        "plugin_timeout" => {
            let seconds = value
                .parse::<u64>()
                .map_err(|error| invalid(error.to_string()))?;
            config.plugin_timeout = (seconds > 0).then(|| Duration::from_secs(seconds));
        }
        _ => {}
    }
    Ok(())
}

/// Maps the `*` wildcard onto the all-interfaces address.
pub(crate) fn bind_host(value: &str) -> String {
    if value == "*" || value.is_empty() {
        ALL_INTERFACES.to_owned()
    } else {
        value.to_owned()
    }
}
