//! Per-connection protocol state machine.
//!
//! A session writes the banner, then reads one request line at a time and
//! answers it until the client quits, the stream ends, or a request line is
//! rejected. Plugin failures are reported to the client as an unknown service
//! and never expose filesystem detail.

mod command;
mod errors;
mod reader;
mod service;

#[cfg(test)]
mod tests;

use std::io::{BufReader, Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;

use munin_plugins::{PluginError, PluginMode};
use tracing::{debug, info, warn};

use crate::transport::ConnectionHandler;

use self::command::Command;
pub use self::errors::ProtocolError;
use self::reader::read_line;
pub use self::service::PluginService;

const SESSION_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::session");

const CAPABILITIES_REPLY: &[u8] = b"cap multigraph\n";
const UNKNOWN_SERVICE_REPLY: &[u8] = b"# Unknown service\n.\n";
const USAGE_REPLY: &[u8] =
    b"# Unknown command. Try cap, list, nodes, config, fetch, version or quit\n";

/// How a session ended without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The client sent `quit`.
    Quit,
    /// The client closed its side of the stream.
    Disconnected,
}

/// Serves the node protocol on accepted connections.
#[derive(Clone)]
pub struct SessionHandler {
    host_name: String,
    plugins: Arc<dyn PluginService>,
}

impl SessionHandler {
    /// Builds a handler announcing `host_name` and answering from `plugins`.
    pub fn new(host_name: impl Into<String>, plugins: Arc<dyn PluginService>) -> Self {
        Self {
            host_name: host_name.into(),
            plugins,
        }
    }

    /// Host name used in the banner and in `nodes`/`version` replies.
    #[must_use]
    pub fn host_name(&self) -> &str {
        &self.host_name
    }

    /// Runs one session over the supplied byte streams.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError`] when a request line is too long or the
    /// connection fails.
    pub fn serve<R, W>(&self, reader: R, mut writer: W) -> Result<SessionEnd, ProtocolError>
    where
        R: Read,
        W: Write,
    {
        let mut reader = BufReader::new(reader);
        send(&mut writer, self.banner().as_bytes())?;
        loop {
            let Some(line) = read_line(&mut reader)? else {
                return Ok(SessionEnd::Disconnected);
            };
            let Some(reply) = self.respond(&line) else {
                return Ok(SessionEnd::Quit);
            };
            send(&mut writer, &reply)?;
        }
    }

    fn banner(&self) -> String {
        format!("# munin node at {}\n", self.host_name)
    }

    /// Produces the reply for one request line, or `None` to close.
    fn respond(&self, line: &str) -> Option<Vec<u8>> {
        let reply = match Command::parse(line) {
            Command::Cap => CAPABILITIES_REPLY.to_vec(),
            Command::Version => format!(
                "munins node on {} version: {}\n",
                self.host_name,
                env!("CARGO_PKG_VERSION")
            )
            .into_bytes(),
            Command::Nodes => format!("{}\n.\n", self.host_name).into_bytes(),
            Command::List => {
                let mut names = self.plugins.list().join(" ");
                names.push('\n');
                names.into_bytes()
            }
            Command::Config(Some(name)) => self.plugin_reply(name, PluginMode::Config),
            Command::Fetch(Some(name)) => self.plugin_reply(name, PluginMode::Fetch),
            Command::Config(None) | Command::Fetch(None) => UNKNOWN_SERVICE_REPLY.to_vec(),
            Command::Quit => return None,
            Command::Unknown => USAGE_REPLY.to_vec(),
        };
        Some(reply)
    }

    fn plugin_reply(&self, name: &str, mode: PluginMode) -> Vec<u8> {
        match self.plugins.run(name, mode) {
            Ok(mut output) => {
                if output.last().is_some_and(|byte| *byte != b'\n') {
                    output.push(b'\n');
                }
                output.extend_from_slice(b".\n");
                output
            }
            Err(error) => {
                log_plugin_failure(name, mode, &error);
                UNKNOWN_SERVICE_REPLY.to_vec()
            }
        }
    }
}

fn log_plugin_failure(name: &str, mode: PluginMode, error: &PluginError) {
    if error.is_security_violation() {
        warn!(
            target: SESSION_TARGET,
            plugin = name,
            %mode,
            %error,
            "rejected plugin request"
        );
    } else {
        warn!(
            target: SESSION_TARGET,
            plugin = name,
            %mode,
            %error,
            "plugin run failed"
        );
    }
}

fn send<W: Write>(writer: &mut W, bytes: &[u8]) -> Result<(), ProtocolError> {
    writer.write_all(bytes)?;
    writer.flush()?;
    Ok(())
}

impl ConnectionHandler for SessionHandler {
    fn handle(&self, stream: TcpStream, peer: SocketAddr) {
        debug!(target: SESSION_TARGET, %peer, "session opened");
        match self.serve(&stream, &stream) {
            Ok(end) => debug!(target: SESSION_TARGET, %peer, ?end, "session closed"),
            Err(error) => info!(target: SESSION_TARGET, %peer, %error, "session aborted"),
        }
    }
}
