//! Process-based plugin execution.
//!
//! [`ProcessExecutor`] implements the [`PluginExecutor`] trait by spawning the
//! plugin with at most one argument, passing the invocation's environment to
//! that child only, collecting standard output in full and enforcing the
//! invocation's timeout. Standard error is drained into the debug log and
//! never returned to the caller.
//!
//! The timeout covers the whole run, including draining the pipes, so a
//! plugin that leaves a background process holding its stdout open still
//! fails on time. On Unix each plugin leads its own process group and the
//! whole group is killed on expiry.

use std::io::{self, Read};
#[cfg(unix)]
use std::os::unix::process::CommandExt;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::error::PluginError;
use crate::invocation::Invocation;
use crate::runner::PluginExecutor;

/// Tracing target for plugin process operations.
const PLUGIN_TARGET: &str = "munin_plugins::process";

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Executes plugins by spawning child processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessExecutor;

impl PluginExecutor for ProcessExecutor {
    fn execute(&self, invocation: &Invocation) -> Result<Vec<u8>, PluginError> {
        execute_process(invocation)
    }
}

fn execute_process(invocation: &Invocation) -> Result<Vec<u8>, PluginError> {
    let name = invocation.name();
    let mut command = Command::new(invocation.executable());
    if let Some(argument) = invocation.mode().argument() {
        command.arg(argument);
    }
    command.envs(invocation.environment().iter());
    command.stdin(Stdio::null());
    command.stdout(Stdio::piped());
    command.stderr(Stdio::piped());
    #[cfg(unix)]
    command.process_group(0);

    debug!(
        target: PLUGIN_TARGET,
        plugin = name,
        executable = %invocation.executable().display(),
        mode = %invocation.mode(),
        "spawning plugin process"
    );

    let mut child = command.spawn().map_err(|err| PluginError::SpawnFailed {
        name: name.to_owned(),
        message: err.to_string(),
        source: Some(Arc::new(err)),
    })?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| PluginError::SpawnFailed {
            name: name.to_owned(),
            message: String::from("failed to capture stdout"),
            source: None,
        })?;
    let stdout_reader = spawn_reader(stdout);
    let stderr_reader = child.stderr.take().map(spawn_reader);

    let deadline = invocation.timeout().map(|timeout| Deadline::starting_now(name, timeout));
    let status = wait_for_exit(name, &mut child, deadline.as_ref())?;
    let output = collect_reader(name, &stdout_reader, &mut child, deadline.as_ref())?;
    if let Some(reader) = stderr_reader {
        log_stderr(name, &collect_reader(name, &reader, &mut child, deadline.as_ref())?);
    }

    if !status.success() {
        return Err(PluginError::NonZeroExit {
            name: name.to_owned(),
            status: status.code().unwrap_or(-1),
        });
    }

    debug!(
        target: PLUGIN_TARGET,
        plugin = name,
        output_bytes = output.len(),
        "plugin completed"
    );
    Ok(output)
}

/// Point in time by which the whole run must have finished.
struct Deadline {
    expires: Instant,
    timeout: Duration,
    name: String,
}

impl Deadline {
    fn starting_now(name: &str, timeout: Duration) -> Self {
        Self {
            expires: Instant::now() + timeout,
            timeout,
            name: name.to_owned(),
        }
    }

    fn remaining(&self) -> Duration {
        self.expires.saturating_duration_since(Instant::now())
    }

    fn has_passed(&self) -> bool {
        Instant::now() >= self.expires
    }

    /// Kills the plugin and everything it started, then builds the error.
    fn expire(&self, child: &mut Child) -> PluginError {
        warn!(
            target: PLUGIN_TARGET,
            plugin = self.name.as_str(),
            timeout_ms = self.timeout.as_millis(),
            "plugin timed out, killing process group"
        );
        terminate(child);
        PluginError::Timeout {
            name: self.name.clone(),
            timeout_secs: self.timeout.as_secs(),
        }
    }
}

/// Reads a pipe to its end on a helper thread so the child never blocks on a
/// full pipe buffer while the executor waits for it.
fn spawn_reader(mut pipe: impl Read + Send + 'static) -> Receiver<io::Result<Vec<u8>>> {
    let (sender, receiver) = mpsc::channel();
    thread::spawn(move || {
        let mut buffer = Vec::new();
        let result = pipe.read_to_end(&mut buffer).map(|_| buffer);
        drop(sender.send(result));
    });
    receiver
}

/// Waits for a pipe reader, giving up when the deadline passes.
fn collect_reader(
    name: &str,
    reader: &Receiver<io::Result<Vec<u8>>>,
    child: &mut Child,
    deadline: Option<&Deadline>,
) -> Result<Vec<u8>, PluginError> {
    let received = match deadline {
        None => reader
            .recv()
            .unwrap_or_else(|_| Err(io::Error::other("pipe reader stopped"))),
        Some(deadline) => match reader.recv_timeout(deadline.remaining()) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => return Err(deadline.expire(child)),
            Err(RecvTimeoutError::Disconnected) => Err(io::Error::other("pipe reader stopped")),
        },
    };
    received.map_err(|err| PluginError::Io {
        name: name.to_owned(),
        source: Arc::new(err),
    })
}

fn log_stderr(name: &str, stderr: &[u8]) {
    if stderr.is_empty() {
        return;
    }
    debug!(
        target: PLUGIN_TARGET,
        plugin = name,
        stderr = %String::from_utf8_lossy(stderr).trim(),
        "plugin stderr output"
    );
}

/// Waits for the child process to exit, enforcing the deadline.
fn wait_for_exit(
    name: &str,
    child: &mut Child,
    deadline: Option<&Deadline>,
) -> Result<ExitStatus, PluginError> {
    let io_error = |err: io::Error| PluginError::Io {
        name: name.to_owned(),
        source: Arc::new(err),
    };
    let Some(deadline) = deadline else {
        return child.wait().map_err(io_error);
    };

    loop {
        if let Some(status) = child.try_wait().map_err(io_error)? {
            debug!(target: PLUGIN_TARGET, plugin = name, ?status, "plugin process exited");
            return Ok(status);
        }
        if deadline.has_passed() {
            return Err(deadline.expire(child));
        }
        thread::sleep(POLL_INTERVAL.min(deadline.remaining()));
    }
}

fn terminate(child: &mut Child) {
    #[cfg(unix)]
    kill_process_group(child.id());
    drop(child.kill());
    drop(child.wait());
}

/// Sends `SIGKILL` to the group led by `leader`, reaching any descendants
/// that still hold the plugin's pipes.
#[cfg(unix)]
fn kill_process_group(leader: u32) {
    let Ok(group) = libc::pid_t::try_from(leader) else {
        return;
    };
    // SAFETY: `kill` takes plain integers and has no memory-safety
    // preconditions; a stale group id only yields ESRCH.
    let status = unsafe { libc::kill(-group, libc::SIGKILL) };
    if status != 0 {
        debug!(
            target: PLUGIN_TARGET,
            group,
            error = %io::Error::last_os_error(),
            "process group already gone"
        );
    }
}

#[cfg(all(test, unix))]
mod tests;
