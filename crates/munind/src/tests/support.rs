//! Test harness utilities for the daemon behavioural suites.

use std::fs;
use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use munin_config::{Config, ConfigError};
use tempfile::TempDir;

use crate::bootstrap::{
    BootstrapError, ConfigLoader, Daemon, StaticConfigLoader, bootstrap_with,
};
use crate::health::HealthReporter;
use crate::transport::SocketListener;

/// Scenario world shared across BDD steps.
pub struct TestWorld {
    plugins: TempDir,
    allow: Vec<String>,
    failing_loader: bool,
    pub reporter: Arc<RecordingHealthReporter>,
    daemon: Option<Daemon>,
    bootstrap_error: Option<BootstrapError>,
    transcript: Option<String>,
}

impl TestWorld {
    /// Builds a world with an empty plugin directory and a healthy loader.
    pub fn new() -> Self {
        Self {
            plugins: TempDir::new().expect("plugin directory"),
            allow: Vec::new(),
            failing_loader: false,
            reporter: Arc::new(RecordingHealthReporter::default()),
            daemon: None,
            bootstrap_error: None,
            transcript: None,
        }
    }

    /// Installs a loader that always fails.
    pub fn use_failing_loader(&mut self) {
        self.failing_loader = true;
    }

    /// Installs a loader that succeeds.
    pub fn use_successful_loader(&mut self) {
        self.failing_loader = false;
    }

    /// Adds an `allow` rule to the node configuration.
    pub fn allow(&mut self, pattern: &str) {
        self.allow.push(pattern.to_owned());
    }

    /// Writes an executable plugin that prints `<name>.value 1`.
    #[cfg(unix)]
    pub fn install_plugin(&self, name: &str) {
        use std::os::unix::fs::PermissionsExt;

        let path = self.plugins.path().join(name);
        fs::write(&path, format!("#!/bin/sh\necho \"{name}.value 1\"\n")).expect("write plugin");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("chmod plugin");
    }

    fn config(&self) -> Config {
        let mut text = format!(
            "host_name test.node\nhost 127.0.0.1\nport 0\nplugins {}\n",
            self.plugins.path().display()
        );
        for rule in &self.allow {
            text.push_str(&format!("allow {rule}\n"));
        }
        text.parse().expect("node configuration")
    }

    /// Runs the bootstrap sequence once.
    pub fn bootstrap(&mut self) {
        if self.daemon.is_some() || self.bootstrap_error.is_some() {
            return;
        }

        let loader: Box<dyn ConfigLoader> = if self.failing_loader {
            Box::new(FailingConfigLoader)
        } else {
            Box::new(StaticConfigLoader::new(self.config()))
        };
        match bootstrap_with(&*loader, self.reporter.clone()) {
            Ok(daemon) => self.daemon = Some(daemon),
            Err(error) => self.bootstrap_error = Some(error),
        }
    }

    /// Returns whether bootstrap produced an error.
    pub fn bootstrap_error(&self) -> Option<&BootstrapError> {
        self.bootstrap_error.as_ref()
    }

    /// Returns true when the daemon handle is available.
    pub fn daemon_started(&self) -> bool {
        self.daemon.is_some()
    }

    /// Starts a listener, sends `request` then `quit`, and records every byte
    /// the node wrote back.
    pub fn converse(&mut self, request: &str) {
        self.bootstrap();
        let daemon = self.daemon.as_ref().expect("bootstrap succeeded");
        let listener = SocketListener::bind("127.0.0.1", 0).expect("bind listener");
        let handle = listener
            .start(
                Arc::new(daemon.session_handler()),
                Arc::new(daemon.access_guard()),
            )
            .expect("start listener");

        let mut stream = TcpStream::connect(handle.local_addr()).expect("connect");
        stream
            .set_read_timeout(Some(Duration::from_secs(5)))
            .expect("read timeout");
        stream
            .write_all(format!("{request}\nquit\n").as_bytes())
            .expect("send request");
        let mut received = Vec::new();
        // A denied peer is closed with our request unread, which resets.
        if let Err(error) = stream.read_to_end(&mut received) {
            assert_eq!(
                error.kind(),
                io::ErrorKind::ConnectionReset,
                "unexpected read failure: {error}"
            );
        }

        handle.shutdown();
        handle.join().expect("listener thread");
        self.transcript = Some(String::from_utf8_lossy(&received).into_owned());
    }

    /// Lines the node sent during the last conversation.
    pub fn transcript_lines(&self) -> Vec<&str> {
        self.transcript
            .as_deref()
            .map(|text| text.lines().collect())
            .unwrap_or_default()
    }
}

/// Recorded lifecycle events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthEvent {
    BootstrapStarting,
    BootstrapSucceeded,
    BootstrapFailed(String),
    ListenerReady(SocketAddr),
    ShutdownCompleted,
}

/// Reporter that keeps every event for later assertions.
#[derive(Default)]
pub struct RecordingHealthReporter {
    events: Mutex<Vec<HealthEvent>>,
}

impl RecordingHealthReporter {
    /// Snapshot of the recorded events.
    pub fn events(&self) -> Vec<HealthEvent> {
        self.events.lock().expect("events lock").clone()
    }

    fn record(&self, event: HealthEvent) {
        self.events.lock().expect("events lock").push(event);
    }
}

impl HealthReporter for RecordingHealthReporter {
    fn bootstrap_starting(&self) {
        self.record(HealthEvent::BootstrapStarting);
    }

    fn bootstrap_succeeded(&self, _config: &Config) {
        self.record(HealthEvent::BootstrapSucceeded);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        self.record(HealthEvent::BootstrapFailed(error.to_string()));
    }

    fn listener_ready(&self, address: SocketAddr) {
        self.record(HealthEvent::ListenerReady(address));
    }

    fn shutdown_completed(&self) {
        self.record(HealthEvent::ShutdownCompleted);
    }
}

struct FailingConfigLoader;

impl ConfigLoader for FailingConfigLoader {
    fn load(&self) -> Result<Config, ConfigError> {
        "port seventy\n".parse()
    }
}

/// Fresh world for each scenario.
pub fn world() -> std::cell::RefCell<TestWorld> {
    std::cell::RefCell::new(TestWorld::new())
}
