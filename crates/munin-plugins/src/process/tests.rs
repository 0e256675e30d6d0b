//! Tests spawning real shell-script plugins.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::time::Duration;

use rstest::{fixture, rstest};
use tempfile::TempDir;

use super::*;
use crate::containment::PluginPath;
use crate::environment::EnvironmentSet;
use crate::invocation::PluginMode;

fn write_plugin(dir: &Path, name: &str, body: &str) {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write plugin");
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("chmod plugin");
}

#[fixture]
fn plugin_dir() -> TempDir {
    let dir = tempfile::tempdir().expect("temp dir");
    write_plugin(
        dir.path(),
        "echo_mode",
        "if [ \"$1\" = config ]; then echo 'graph_title Echo'; else echo \"args=$#\"; fi",
    );
    write_plugin(dir.path(), "env_probe", "echo \"value=${PROBE_VALUE:-unset}\"");
    write_plugin(dir.path(), "failing", "echo partial; echo oops >&2; exit 3");
    write_plugin(dir.path(), "sleeper", "exec sleep 5");
    write_plugin(dir.path(), "detacher", "sleep 6 &\necho started");
    write_plugin(dir.path(), "noisy", "echo quiet; echo 'loud complaint' >&2");
    dir
}

fn invocation(
    dir: &TempDir,
    name: &str,
    mode: PluginMode,
    environment: EnvironmentSet,
    timeout: Option<Duration>,
) -> Invocation {
    let executable = PluginPath::validate(dir.path(), name).expect("valid plugin");
    Invocation::new(name, executable, mode, environment, timeout)
}

#[rstest]
#[case::fetch(PluginMode::Fetch, "args=0\n")]
#[case::config(PluginMode::Config, "graph_title Echo\n")]
fn passes_mode_argument(plugin_dir: TempDir, #[case] mode: PluginMode, #[case] expected: &str) {
    let run = invocation(&plugin_dir, "echo_mode", mode, EnvironmentSet::new(), None);
    let output = ProcessExecutor.execute(&run).expect("plugin runs");
    assert_eq!(String::from_utf8_lossy(&output), expected);
}

#[rstest]
fn environment_reaches_only_the_child(plugin_dir: TempDir) {
    let environment: EnvironmentSet = [("PROBE_VALUE", "42")].into_iter().collect();
    let run = invocation(
        &plugin_dir,
        "env_probe",
        PluginMode::Fetch,
        environment,
        Some(Duration::from_secs(5)),
    );
    let output = ProcessExecutor.execute(&run).expect("plugin runs");

    assert_eq!(String::from_utf8_lossy(&output), "value=42\n");
    assert!(std::env::var_os("PROBE_VALUE").is_none());
}

#[rstest]
fn concurrent_runs_keep_their_own_environment(plugin_dir: TempDir) {
    let runs: Vec<Invocation> = (0..8)
        .map(|index| {
            let environment: EnvironmentSet =
                [("PROBE_VALUE", index.to_string())].into_iter().collect();
            invocation(&plugin_dir, "env_probe", PluginMode::Fetch, environment, None)
        })
        .collect();

    thread::scope(|scope| {
        let handles: Vec<_> = runs
            .iter()
            .map(|run| scope.spawn(move || ProcessExecutor.execute(run)))
            .collect();
        for (index, handle) in handles.into_iter().enumerate() {
            let output = handle.join().expect("join").expect("plugin runs");
            assert_eq!(String::from_utf8_lossy(&output), format!("value={index}\n"));
        }
    });
}

#[rstest]
fn non_zero_exit_is_an_error(plugin_dir: TempDir) {
    let run = invocation(&plugin_dir, "failing", PluginMode::Fetch, EnvironmentSet::new(), None);
    let error = ProcessExecutor.execute(&run).expect_err("plugin fails");
    assert!(matches!(error, PluginError::NonZeroExit { status: 3, .. }), "got {error:?}");
}

#[rstest]
fn stderr_is_not_returned(plugin_dir: TempDir) {
    let run = invocation(&plugin_dir, "noisy", PluginMode::Fetch, EnvironmentSet::new(), None);
    let output = ProcessExecutor.execute(&run).expect("plugin runs");
    assert_eq!(String::from_utf8_lossy(&output), "quiet\n");
}

#[rstest]
fn hung_plugin_times_out(plugin_dir: TempDir) {
    let run = invocation(
        &plugin_dir,
        "sleeper",
        PluginMode::Fetch,
        EnvironmentSet::new(),
        Some(Duration::from_millis(200)),
    );
    let started = Instant::now();
    let error = ProcessExecutor.execute(&run).expect_err("plugin times out");

    assert!(matches!(error, PluginError::Timeout { .. }), "got {error:?}");
    assert!(started.elapsed() < Duration::from_secs(4));
}

#[rstest]
fn background_child_holding_stdout_times_out(plugin_dir: TempDir) {
    let run = invocation(
        &plugin_dir,
        "detacher",
        PluginMode::Fetch,
        EnvironmentSet::new(),
        Some(Duration::from_millis(500)),
    );
    let started = Instant::now();
    let error = ProcessExecutor.execute(&run).expect_err("plugin times out");

    assert!(matches!(error, PluginError::Timeout { .. }), "got {error:?}");
    assert!(
        started.elapsed() < Duration::from_secs(3),
        "run took {:?}",
        started.elapsed()
    );
}

#[rstest]
fn non_executable_file_fails_to_spawn(plugin_dir: TempDir) {
    let path = plugin_dir.path().join("plain");
    fs::write(&path, "not a program").expect("write file");
    fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).expect("chmod file");

    let run = invocation(&plugin_dir, "plain", PluginMode::Fetch, EnvironmentSet::new(), None);
    let error = ProcessExecutor.execute(&run).expect_err("spawn fails");
    assert!(matches!(error, PluginError::SpawnFailed { .. }), "got {error:?}");
}
