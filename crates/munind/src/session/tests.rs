//! Unit tests for the session state machine.

use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;

use mockall::mock;
use munin_plugins::{PluginError, PluginMode};
use rstest::rstest;

use super::reader::MAX_LINE_BYTES;
use super::*;

mock! {
    Plugins {}
    impl PluginService for Plugins {
        fn list(&self) -> Vec<String>;
        fn run(&self, name: &str, mode: PluginMode) -> Result<Vec<u8>, PluginError>;
    }
}

const BANNER: &str = "# munin node at node1.example\n";

fn converse(plugins: MockPlugins, input: &[u8]) -> (Result<SessionEnd, ProtocolError>, String) {
    let handler = SessionHandler::new("node1.example", Arc::new(plugins));
    let mut output = Vec::new();
    let result = handler.serve(Cursor::new(input.to_vec()), &mut output);
    (result, String::from_utf8(output).expect("replies are UTF-8"))
}

fn expect_run(
    plugins: &mut MockPlugins,
    plugin: &'static str,
    expected_mode: PluginMode,
    result: fn() -> Result<Vec<u8>, PluginError>,
) {
    plugins
        .expect_run()
        .withf(move |name, mode| name == plugin && *mode == expected_mode)
        .times(1)
        .returning(move |_, _| result());
}

#[test]
fn writes_banner_before_reading() {
    let (result, output) = converse(MockPlugins::new(), b"");
    assert!(matches!(result, Ok(SessionEnd::Disconnected)));
    assert_eq!(output, BANNER);
}

#[rstest]
#[case::cap("cap\n", "cap multigraph\n")]
#[case::nodes("nodes\n", "node1.example\n.\n")]
#[case::version(
    "version\n",
    concat!("munins node on node1.example version: ", env!("CARGO_PKG_VERSION"), "\n")
)]
#[case::unknown("help\n", "# Unknown command. Try cap, list, nodes, config, fetch, version or quit\n")]
#[case::empty_line("\n", "# Unknown command. Try cap, list, nodes, config, fetch, version or quit\n")]
#[case::fetch_without_name("fetch\n", "# Unknown service\n.\n")]
#[case::config_without_name("config   \n", "# Unknown service\n.\n")]
fn answers_fixed_commands(#[case] request: &str, #[case] reply: &str) {
    let (result, output) = converse(MockPlugins::new(), request.as_bytes());
    assert!(result.is_ok());
    assert_eq!(output, format!("{BANNER}{reply}"));
}

#[test]
fn list_joins_plugin_names() {
    let mut plugins = MockPlugins::new();
    plugins
        .expect_list()
        .times(1)
        .returning(|| vec![String::from("cpu"), String::from("df"), String::from("load")]);
    let (_, output) = converse(plugins, b"list\n");
    assert_eq!(output, format!("{BANNER}cpu df load\n"));
}

#[test]
fn list_with_no_plugins_is_an_empty_line() {
    let mut plugins = MockPlugins::new();
    plugins.expect_list().times(1).returning(Vec::new);
    let (_, output) = converse(plugins, b"list\n");
    assert_eq!(output, format!("{BANNER}\n"));
}

#[test]
fn fetch_appends_terminator() {
    let mut plugins = MockPlugins::new();
    expect_run(&mut plugins, "load", PluginMode::Fetch, || {
        Ok(b"load.value 0.42\n".to_vec())
    });
    let (_, output) = converse(plugins, b"fetch load\r\n");
    assert_eq!(output, format!("{BANNER}load.value 0.42\n.\n"));
}

#[test]
fn config_output_without_newline_is_completed() {
    let mut plugins = MockPlugins::new();
    expect_run(&mut plugins, "load", PluginMode::Config, || {
        Ok(b"graph_title Load".to_vec())
    });
    let (_, output) = converse(plugins, b"config load\n");
    assert_eq!(output, format!("{BANNER}graph_title Load\n.\n"));
}

#[test]
fn empty_plugin_output_is_only_the_terminator() {
    let mut plugins = MockPlugins::new();
    expect_run(&mut plugins, "quiet", PluginMode::Fetch, || Ok(Vec::new()));
    let (_, output) = converse(plugins, b"fetch quiet\n");
    assert_eq!(output, format!("{BANNER}.\n"));
}

#[rstest]
#[case::security(|| Err(PluginError::OutsideDirectory {
    name: String::from("x"),
    resolved: PathBuf::from("/etc/passwd"),
    directory: PathBuf::from("/etc/munin/plugins"),
}))]
#[case::missing(|| Err(PluginError::NotFound {
    name: String::from("x"),
    path: PathBuf::from("/etc/munin/plugins/x"),
}))]
#[case::failed(|| Err(PluginError::NonZeroExit {
    name: String::from("x"),
    status: 2,
}))]
fn plugin_failures_reply_unknown_service(#[case] failure: fn() -> Result<Vec<u8>, PluginError>) {
    let mut plugins = MockPlugins::new();
    expect_run(&mut plugins, "x", PluginMode::Fetch, failure);
    let (result, output) = converse(plugins, b"fetch x\nnodes\n");
    assert!(matches!(result, Ok(SessionEnd::Disconnected)));
    assert_eq!(
        output,
        format!("{BANNER}# Unknown service\n.\nnode1.example\n.\n")
    );
    assert!(!output.contains("/etc"));
}

#[test]
fn quit_stops_before_later_requests() {
    let (result, output) = converse(MockPlugins::new(), b"quit\ncap\n");
    assert!(matches!(result, Ok(SessionEnd::Quit)));
    assert_eq!(output, BANNER);
}

#[test]
fn lone_dot_is_an_unknown_command() {
    let (result, output) = converse(MockPlugins::new(), b".\ncap\n");
    assert!(matches!(result, Ok(SessionEnd::Disconnected)));
    assert_eq!(
        output,
        format!(
            "{BANNER}# Unknown command. Try cap, list, nodes, config, fetch, version or quit\n\
             cap multigraph\n"
        )
    );
}

#[test]
fn oversized_line_ends_the_session() {
    let mut input = vec![b'x'; MAX_LINE_BYTES + 1];
    input.extend_from_slice(b"\ncap\n");
    let (result, output) = converse(MockPlugins::new(), &input);
    assert!(matches!(result, Err(ProtocolError::LineTooLong { .. })));
    assert_eq!(output, BANNER);
}

#[test]
fn serves_several_requests_in_order() {
    let mut plugins = MockPlugins::new();
    plugins
        .expect_list()
        .returning(|| vec![String::from("cpu")]);
    expect_run(&mut plugins, "cpu", PluginMode::Config, || {
        Ok(b"graph_title CPU\n".to_vec())
    });
    let (result, output) = converse(plugins, b"cap\nlist\nconfig cpu\nquit\n");
    assert!(matches!(result, Ok(SessionEnd::Quit)));
    assert_eq!(
        output,
        format!("{BANNER}cap multigraph\ncpu\ngraph_title CPU\n.\n")
    );
}
