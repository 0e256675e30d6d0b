//! Behavioural tests for collector sessions over real sockets.

use std::cell::RefCell;

use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};

use super::support::{self, TestWorld};

#[fixture]
fn world() -> RefCell<TestWorld> {
    support::world()
}

fn unquote(value: &str) -> &str {
    value.trim_matches('"')
}

#[given("a plugin directory containing {first} and {second}")]
fn given_plugins(world: &RefCell<TestWorld>, first: String, second: String) {
    let world = world.borrow();
    world.install_plugin(unquote(&first));
    world.install_plugin(unquote(&second));
}

#[given("collectors from {pattern} are allowed")]
fn given_allow_rule(world: &RefCell<TestWorld>, pattern: String) {
    world.borrow_mut().allow(unquote(&pattern));
}

#[when("a collector connects and sends {request}")]
fn when_collector_sends(world: &RefCell<TestWorld>, request: String) {
    world.borrow_mut().converse(unquote(&request));
}

#[then("the banner names host {host}")]
fn then_banner(world: &RefCell<TestWorld>, host: String) {
    let world = world.borrow();
    let expected = format!("# munin node at {}", unquote(&host));
    assert_eq!(world.transcript_lines().first().copied(), Some(expected.as_str()));
}

#[then("the reply includes the line {line}")]
fn then_reply_line(world: &RefCell<TestWorld>, line: String) {
    let world = world.borrow();
    let lines = world.transcript_lines();
    assert!(
        lines.contains(&unquote(&line)),
        "line {line} missing from {lines:?}"
    );
}

#[then("the connection closes without a banner")]
fn then_no_banner(world: &RefCell<TestWorld>) {
    let world = world.borrow();
    let lines = world.transcript_lines();
    assert!(lines.is_empty(), "denied collector received {lines:?}");
}

#[scenario(path = "tests/features/node_session.feature")]
fn node_session(world: RefCell<TestWorld>) {
    let _ = world;
}
