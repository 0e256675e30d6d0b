//! Test suites for the node daemon.

#[cfg(unix)]
mod session_behaviour;
mod support;
