//! TCP listener for collector connections.
//!
//! The transport module binds the node's listen address and accepts
//! connections in a background thread. Every peer is checked against the
//! [`AccessGuard`](crate::access::AccessGuard) on the accept thread; denied
//! peers are closed there and never reach a worker.

mod errors;
mod handler;
mod listener;
#[cfg(test)]
mod test_utils;

pub use self::errors::ListenerError;
pub use self::handler::ConnectionHandler;
pub use self::listener::{ListenerHandle, SocketListener};
#[cfg(test)]
pub(crate) use self::test_utils::CountingHandler;

const LISTENER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::transport");
