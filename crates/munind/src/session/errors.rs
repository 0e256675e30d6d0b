//! Errors that end a session.

use std::io;

use thiserror::Error;

/// Failures that close a connection. None of them affect other sessions.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The client sent a line longer than the protocol allows.
    #[error("request line exceeds {limit} bytes")]
    LineTooLong {
        /// Maximum accepted line length in bytes, terminator included.
        limit: usize,
    },
    /// Reading from or writing to the socket failed.
    #[error("connection I/O failed: {0}")]
    Io(#[from] io::Error),
}
