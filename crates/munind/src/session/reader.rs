//! Bounded line reader for protocol requests.

use std::io::{BufRead, Read};

use super::errors::ProtocolError;

/// Longest accepted request line, terminator included.
pub(crate) const MAX_LINE_BYTES: usize = 2048;

/// Reads the next request line without its `\n` or `\r\n` terminator.
///
/// Returns `Ok(None)` at end of stream. A final line lacking a terminator is
/// still returned. Lines that reach [`MAX_LINE_BYTES`] without a newline are
/// rejected.
pub(crate) fn read_line<R: BufRead>(reader: &mut R) -> Result<Option<String>, ProtocolError> {
    let mut buffer = Vec::new();
    let limit = u64::try_from(MAX_LINE_BYTES).unwrap_or(u64::MAX);
    let read = reader.by_ref().take(limit).read_until(b'\n', &mut buffer)?;
    if read == 0 {
        return Ok(None);
    }

    let terminated = buffer.last() == Some(&b'\n');
    if !terminated && buffer.len() >= MAX_LINE_BYTES {
        return Err(ProtocolError::LineTooLong {
            limit: MAX_LINE_BYTES,
        });
    }

    while matches!(buffer.last(), Some(b'\n' | b'\r')) {
        buffer.pop();
    }
    Ok(Some(String::from_utf8_lossy(&buffer).into_owned()))
}
