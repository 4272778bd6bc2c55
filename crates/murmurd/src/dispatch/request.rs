//! Request parsing for the dispatch loop.

use murmur_daemon_types::ClientRequest;

use super::errors::DispatchError;

/// Parses one request line into a [`ClientRequest`].
///
/// Trailing whitespace, including the newline delimiter, is trimmed first.
/// Lines that are empty, not JSON objects, or lack a string `command` are
/// rejected as malformed.
pub(crate) fn parse_request(line: &[u8]) -> Result<ClientRequest, DispatchError> {
    let trimmed = trim_trailing_whitespace(line);
    if trimmed.is_empty() {
        return Err(DispatchError::malformed("empty request line"));
    }

    serde_json::from_slice(trimmed).map_err(DispatchError::from_json_error)
}

/// Trims trailing ASCII whitespace from a byte slice.
fn trim_trailing_whitespace(bytes: &[u8]) -> &[u8] {
    let end = bytes
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(0, |pos| pos + 1);
    bytes.get(..end).unwrap_or_default()
}
