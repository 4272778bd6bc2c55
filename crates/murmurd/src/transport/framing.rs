//! Newline framing for request lines.

use std::io::{self, Read};

use thiserror::Error;

/// Largest accepted request line, newline included.
pub(crate) const MAX_REQUEST_BYTES: usize = 1024 * 1024;

/// Errors raised while reading a request line.
#[derive(Debug, Error)]
pub(crate) enum FrameError {
    #[error("request too large: {size} bytes exceeds {max_size} byte limit")]
    TooLarge { size: usize, max_size: usize },
    #[error("failed to read request: {0}")]
    Io(#[from] io::Error),
}

/// Reads one newline-terminated request line of at most `limit` bytes.
///
/// Returns `Ok(None)` when the peer closes without sending anything. A
/// final line without a trailing newline is accepted at end of stream.
/// Bytes after the first newline are ignored.
pub(crate) fn read_request_line<R: Read>(
    stream: &mut R,
    limit: usize,
) -> Result<Option<Vec<u8>>, FrameError> {
    let mut buffer = Vec::new();
    let mut chunk = [0_u8; 1024];

    loop {
        let bytes_read = read_with_retry(stream, &mut chunk)?;
        if bytes_read == 0 {
            return Ok((!buffer.is_empty()).then_some(buffer));
        }

        let received = chunk.get(..bytes_read).unwrap_or_default();
        if let Some(newline) = received.iter().position(|byte| *byte == b'\n') {
            buffer.extend_from_slice(received.get(..=newline).unwrap_or_default());
            enforce_limit(buffer.len(), limit)?;
            return Ok(Some(buffer));
        }

        buffer.extend_from_slice(received);
        enforce_limit(buffer.len(), limit)?;
    }
}

fn read_with_retry<R: Read>(stream: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    loop {
        match stream.read(buf) {
            Ok(read) => return Ok(read),
            Err(error) if error.kind() == io::ErrorKind::Interrupted => {}
            Err(error) => return Err(error),
        }
    }
}

fn enforce_limit(size: usize, limit: usize) -> Result<(), FrameError> {
    if size > limit {
        return Err(FrameError::TooLarge {
            size,
            max_size: limit,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::io::Cursor;

    #[rstest]
    #[case(b"{\"command\":\"ping\"}\n".as_slice(), Some(b"{\"command\":\"ping\"}\n".to_vec()))]
    #[case(b"{\"command\":\"ping\"}".as_slice(), Some(b"{\"command\":\"ping\"}".to_vec()))]
    #[case(b"first\nsecond\n".as_slice(), Some(b"first\n".to_vec()))]
    #[case(b"".as_slice(), None)]
    fn frames_single_line(#[case] input: &[u8], #[case] expected: Option<Vec<u8>>) {
        let mut stream = Cursor::new(input.to_vec());
        let line = read_request_line(&mut stream, MAX_REQUEST_BYTES).expect("read line");
        assert_eq!(line, expected);
    }

    #[test]
    fn lines_longer_than_the_old_single_read_are_kept_whole() {
        let path = "a".repeat(10_000);
        let request = format!("{{\"command\":\"transcribe\",\"audio_path\":\"/{path}\"}}\n");
        let mut stream = Cursor::new(request.clone().into_bytes());

        let line = read_request_line(&mut stream, MAX_REQUEST_BYTES)
            .expect("read line")
            .expect("line present");
        assert_eq!(line, request.into_bytes());
    }

    #[test]
    fn oversized_line_is_rejected() {
        let mut stream = Cursor::new(vec![b'x'; 4096]);
        let error = read_request_line(&mut stream, 2048).expect_err("too large");
        assert!(matches!(error, FrameError::TooLarge { max_size: 2048, .. }));
    }
}
