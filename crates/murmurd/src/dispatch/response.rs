//! Response serialisation for the dispatch loop.

use std::io::Write;

use murmur_daemon_types::DaemonResponse;

use super::errors::DispatchError;

/// Writes newline-terminated JSON responses to a stream.
pub(crate) struct ResponseWriter<W> {
    writer: W,
}

impl<W: Write> ResponseWriter<W> {
    pub(crate) fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Writes `response` as one line and flushes.
    pub(crate) fn write_response(&mut self, response: &DaemonResponse) -> Result<(), DispatchError> {
        serde_json::to_writer(&mut self.writer, response)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }

    /// Reports `error` as `{"error": "<message>"}`.
    pub(crate) fn write_error(&mut self, error: &DispatchError) -> Result<(), DispatchError> {
        self.write_response(&DaemonResponse::error(error.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use murmur_daemon_types::ReplyStatus;

    #[test]
    fn writes_one_line_per_response() {
        let mut output = Vec::new();
        ResponseWriter::new(&mut output)
            .write_response(&DaemonResponse::status(ReplyStatus::Ok))
            .expect("write response");
        assert_eq!(output, b"{\"status\":\"ok\"}\n");
    }

    #[test]
    fn errors_use_their_display_text() {
        let mut output = Vec::new();
        ResponseWriter::new(&mut output)
            .write_error(&DispatchError::unknown_command("frobnicate"))
            .expect("write error");
        assert_eq!(output, b"{\"error\":\"Unknown command: frobnicate\"}\n");
    }
}
