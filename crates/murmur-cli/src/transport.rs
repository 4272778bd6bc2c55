//! Socket transport for daemon requests.
//!
//! Each command opens a fresh connection, writes one request line and reads
//! one response line.

use std::io::{self, BufRead, BufReader, Read, Write};
use std::os::unix::net::UnixStream;
use std::time::Duration;

use camino::Utf8Path;
use socket2::{Domain, SockAddr, Socket, Type};

use murmur_daemon_types::{ClientRequest, DaemonResponse};

use crate::AppError;

pub(crate) const CONNECTION_TIMEOUT: Duration = Duration::from_secs(5);

/// Ceiling for a single response line.
const MAX_RESPONSE_BYTES: u64 = 4 * 1024 * 1024;

pub(crate) fn connect(socket: &Utf8Path) -> Result<UnixStream, AppError> {
    connect_unix(socket).map_err(|source| AppError::Connect {
        socket: socket.to_path_buf(),
        source,
    })
}

fn connect_unix(path: &Utf8Path) -> io::Result<UnixStream> {
    let socket = Socket::new(Domain::UNIX, Type::STREAM, None)?;
    let address = SockAddr::unix(path.as_std_path())?;
    socket.connect_timeout(&address, CONNECTION_TIMEOUT)?;
    Ok(socket.into())
}

/// Sends `request` over `stream` and waits for the reply line.
pub(crate) fn exchange<S: Read + Write>(
    stream: &mut S,
    request: &ClientRequest,
) -> Result<DaemonResponse, AppError> {
    let mut line = serde_json::to_vec(request).map_err(AppError::SerialiseRequest)?;
    line.push(b'\n');
    stream.write_all(&line).map_err(AppError::SendRequest)?;
    stream.flush().map_err(AppError::SendRequest)?;

    let mut reply = String::new();
    let read = BufReader::new(stream.take(MAX_RESPONSE_BYTES))
        .read_line(&mut reply)
        .map_err(AppError::ReadResponse)?;
    if read == 0 {
        return Err(AppError::MissingResponse);
    }
    serde_json::from_str(reply.trim_end()).map_err(AppError::ParseResponse)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// In-memory duplex: reads come from `input`, writes land in `output`.
    struct Duplex {
        input: Cursor<Vec<u8>>,
        output: Vec<u8>,
    }

    impl Read for Duplex {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.input.read(buf)
        }
    }

    impl Write for Duplex {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.output.write(buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn duplex(reply: &str) -> Duplex {
        Duplex {
            input: Cursor::new(reply.as_bytes().to_vec()),
            output: Vec::new(),
        }
    }

    #[test]
    fn writes_one_newline_terminated_request() {
        let mut stream = duplex("{\"status\":\"ok\"}\n");
        let response = exchange(&mut stream, &ClientRequest::ping()).expect("exchange");

        assert_eq!(stream.output, b"{\"command\":\"ping\"}\n");
        assert_eq!(
            response,
            DaemonResponse::status(murmur_daemon_types::ReplyStatus::Ok)
        );
    }

    #[test]
    fn reply_without_trailing_newline_is_accepted() {
        let mut stream = duplex("{\"text\":\"hello\"}");
        let response = exchange(&mut stream, &ClientRequest::ping()).expect("exchange");
        assert_eq!(response, DaemonResponse::text("hello"));
    }

    #[test]
    fn closed_connection_is_reported() {
        let mut stream = duplex("");
        let error = exchange(&mut stream, &ClientRequest::ping()).expect_err("no reply");
        assert!(matches!(error, AppError::MissingResponse));
    }

    #[test]
    fn garbage_reply_is_a_parse_error() {
        let mut stream = duplex("not json\n");
        let error = exchange(&mut stream, &ClientRequest::ping()).expect_err("bad reply");
        assert!(matches!(error, AppError::ParseResponse(_)));
    }

    #[test]
    fn missing_socket_reads_as_daemon_not_running() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = camino::Utf8PathBuf::from_path_buf(dir.path().join("absent.sock"))
            .expect("utf8 path");
        let error = connect(&path).expect_err("nothing listening");
        assert!(crate::errors::is_daemon_not_running(&error));
    }
}
