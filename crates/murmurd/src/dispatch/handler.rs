//! Connection handler that dispatches one request per connection.

use std::net::Shutdown;
use std::os::unix::net::UnixStream;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::context::DaemonContext;
use crate::process::shutdown::ShutdownReason;
use crate::transport::{ConnectionHandler, MAX_REQUEST_BYTES, read_request_line};

use super::errors::DispatchError;
use super::request::parse_request;
use super::response::ResponseWriter;
use super::router::{DISPATCH_TARGET, route};

/// Upper bound on how long the accept thread may spend refusing a client.
const REJECT_WRITE_TIMEOUT: Duration = Duration::from_millis(100);

/// Reads one request line, routes it and writes one response line.
///
/// Failures are reported to the client when the connection is still
/// writable; a failed write is logged and the connection dropped.
pub(crate) struct DispatchConnectionHandler {
    context: Arc<DaemonContext>,
    read_timeout: Option<Duration>,
}

impl DispatchConnectionHandler {
    pub(crate) fn new(context: Arc<DaemonContext>, read_timeout: Option<Duration>) -> Self {
        Self {
            context,
            read_timeout,
        }
    }

    fn dispatch(&self, stream: &mut UnixStream) -> bool {
        if let Err(error) = stream.set_read_timeout(self.read_timeout) {
            warn!(target: DISPATCH_TARGET, %error, "failed to set read timeout");
        }

        let request_bytes = match read_request_line(stream, MAX_REQUEST_BYTES) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                debug!(target: DISPATCH_TARGET, "client disconnected without request");
                return false;
            }
            Err(error) => {
                let error = DispatchError::from(error);
                warn!(target: DISPATCH_TARGET, %error, "failed to read request");
                reply_error(stream, &error);
                return false;
            }
        };

        let outcome = parse_request(&request_bytes).and_then(|request| route(&request, &self.context));
        match outcome {
            Ok(routed) => {
                if let Err(error) = ResponseWriter::new(&mut *stream).write_response(&routed.response) {
                    debug!(target: DISPATCH_TARGET, %error, "failed to write response");
                }
                routed.shutdown_after
            }
            Err(error) => {
                warn!(target: DISPATCH_TARGET, %error, "request failed");
                reply_error(stream, &error);
                false
            }
        }
    }
}

impl ConnectionHandler for DispatchConnectionHandler {
    fn handle(&self, mut stream: UnixStream) {
        let shutdown_after = self.dispatch(&mut stream);
        let _ = stream.shutdown(Shutdown::Both);
        drop(stream);
        if shutdown_after {
            self.context.shutdown().trigger(ShutdownReason::Request);
        }
    }

    fn reject(&self, mut stream: UnixStream) {
        if let Err(error) = stream.set_write_timeout(Some(REJECT_WRITE_TIMEOUT)) {
            debug!(target: DISPATCH_TARGET, %error, "failed to set write timeout");
        }
        reply_error(&mut stream, &DispatchError::Busy);
    }
}

fn reply_error(stream: &mut UnixStream, error: &DispatchError) {
    if let Err(write_error) = ResponseWriter::new(stream).write_error(error) {
        debug!(target: DISPATCH_TARGET, error = %write_error, "failed to write error response");
    }
}
