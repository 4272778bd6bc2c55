//! Connection handling abstractions for the daemon listener.

use std::os::unix::net::UnixStream;

/// Handles accepted socket connections.
pub(crate) trait ConnectionHandler: Send + Sync + 'static {
    /// Serves a single connection. Implementations should avoid panicking.
    fn handle(&self, stream: UnixStream);

    /// Answers a connection refused by the admission limit.
    ///
    /// Called on the accept thread, so implementations must not block for
    /// long. The default closes the connection without a reply.
    fn reject(&self, stream: UnixStream) {
        drop(stream);
    }
}
