//! Network abstraction for outgoing TCP streams

use embedded_io_async::{Read, Write};

/// Opens TCP connections (host name resolution included).
///
/// Implemented over `embassy-net` on hardware and by
/// [`MockConnector`](crate::mocks::MockConnector) in tests.
pub trait TcpConnect {
    /// Error type shared by connect and the connection's I/O.
    type Error: embedded_io_async::Error;

    /// An open, bidirectional byte stream.
    type Connection<'a>: Read<Error = Self::Error> + Write<Error = Self::Error>
    where
        Self: 'a;

    /// Resolve `host` and connect to `port`.
    async fn connect<'a>(
        &'a mut self,
        host: &str,
        port: u16,
    ) -> Result<Self::Connection<'a>, Self::Error>;
}
