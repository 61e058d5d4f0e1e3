use std::time::Duration;

use futures::StreamExt;
use tokio::io::AsyncRead;
use tokio_util::codec::FramedRead;

use crate::serial::{codecs::lines::LinesCodec, error::SerialPortError};

/// Serial port related errors.
pub mod error;

/// Opening serial ports.
pub mod serial_port;

/// Codecs for decoding messages from the wire.
pub mod codecs;

/// Reads lines from one open connection.
///
/// Each call to [`LineReader::next_line`] waits at most the read timeout.
/// Once it returns an error the connection is over; the reader is not
/// restartable and should be dropped, which also closes the connection.
#[derive(Debug)]
pub struct LineReader<S> {
    framed: FramedRead<S, LinesCodec>,
    read_timeout: Duration,
}

impl<S: AsyncRead + Unpin> LineReader<S> {
    /// Read lines from `stream` with the given codec.
    pub fn new(stream: S, codec: LinesCodec, read_timeout: Duration) -> Self {
        Self {
            framed: FramedRead::new(stream, codec),
            read_timeout,
        }
    }

    /// The next line.
    ///
    /// `Ok(None)` means no line arrived within the read timeout,
    /// which is not a problem in itself.
    pub async fn next_line(&mut self) -> Result<Option<String>, SerialPortError> {
        match tokio::time::timeout(self.read_timeout, self.framed.next()).await {
            Err(_elapsed) => Ok(None),
            Ok(Some(Ok(line))) => Ok(Some(line)),
            Ok(Some(Err(e))) => Err(e),
            Ok(None) => Err(SerialPortError::Disconnected),
        }
    }
}
