//! A mock, useful to test the reader without an actual serial device.
//!
//! [`bench`] returns a locator and a connector sharing the same simulated
//! device nodes, plus a [`MockSessions`] from which a test receives a
//! [`MockDevice`] each time the reader opens a connection.
//! The test then plays the role of the device: it writes lines, injects
//! IO errors, or drops the device to simulate it going away.

use std::{
    collections::{BTreeSet, HashMap},
    io,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_util::io::StreamReader;
use tracing::{debug, info};

use crate::{
    locator::{DevicePath, Locate},
    serial::{error::SerialPortError, serial_port::Connect},
};

/// What the reader sees when reading from a mock device.
pub type MockStream = StreamReader<UnboundedReceiverStream<io::Result<Bytes>>, Bytes>;

#[derive(Debug, Default)]
struct Nodes {
    plugged: BTreeSet<DevicePath>,

    /// How many upcoming opens of a path should fail.
    failing_opens: HashMap<DevicePath, usize>,

    opens: usize,
}

#[derive(Debug, Clone, Default)]
struct SharedNodes(Arc<Mutex<Nodes>>);

impl SharedNodes {
    fn lock(&self) -> MutexGuard<'_, Nodes> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Create a mock locator and connector operating on the same simulated
/// device nodes.
pub fn bench() -> (MockLocator, MockConnector, MockSessions) {
    let nodes = SharedNodes::default();
    let (sessions_tx, sessions_rx) = mpsc::unbounded_channel();

    (
        MockLocator {
            nodes: nodes.clone(),
        },
        MockConnector { nodes, sessions_tx },
        MockSessions(sessions_rx),
    )
}

/// Finds the smallest currently plugged in mock device.
#[derive(Debug, Clone)]
pub struct MockLocator {
    nodes: SharedNodes,
}

impl MockLocator {
    /// Make a device node appear.
    pub fn plug(&self, path: impl Into<DevicePath>) {
        let path = path.into();
        debug!(%path, "Plugging in mock");
        self.nodes.lock().plugged.insert(path);
    }

    /// Make a device node disappear.
    ///
    /// An open connection is not affected by this alone, just like
    /// a real port might linger; drop or fail the [`MockDevice`] as well.
    pub fn unplug(&self, path: impl Into<DevicePath>) {
        let path = path.into();
        debug!(%path, "Unplugging mock");
        self.nodes.lock().plugged.remove(&path);
    }

    /// Make the next `times` attempts to open `path` fail.
    pub fn fail_opens(&self, path: impl Into<DevicePath>, times: usize) {
        self.nodes.lock().failing_opens.insert(path.into(), times);
    }

    /// How many connections have been opened successfully so far.
    pub fn opens(&self) -> usize {
        self.nodes.lock().opens
    }
}

impl Locate for MockLocator {
    fn find(&self) -> Option<DevicePath> {
        self.nodes.lock().plugged.iter().next().cloned()
    }

    fn is_present(&self, path: &DevicePath) -> bool {
        self.nodes.lock().plugged.contains(path)
    }
}

/// Opens mock devices.
#[derive(Debug, Clone)]
pub struct MockConnector {
    nodes: SharedNodes,
    sessions_tx: mpsc::UnboundedSender<MockDevice>,
}

impl Connect for MockConnector {
    type Stream = MockStream;

    fn open(&self, path: &DevicePath) -> Result<MockStream, SerialPortError> {
        {
            let mut nodes = self.nodes.lock();

            if !nodes.plugged.contains(path) {
                return Err(SerialPortError::Open {
                    path: path.to_string(),
                    problem: "No such device".into(),
                });
            }

            if let Some(failures) = nodes.failing_opens.get_mut(path) {
                if *failures > 0 {
                    *failures -= 1;
                    return Err(SerialPortError::Open {
                        path: path.to_string(),
                        problem: "Device or resource busy".into(),
                    });
                }
            }

            nodes.opens += 1;
        }

        let (tx, rx) = mpsc::unbounded_channel();

        info!(%path, "Running mock");

        // Nobody listening for sessions is fine, the device just stays silent.
        let _ = self.sessions_tx.send(MockDevice {
            path: path.clone(),
            tx,
        });

        Ok(StreamReader::new(UnboundedReceiverStream::new(rx)))
    }
}

/// Receives a [`MockDevice`] for every connection opened by a [`MockConnector`].
#[derive(Debug)]
pub struct MockSessions(mpsc::UnboundedReceiver<MockDevice>);

impl MockSessions {
    /// Wait for the next connection to be opened.
    pub async fn next_session(&mut self) -> Option<MockDevice> {
        self.0.recv().await
    }
}

/// The device end of one mock connection.
///
/// Dropping it ends the connection, as if the cable was pulled.
#[derive(Debug)]
pub struct MockDevice {
    path: DevicePath,
    tx: mpsc::UnboundedSender<io::Result<Bytes>>,
}

impl MockDevice {
    /// Which path this connection was opened for.
    pub fn path(&self) -> &DevicePath {
        &self.path
    }

    /// Put raw bytes on the wire.
    /// Returns false if the reader has closed the connection.
    pub fn write_bytes(&self, bytes: impl Into<Bytes>) -> bool {
        self.tx.send(Ok(bytes.into())).is_ok()
    }

    /// Put a line on the wire, a newline is appended.
    /// Returns false if the reader has closed the connection.
    pub fn write_line(&self, line: &str) -> bool {
        self.write_bytes(format!("{line}\n"))
    }

    /// Make the connection fail with the given error.
    pub fn fail(self, error: io::Error) {
        let _ = self.tx.send(Err(error));
    }

    /// Whether the reader has closed its end of the connection.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::AsyncReadExt;

    use super::*;

    #[tokio::test]
    async fn plug_find_unplug() {
        let (locator, _connector, _sessions) = bench();

        assert_eq!(locator.find(), None);

        locator.plug("/dev/ttyUSB1");
        locator.plug("/dev/ttyACM0");
        assert_eq!(locator.find(), Some("/dev/ttyACM0".into()));

        locator.unplug("/dev/ttyACM0");
        assert_eq!(locator.find(), Some("/dev/ttyUSB1".into()));
        assert!(!locator.is_present(&"/dev/ttyACM0".into()));
    }

    #[tokio::test]
    async fn open_failures_are_counted_down() {
        let (locator, connector, _sessions) = bench();
        let path = DevicePath::from("/dev/ttyUSB0");

        assert!(connector.open(&path).is_err());

        locator.plug(path.clone());
        locator.fail_opens(path.clone(), 1);

        assert!(connector.open(&path).is_err());
        assert!(connector.open(&path).is_ok());
        assert_eq!(locator.opens(), 1);
    }

    #[tokio::test]
    async fn written_lines_are_readable() {
        let (locator, connector, mut sessions) = bench();
        locator.plug("/dev/ttyUSB0");

        let mut stream = connector.open(&"/dev/ttyUSB0".into()).unwrap();
        let device = sessions.next_session().await.unwrap();
        assert_eq!(device.path().as_str(), "/dev/ttyUSB0");

        assert!(device.write_line("hello"));
        drop(device);

        let mut read = String::new();
        stream.read_to_string(&mut read).await.unwrap();
        assert_eq!(read, "hello\n");
    }

    #[tokio::test]
    async fn closed_stream_is_noticed() {
        let (locator, connector, mut sessions) = bench();
        locator.plug("/dev/ttyUSB0");

        let stream = connector.open(&"/dev/ttyUSB0".into()).unwrap();
        let device = sessions.next_session().await.unwrap();
        assert!(!device.is_closed());

        drop(stream);
        assert!(device.is_closed());
        assert!(!device.write_line("anyone?"));
    }
}
