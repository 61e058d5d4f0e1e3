use std::{convert::Infallible, future::Future, time::Duration};

use tokio::{sync::oneshot, task::JoinHandle};
use tracing::{debug, info, info_span, trace, warn, Instrument};

use crate::{
    locator::{DevicePath, Locate},
    serial::{
        codecs::lines::{LinesCodec, DEFAULT_MAX_LINE_LENGTH},
        serial_port::Connect,
        LineReader,
    },
    snapshot,
    store::SnapshotStore,
};

/// Timing and framing settings for a [`Reader`].
#[derive(Debug, Clone)]
pub struct ReaderSettings {
    /// How long to wait for a line before checking that the device is still there.
    pub read_timeout: Duration,

    /// How long to wait before looking for the device again,
    /// after not finding it or failing to open it.
    pub retry_backoff: Duration,

    /// Longer lines are discarded.
    pub max_line_length: usize,
}

impl Default for ReaderSettings {
    fn default() -> Self {
        Self {
            read_timeout: Duration::from_secs(2),
            retry_backoff: Duration::from_secs(1),
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
        }
    }
}

enum State<S> {
    /// No connection, looking for a device.
    Searching,

    /// Connected and reading lines.
    Streaming {
        path: DevicePath,
        lines: LineReader<S>,
    },
}

/// Keeps a connection to the device and feeds its snapshots into the store.
///
/// Never gives up: not finding the device, failing to open it,
/// losing the connection and receiving garbage all lead back to
/// either searching or reading the next line.
pub struct Reader<L, C> {
    locator: L,
    connector: C,
    store: SnapshotStore,
    settings: ReaderSettings,

    /// The device found in the last discovery, to only log changes.
    last_found: Option<DevicePath>,
}

impl<L, C> Reader<L, C>
where
    L: Locate,
    C: Connect,
{
    /// Create a reader. It does nothing until run.
    pub fn new(locator: L, connector: C, store: SnapshotStore, settings: ReaderSettings) -> Self {
        Self {
            locator,
            connector,
            store,
            settings,
            last_found: None,
        }
    }

    /// Run until `shutdown` resolves.
    ///
    /// The connection, if any, is closed and the store marked
    /// as disconnected before returning.
    pub async fn run<F: Future<Output = ()>>(mut self, shutdown: F) {
        let store = self.store.clone();

        tokio::select! {
            _ = shutdown => {
                info!("Reader shutting down");
            }
            _ = self.run_forever() => {}
        }

        // The connection was owned by the `run_forever` future, which is gone now.
        store.set_connected(false);
    }

    async fn run_forever(&mut self) -> Infallible {
        let mut state = State::Searching;

        loop {
            state = match state {
                State::Searching => self.search().await,
                State::Streaming { path, lines } => {
                    let span = info_span!("tty", %path);
                    self.stream(&path, lines).instrument(span).await;
                    State::Searching
                }
            };
        }
    }

    async fn search(&mut self) -> State<C::Stream> {
        let Some(path) = self.locator.find() else {
            if let Some(last) = self.last_found.take() {
                info!(%last, "Device not found anymore");
            }

            self.store.set_connected(false);
            tokio::time::sleep(self.settings.retry_backoff).await;

            return State::Searching;
        };

        if self.last_found.as_ref() != Some(&path) {
            info!(%path, "Found device");
            self.last_found = Some(path.clone());
        }

        match self.connector.open(&path) {
            Ok(stream) => {
                info!(%path, "Connected");
                self.store.set_connected(true);

                let codec = LinesCodec::with_max_length(self.settings.max_line_length);

                State::Streaming {
                    path,
                    lines: LineReader::new(stream, codec, self.settings.read_timeout),
                }
            }
            Err(e) => {
                warn!(%path, %e, "Could not connect, retrying in {:?}", self.settings.retry_backoff);

                self.store.set_connected(false);
                tokio::time::sleep(self.settings.retry_backoff).await;

                State::Searching
            }
        }
    }

    /// Read lines until the connection is over.
    async fn stream(&mut self, path: &DevicePath, mut lines: LineReader<C::Stream>) {
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => match snapshot::parse(&line) {
                    Some(snapshot) => {
                        debug!(%snapshot, "Updated");
                        self.store.publish(snapshot);
                    }
                    None => trace!(%line, "Ignored line"),
                },
                Ok(None) => {
                    if !self.locator.is_present(path) {
                        info!("Device vanished");
                        break;
                    }
                }
                Err(e) => {
                    warn!(%e, "Connection lost");
                    break;
                }
            }
        }

        // Close before reporting, so `connected` never outlives the connection.
        drop(lines);
        self.store.set_connected(false);
    }
}

impl<L, C> Reader<L, C>
where
    L: Locate + 'static,
    C: Connect + 'static,
{
    /// Run the reader on its own task.
    pub fn spawn(self) -> ReaderHandle {
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(self.run(async move {
            // A dropped sender also means shut down.
            let _ = shutdown_rx.await;
        }));

        ReaderHandle { shutdown_tx, task }
    }
}

/// A reader running on its own task.
#[derive(Debug)]
pub struct ReaderHandle {
    shutdown_tx: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl ReaderHandle {
    /// Stop the reader and wait for it to release the device.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(());

        if let Err(e) = self.task.await {
            warn!(%e, "Reader task did not finish cleanly");
        }
    }
}
