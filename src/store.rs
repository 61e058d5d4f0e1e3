use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use serde_json::Value;

use crate::snapshot::Snapshot;

#[derive(Debug, Default)]
struct State {
    snapshot: Snapshot,
    connected: bool,
}

/// What a reader of the store gets: the latest snapshot
/// and whether the device is currently connected.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Reading {
    /// The latest snapshot, or an empty one if nothing was received yet.
    pub snapshot: Snapshot,

    /// Whether a connection to the device is currently open.
    pub connected: bool,
}

impl Reading {
    /// The snapshot's fields with `connected` merged in at the top level.
    ///
    /// If the device itself sends a field named `connected`, it is overwritten.
    pub fn to_json(&self) -> Value {
        let mut fields = self.snapshot.fields().clone();
        fields.insert("connected".into(), Value::Bool(self.connected));

        Value::Object(fields)
    }
}

/// Holds the most recent [`Snapshot`] and the connectivity flag.
///
/// There is one writer (the reader task) and any number of readers
/// (HTTP handlers). Clones share the same state.
///
/// The lock is only ever held while copying or replacing,
/// never across IO or parsing.
#[derive(Debug, Clone, Default)]
pub struct SnapshotStore {
    inner: Arc<Mutex<State>>,
}

impl SnapshotStore {
    /// A store with an empty snapshot, not connected.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // Holders only ever assign whole fields, a poisoned state is still whole.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the stored snapshot.
    pub fn publish(&self, snapshot: Snapshot) {
        self.lock().snapshot = snapshot;
    }

    /// Update the connectivity flag.
    pub fn set_connected(&self, connected: bool) {
        self.lock().connected = connected;
    }

    /// A copy of the current state.
    pub fn read(&self) -> Reading {
        let state = self.lock();

        Reading {
            snapshot: state.snapshot.clone(),
            connected: state.connected,
        }
    }
}
