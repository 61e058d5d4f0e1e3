use axum::{http::header, response::IntoResponse, Extension, Json};
use tracing::trace;

use crate::store::SnapshotStore;

/// The path serving the latest reading.
pub(crate) const SENSORS_PATH: &str = "/api/sensors";

/// The latest snapshot with `connected` merged in.
///
/// Always succeeds: during an outage the last known (or empty) snapshot
/// is served with `connected: false`.
pub(crate) async fn sensors(Extension(store): Extension<SnapshotStore>) -> impl IntoResponse {
    let reading = store.read();

    trace!(
        connected = reading.connected,
        fields = reading.snapshot.len(),
        "Serving reading"
    );

    (
        [(header::ACCESS_CONTROL_ALLOW_ORIGIN, "*")],
        Json(reading.to_json()),
    )
}
