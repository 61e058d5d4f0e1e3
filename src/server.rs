use std::net::SocketAddr;

use axum::{routing::get, Extension, Router};
use tokio::sync::oneshot;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::{api, error::Error, store::SnapshotStore};

/// The routes of the bridge.
///
/// Only `GET /api/sensors` exists, anything else is a 404.
pub fn router(store: SnapshotStore) -> Router {
    Router::new().route(api::SENSORS_PATH, get(api::sensors)).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            // Each handler needs to be able to read the store
            .layer(Extension(store)),
    )
}

async fn run(
    store: SnapshotStore,
    addr: SocketAddr,
    allocated_port: Option<oneshot::Sender<u16>>,
) -> Result<(), Error> {
    let server = axum::Server::try_bind(&addr)
        .map_err(|e| Error::Server(format!("Could not bind to {addr}: {e}")))?
        .serve(router(store).into_make_service());
    let addr = server.local_addr();

    if let Some(port_reply) = allocated_port {
        // The caller may have stopped caring, which is fine.
        let _ = port_reply.send(addr.port());
    }

    info!("listening on {}", addr);
    info!("Sensor data: http://{addr}{}", api::SENSORS_PATH);

    server.await.map_err(|e| Error::Server(e.to_string()))
}

/// Start the server on an arbitrary available port on localhost.
/// The port allocated will be sent on the provided channel.
pub async fn run_any_port(
    store: SnapshotStore,
    allocated_port: oneshot::Sender<u16>,
) -> Result<(), Error> {
    run(
        store,
        SocketAddr::from(([127, 0, 0, 1], 0)),
        Some(allocated_port),
    )
    .await
}

/// Start the server on the given address.
pub async fn run_on(store: SnapshotStore, addr: SocketAddr) -> Result<(), Error> {
    run(store, addr, None).await
}
