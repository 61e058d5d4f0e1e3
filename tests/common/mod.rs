#![allow(dead_code)]

use std::time::Duration;

use axum::{
    body::{Body, HttpBody},
    http::{self, Request},
    response::Response,
};
use color_eyre::Result;
use telemetry_bridge::{
    mock::{self, MockLocator, MockSessions},
    reader::{Reader, ReaderHandle, ReaderSettings},
    server,
    store::{Reading, SnapshotStore},
};
use tokio::{sync::oneshot, time::timeout};
use tower::ServiceExt;
use tracing::Level;

pub fn fast_settings() -> ReaderSettings {
    ReaderSettings {
        read_timeout: Duration::from_millis(20),
        retry_backoff: Duration::from_millis(10),
        ..Default::default()
    }
}

pub struct Bridge {
    pub locator: MockLocator,
    pub sessions: MockSessions,
    pub store: SnapshotStore,
    pub reader: ReaderHandle,
}

/// A reader running against mock devices.
pub async fn start_reader() -> Bridge {
    telemetry_bridge::logging::init(Level::DEBUG, None).await;

    let (locator, connector, sessions) = mock::bench();
    let store = SnapshotStore::new();

    let reader = Reader::new(locator.clone(), connector, store.clone(), fast_settings()).spawn();

    Bridge {
        locator,
        sessions,
        store,
        reader,
    }
}

/// Poll the store until the predicate holds.
pub async fn wait_for(store: &SnapshotStore, predicate: impl Fn(&Reading) -> bool) -> Result<Reading> {
    let reading = timeout(Duration::from_secs(5), async {
        loop {
            let reading = store.read();
            if predicate(&reading) {
                return reading;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await?;

    Ok(reading)
}

/// Serve the store on an arbitrary port.
pub async fn start_server(store: SnapshotStore) -> u16 {
    let (port_tx, port_rx) = oneshot::channel();

    tokio::spawn(async move { server::run_any_port(store, port_tx).await });
    port_rx
        .await
        .expect("Server should reply with allocated port")
}

/// Send a GET straight to the router, no sockets involved.
pub async fn get(store: &SnapshotStore, uri: &str) -> Result<Response> {
    let request = Request::builder().uri(uri).body(Body::empty())?;

    Ok(server::router(store.clone()).oneshot(request).await?)
}

pub async fn body_json<B>(response: http::Response<B>) -> Result<serde_json::Value>
where
    B: HttpBody,
    B::Error: std::error::Error + Send + Sync + 'static,
{
    let bytes = hyper::body::to_bytes(response.into_body()).await?;

    Ok(serde_json::from_slice(&bytes)?)
}
