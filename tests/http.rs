use axum::http::{header, StatusCode};
use color_eyre::Result;
use common::*;
use pretty_assertions::assert_eq;
use serde_json::json;
use telemetry_bridge::{snapshot, store::SnapshotStore};

mod common;

#[tokio::test]
async fn empty_store_is_served() -> Result<()> {
    let store = SnapshotStore::new();

    let response = get(&store, "/api/sensors").await?;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await?, json!({"connected": false}));

    Ok(())
}

#[tokio::test]
async fn sensors_response_has_contract_headers() -> Result<()> {
    let store = SnapshotStore::new();

    let response = get(&store, "/api/sensors").await?;

    assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN].to_str()?, "*");
    assert_eq!(response.headers()[header::CONTENT_TYPE].to_str()?, "application/json");

    Ok(())
}

#[tokio::test]
async fn latest_snapshot_with_connected_is_served() -> Result<()> {
    let store = SnapshotStore::new();

    store.set_connected(true);
    store.publish(snapshot::parse(r#"{"temperature":21.5,"aqi_level":"Good"}"#).unwrap());

    let response = get(&store, "/api/sensors").await?;
    assert_eq!(
        body_json(response).await?,
        json!({"temperature": 21.5, "aqi_level": "Good", "connected": true})
    );

    // During an outage the last reading is still served.
    store.set_connected(false);

    let response = get(&store, "/api/sensors").await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await?,
        json!({"temperature": 21.5, "aqi_level": "Good", "connected": false})
    );

    Ok(())
}

#[tokio::test]
async fn query_string_is_ignored() -> Result<()> {
    let store = SnapshotStore::new();

    let response = get(&store, "/api/sensors?t=12345").await?;

    assert_eq!(response.status(), StatusCode::OK);

    Ok(())
}

#[tokio::test]
async fn other_paths_are_not_found() -> Result<()> {
    let store = SnapshotStore::new();

    for path in ["/", "/api", "/api/sensors/extra", "/version"] {
        let response = get(&store, path).await?;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "path: {path}");
    }

    Ok(())
}

#[tokio::test]
async fn served_over_tcp() -> Result<()> {
    let store = SnapshotStore::new();
    store.publish(snapshot::parse(r#"{"pm2_5":7}"#).unwrap());

    let port = start_server(store).await;

    let uri: hyper::Uri = format!("http://127.0.0.1:{port}/api/sensors").parse()?;
    let response = hyper::Client::new().get(uri).await?;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN].to_str()?, "*");
    assert_eq!(
        body_json(response).await?,
        json!({"pm2_5": 7, "connected": false})
    );

    Ok(())
}

#[tokio::test]
async fn end_to_end_from_mock_device() -> Result<()> {
    let mut bridge = start_reader().await;

    let response = get(&bridge.store, "/api/sensors").await?;
    assert_eq!(body_json(response).await?, json!({"connected": false}));

    bridge.locator.plug("/dev/ttyUSB0");
    let device = bridge.sessions.next_session().await.unwrap();
    device.write_line("ets Jun  8 2016 00:22:57");
    device.write_line(r#"{"temperature":22.25,"humidity":41.0,"pm2_5":7}"#);

    wait_for(&bridge.store, |r| !r.snapshot.is_empty()).await?;

    let response = get(&bridge.store, "/api/sensors").await?;
    assert_eq!(
        body_json(response).await?,
        json!({"temperature": 22.25, "humidity": 41.0, "pm2_5": 7, "connected": true})
    );

    bridge.locator.unplug("/dev/ttyUSB0");
    drop(device);
    wait_for(&bridge.store, |r| !r.connected).await?;

    let response = get(&bridge.store, "/api/sensors").await?;
    assert_eq!(
        body_json(response).await?,
        json!({"temperature": 22.25, "humidity": 41.0, "pm2_5": 7, "connected": false})
    );

    bridge.reader.shutdown().await;

    Ok(())
}
