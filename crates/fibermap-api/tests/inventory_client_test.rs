#![allow(clippy::unwrap_used)]
// Integration tests for `InventoryClient` using wiremock.

use pretty_assertions::assert_eq;
use serde_json::json;
use url::Url;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use fibermap_api::{
    CablePathBody, CableBody, CreateCablePayload, DevicePositionPayload, Error, InventoryClient,
    PathRecord, RecordId, TerminationPayload, TransportConfig, UpdateCablePathPayload,
};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, InventoryClient) {
    let server = MockServer::start().await;
    let base_url = Url::parse(&format!("{}/api/topology/", server.uri())).unwrap();
    let client = InventoryClient::with_client(reqwest::Client::new(), base_url);
    (server, client)
}

fn api_path(suffix: &str) -> String {
    format!("/api/topology/{suffix}")
}

// ── Authentication ──────────────────────────────────────────────────

#[tokio::test]
async fn test_token_header_is_sent() {
    let server = MockServer::start().await;
    let base_url = Url::parse(&format!("{}/api/topology", server.uri())).unwrap();
    let token: secrecy::SecretString = "s3cret".to_string().into();
    let client = InventoryClient::new(base_url, &token, &TransportConfig::default()).unwrap();

    Mock::given(method("GET"))
        .and(path(api_path("devices/")))
        .and(header("authorization", "Token s3cret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let devices = client.list_devices().await.unwrap();
    assert!(devices.is_empty());
}

#[tokio::test]
async fn test_unauthorized_maps_to_authentication() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path(api_path("cables/")))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({ "detail": "Invalid token." })),
        )
        .mount(&server)
        .await;

    let result = client.list_cables().await;
    match result {
        Err(Error::Authentication { message }) => assert_eq!(message, "Invalid token."),
        other => panic!("expected Authentication error, got: {other:?}"),
    }
}

// ── Devices ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_list_devices_paginated() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path(api_path("devices/")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "count": 1,
            "results": [{
                "id": 7,
                "type": "splitter",
                "name": "SPL-7",
                "latitude": 10.0,
                "longitude": 20.0,
                "ports": [
                    { "id": 70, "name": "IN", "position": 0 },
                    { "id": 71, "name": "OUT-1", "position": 1 }
                ]
            }]
        })))
        .mount(&server)
        .await;

    let devices = client.list_devices().await.unwrap();

    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0].id, RecordId::Number(7));
    assert_eq!(devices[0].device_type, "splitter");
    assert_eq!(devices[0].ports.len(), 2);
    assert_eq!(devices[0].ports[1].name.as_deref(), Some("OUT-1"));
}

#[tokio::test]
async fn test_update_device_position() {
    let (server, client) = setup().await;

    Mock::given(method("PATCH"))
        .and(path(api_path("splitters/7/")))
        .and(body_json(json!({ "latitude": 10.5, "longitude": 20.5 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": 7 })))
        .expect(1)
        .mount(&server)
        .await;

    client
        .update_device_position(
            "splitters",
            &RecordId::Number(7),
            DevicePositionPayload {
                latitude: 10.5,
                longitude: 20.5,
            },
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn test_delete_device_not_found() {
    let (server, client) = setup().await;

    Mock::given(method("DELETE"))
        .and(path(api_path("olts/99/")))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = client
        .delete_device("olts", &RecordId::Number(99))
        .await
        .unwrap_err();
    assert!(err.is_not_found(), "expected not found, got: {err:?}");
}

// ── Cables ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_list_cables_bare_array() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path(api_path("cables/")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "id": 3,
                "name": "FO-3",
                "type": "drop",
                "path": { "coords": [[10.0, 20.0], [10.5, 20.5], [11.0, 21.0]] },
                "start": { "id": 70, "name": "IN", "device": { "id": 7 } },
                "end": null
            }
        ])))
        .mount(&server)
        .await;

    let cables = client.list_cables().await.unwrap();

    assert_eq!(cables.len(), 1);
    let cable = &cables[0];
    assert_eq!(cable.id, Some(RecordId::Number(3)));
    assert_eq!(cable.path.as_ref().unwrap().coords.len(), 3);
    assert_eq!(
        cable.start.as_ref().unwrap().device.id,
        RecordId::Number(7)
    );
    assert!(cable.end.is_none());
}

#[tokio::test]
async fn test_create_cable_posts_payload() {
    let (server, client) = setup().await;

    let payload = CreateCablePayload {
        start: TerminationPayload {
            device_id: RecordId::Number(1),
            port_id: RecordId::Number(10),
        },
        end: TerminationPayload {
            device_id: RecordId::Number(2),
            port_id: RecordId::Number(20),
        },
        cable: CableBody {
            name: "FO-new".into(),
            cable_type: "feeder".into(),
            path: PathRecord {
                coords: vec![[0.0, 0.0], [0.5, 0.5], [1.0, 1.0]],
            },
        },
    };

    Mock::given(method("POST"))
        .and(path(api_path("cables/")))
        .and(body_json(json!({
            "start": { "device_id": 1, "port_id": 10 },
            "end": { "device_id": 2, "port_id": 20 },
            "cable": {
                "name": "FO-new",
                "type": "feeder",
                "path": { "coords": [[0.0, 0.0], [0.5, 0.5], [1.0, 1.0]] }
            }
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": 55,
            "name": "FO-new",
            "type": "feeder",
            "path": { "coords": [[0.0, 0.0], [0.5, 0.5], [1.0, 1.0]] },
            "start": { "id": 10, "name": "P10", "device": { "id": 1 } },
            "end": { "id": 20, "name": "P20", "device": { "id": 2 } }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let created = client.create_cable(&payload).await.unwrap();
    assert_eq!(created.id, Some(RecordId::Number(55)));
}

#[tokio::test]
async fn test_update_cable_path_server_error() {
    let (server, client) = setup().await;

    Mock::given(method("PATCH"))
        .and(path(api_path("cables/3/")))
        .respond_with(
            ResponseTemplate::new(503).set_body_json(json!({ "detail": "maintenance" })),
        )
        .mount(&server)
        .await;

    let payload = UpdateCablePathPayload {
        cable: CablePathBody {
            path: PathRecord {
                coords: vec![[0.0, 0.0], [1.0, 1.0]],
            },
        },
    };
    let err = client
        .update_cable_path(&RecordId::Number(3), &payload)
        .await
        .unwrap_err();

    match err {
        Error::Api { status, ref message } => {
            assert_eq!(status, 503);
            assert_eq!(message, "maintenance");
            assert!(err.is_transient());
        }
        other => panic!("expected Api error, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_delete_cable() {
    let (server, client) = setup().await;

    Mock::given(method("DELETE"))
        .and(path(api_path("cables/3/")))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    client.delete_cable(&RecordId::Number(3)).await.unwrap();
}

#[tokio::test]
async fn test_malformed_body_is_deserialization_error() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path(api_path("cables/")))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let err = client.list_cables().await.unwrap_err();
    assert!(
        matches!(err, Error::Deserialization { .. }),
        "expected Deserialization error, got: {err:?}"
    );
}
