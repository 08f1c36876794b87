// Wire records for the inventory service.
//
// These mirror the JSON the service speaks and nothing more. Domain
// types live in fibermap-core, which converts in both directions.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier as the service emits it: numeric primary keys on most
/// deployments, opaque strings on some.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Number(u64),
    Text(String),
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => write!(f, "{s}"),
        }
    }
}

/// List endpoints answer either with a bare array or with a paginated
/// `{ "count": .., "results": [..] }` page.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ListResponse<T> {
    Page { results: Vec<T> },
    Bare(Vec<T>),
}

impl<T> ListResponse<T> {
    pub(crate) fn into_items(self) -> Vec<T> {
        match self {
            Self::Page { results } => results,
            Self::Bare(items) => items,
        }
    }
}

// ── Devices ─────────────────────────────────────────────────────────

/// `GET devices/` element.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceRecord {
    pub id: RecordId,
    #[serde(rename = "type", alias = "device_type")]
    pub device_type: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub ports: Vec<PortRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortRecord {
    pub id: RecordId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub position: u32,
}

/// Body of a device position update.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DevicePositionPayload {
    pub latitude: f64,
    pub longitude: f64,
}

// ── Cables ──────────────────────────────────────────────────────────

/// `GET cables/` element and the body returned by create/update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CableRecord {
    #[serde(default)]
    pub id: Option<RecordId>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type", default)]
    pub cable_type: Option<String>,
    #[serde(default)]
    pub path: Option<PathRecord>,
    #[serde(default)]
    pub start: Option<TerminationRecord>,
    #[serde(default)]
    pub end: Option<TerminationRecord>,
}

/// Polyline as `[[lat, lng], ...]`; first and last are the cable ends.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PathRecord {
    #[serde(default)]
    pub coords: Vec<[f64; 2]>,
}

/// A cable end as the service reports it: the port plus its device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerminationRecord {
    pub id: RecordId,
    #[serde(default)]
    pub name: Option<String>,
    pub device: DeviceRefRecord,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceRefRecord {
    pub id: RecordId,
}

/// Body of `POST cables/`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCablePayload {
    pub start: TerminationPayload,
    pub end: TerminationPayload,
    pub cable: CableBody,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerminationPayload {
    pub device_id: RecordId,
    pub port_id: RecordId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CableBody {
    pub name: String,
    #[serde(rename = "type")]
    pub cable_type: String,
    pub path: PathRecord,
}

/// Body of `PATCH cables/{id}/`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateCablePathPayload {
    pub cable: CablePathBody,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CablePathBody {
    pub path: PathRecord,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn record_id_accepts_numbers_and_strings() {
        let n: RecordId = serde_json::from_value(json!(42)).unwrap();
        let s: RecordId = serde_json::from_value(json!("olt-7")).unwrap();
        assert_eq!(n, RecordId::Number(42));
        assert_eq!(s.to_string(), "olt-7");
    }

    #[test]
    fn cable_record_tolerates_null_terminations() {
        let rec: CableRecord = serde_json::from_value(json!({
            "id": 3,
            "name": "FO-12",
            "type": "drop",
            "path": { "coords": [[1.0, 2.0], [3.0, 4.0]] },
            "start": null,
            "end": { "id": 9, "name": "P1", "device": { "id": 4 } }
        }))
        .unwrap();

        assert!(rec.start.is_none());
        assert_eq!(rec.end.unwrap().device.id, RecordId::Number(4));
        assert_eq!(rec.path.unwrap().coords.len(), 2);
    }

    #[test]
    fn list_response_unwraps_pages() {
        let page: ListResponse<PortRecord> = serde_json::from_value(json!({
            "count": 1,
            "results": [{ "id": 1, "name": "P1", "position": 1 }]
        }))
        .unwrap();
        assert_eq!(page.into_items().len(), 1);

        let bare: ListResponse<PortRecord> =
            serde_json::from_value(json!([{ "id": 1 }, { "id": 2 }])).unwrap();
        assert_eq!(bare.into_items().len(), 2);
    }

    #[test]
    fn create_payload_uses_type_key() {
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
                name: "FO-1".into(),
                cable_type: "feeder".into(),
                path: PathRecord {
                    coords: vec![[0.0, 0.0], [1.0, 1.0]],
                },
            },
        };
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["cable"]["type"], "feeder");
        assert_eq!(value["start"]["port_id"], 10);
    }
}
