// ── Wire-to-domain conversions ──
//
// Bridges `fibermap_api` records into canonical `fibermap_core::model`
// types and back into request payloads. Records that cannot be mapped
// onto the domain (no id, a path without two ends) are inconsistencies.

use std::str::FromStr;

use fibermap_api::{
    CableBody, CablePathBody, CableRecord, CreateCablePayload, DevicePositionPayload,
    DeviceRecord, PathRecord, PortRecord, RecordId, TerminationPayload, TerminationRecord,
    UpdateCablePathPayload,
};

use crate::error::CoreError;
use crate::model::{Cable, CableRef, Device, DeviceType, Endpoint, EntityId, Point, Port};

fn inconsistent(message: impl Into<String>) -> CoreError {
    CoreError::RemoteInconsistency {
        message: message.into(),
    }
}

// ── Devices ──────────────────────────────────────────────────────────

fn port_from_record(device_id: &EntityId, record: PortRecord) -> Port {
    Port {
        id: EntityId::from(record.id),
        device_id: device_id.clone(),
        name: record
            .name
            .unwrap_or_else(|| format!("Port {}", record.position)),
        position: record.position,
        occupied: false,
    }
}

impl TryFrom<DeviceRecord> for Device {
    type Error = CoreError;

    fn try_from(record: DeviceRecord) -> Result<Self, Self::Error> {
        let (Some(lat), Some(lng)) = (record.latitude, record.longitude) else {
            return Err(inconsistent(format!("device {} has no position", record.id)));
        };
        let id = EntityId::from(record.id);
        let device_type = DeviceType::from_str(&record.device_type)
            .unwrap_or_else(|_| DeviceType::Other(record.device_type.clone()));
        let mut ports: Vec<Port> = record
            .ports
            .into_iter()
            .map(|p| port_from_record(&id, p))
            .collect();
        ports.sort_by_key(|p| p.position);

        Ok(Device {
            id,
            name: record.name,
            device_type,
            position: Point::new(lat, lng),
            ports,
        })
    }
}

// ── Cables ───────────────────────────────────────────────────────────

fn endpoint_from_record(record: Option<TerminationRecord>) -> Endpoint {
    record.map_or_else(Endpoint::default, |t| Endpoint {
        device_id: Some(EntityId::from(t.device.id)),
        port_id: Some(EntityId::from(t.id)),
        port_name: t.name,
    })
}

impl TryFrom<CableRecord> for Cable {
    type Error = CoreError;

    fn try_from(record: CableRecord) -> Result<Self, Self::Error> {
        let id = record
            .id
            .map(EntityId::from)
            .ok_or_else(|| inconsistent("cable record without id"))?;
        let coords = record.path.map(|p| p.coords).unwrap_or_default();
        let (Some(first), Some(last)) = (coords.first(), coords.last()) else {
            return Err(inconsistent(format!("cable {id} has no path")));
        };
        if coords.len() < 2 {
            return Err(inconsistent(format!(
                "cable {id} path has {} point(s), need at least 2",
                coords.len()
            )));
        }
        let from = Point::from_coord(*first);
        let to = Point::from_coord(*last);
        let waypoints = coords[1..coords.len() - 1]
            .iter()
            .copied()
            .map(Point::from_coord)
            .collect();

        Ok(Cable {
            id: CableRef::Persisted(id),
            name: record.name.unwrap_or_default(),
            cable_type: record.cable_type.unwrap_or_default(),
            from,
            to,
            waypoints,
            start: endpoint_from_record(record.start),
            end: endpoint_from_record(record.end),
        })
    }
}

// ── Payloads ─────────────────────────────────────────────────────────

pub(crate) fn path_record(path: &[Point]) -> PathRecord {
    PathRecord {
        coords: path.iter().map(|p| p.to_coord()).collect(),
    }
}

fn termination(endpoint: &Endpoint) -> Option<TerminationPayload> {
    Some(TerminationPayload {
        device_id: RecordId::from(endpoint.device_id.as_ref()?),
        port_id: RecordId::from(endpoint.port_id.as_ref()?),
    })
}

/// `POST cables/` body. Both ends must have a port.
pub(crate) fn create_payload(cable: &Cable) -> Result<CreateCablePayload, CoreError> {
    let incomplete = || {
        CoreError::validation(format!(
            "cable {} cannot be saved with an incomplete port assignment",
            cable.id
        ))
    };
    Ok(CreateCablePayload {
        start: termination(&cable.start).ok_or_else(incomplete)?,
        end: termination(&cable.end).ok_or_else(incomplete)?,
        cable: CableBody {
            name: cable.name.clone(),
            cable_type: cable.cable_type.clone(),
            path: path_record(&cable.path()),
        },
    })
}

/// `PATCH cables/{id}/` body.
pub(crate) fn path_payload(path: &[Point]) -> UpdateCablePathPayload {
    UpdateCablePathPayload {
        cable: CablePathBody {
            path: path_record(path),
        },
    }
}

pub(crate) fn position_payload(position: Point) -> DevicePositionPayload {
    DevicePositionPayload {
        latitude: position.lat,
        longitude: position.lng,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn cable_record(value: serde_json::Value) -> CableRecord {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn cable_path_splits_into_ends_and_waypoints() {
        let cable = Cable::try_from(cable_record(json!({
            "id": 3,
            "name": "FO-3",
            "type": "drop",
            "path": { "coords": [[10.0, 20.0], [10.5, 20.5], [11.0, 21.0]] },
            "start": { "id": 70, "name": "IN", "device": { "id": 7 } },
            "end": null
        })))
        .unwrap();

        assert_eq!(cable.id, CableRef::Persisted(EntityId::Numeric(3)));
        assert_eq!(cable.from, Point::new(10.0, 20.0));
        assert_eq!(cable.to, Point::new(11.0, 21.0));
        assert_eq!(cable.waypoints, vec![Point::new(10.5, 20.5)]);
        assert_eq!(cable.start.port_id, Some(EntityId::Numeric(70)));
        assert_eq!(cable.start.port_name.as_deref(), Some("IN"));
        assert_eq!(cable.end, Endpoint::default());
    }

    #[test]
    fn cable_without_id_is_inconsistent() {
        let err = Cable::try_from(cable_record(json!({
            "path": { "coords": [[0.0, 0.0], [1.0, 1.0]] }
        })))
        .unwrap_err();
        assert!(matches!(err, CoreError::RemoteInconsistency { .. }));
    }

    #[test]
    fn single_point_path_is_inconsistent() {
        let err = Cable::try_from(cable_record(json!({
            "id": 9,
            "path": { "coords": [[0.0, 0.0]] }
        })))
        .unwrap_err();
        assert!(err.to_string().contains("need at least 2"));
    }

    #[test]
    fn device_record_maps_type_and_sorts_ports() {
        let record: DeviceRecord = serde_json::from_value(json!({
            "id": 7,
            "type": "cabinet",
            "latitude": 1.0,
            "longitude": 2.0,
            "ports": [
                { "id": 72, "position": 2 },
                { "id": 71, "name": "IN", "position": 1 }
            ]
        }))
        .unwrap();

        let device = Device::try_from(record).unwrap();
        assert_eq!(device.device_type, DeviceType::DistributionBox);
        assert_eq!(device.ports[0].name, "IN");
        assert_eq!(device.ports[1].name, "Port 2");
        assert_eq!(device.ports[1].device_id, EntityId::Numeric(7));
    }

    #[test]
    fn create_payload_requires_both_ports() {
        let mut cable = Cable::try_from(cable_record(json!({
            "id": 3,
            "type": "drop",
            "path": { "coords": [[0.0, 0.0], [1.0, 1.0]] },
            "start": { "id": 70, "device": { "id": 7 } },
            "end": { "id": 80, "device": { "id": 8 } }
        })))
        .unwrap();

        let payload = create_payload(&cable).unwrap();
        assert_eq!(payload.start.port_id, RecordId::Number(70));
        assert_eq!(payload.cable.path.coords, vec![[0.0, 0.0], [1.0, 1.0]]);

        cable.end.detach();
        assert!(matches!(
            create_payload(&cable),
            Err(CoreError::Validation { .. })
        ));
    }
}
