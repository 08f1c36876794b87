// In-memory inventory used by the session integration tests.
#![allow(dead_code, clippy::unwrap_used)]

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use fibermap_core::{
    Cable, CableRef, CoreError, Device, DeviceType, Endpoint, EntityId, PersistenceGateway, Point,
    Port,
};

/// One recorded gateway call.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    ListDevices,
    ListCables,
    CreateCable { name: String },
    UpdateCablePath { id: EntityId, path: Vec<Point> },
    DeleteCable { id: EntityId },
    UpdateDevicePosition { id: EntityId, position: Point },
    DeleteDevice { id: EntityId },
}

#[derive(Default)]
struct State {
    devices: Vec<Device>,
    cables: Vec<Cable>,
    next_id: u64,
    calls: Vec<Call>,
    failing: HashSet<&'static str>,
    missing: HashSet<EntityId>,
    write_delay: Option<Duration>,
}

/// Cheap-clone fake; clones share state.
#[derive(Clone, Default)]
pub struct FakeGateway {
    state: Arc<Mutex<State>>,
}

impl FakeGateway {
    pub fn new(devices: Vec<Device>, cables: Vec<Cable>) -> Self {
        let gateway = Self::default();
        {
            let mut state = gateway.state.lock().unwrap();
            state.devices = devices;
            state.cables = cables;
            state.next_id = 1000;
        }
        gateway
    }

    /// Every call to `operation` fails with a 500 until `heal` is called.
    pub fn fail(&self, operation: &'static str) {
        self.state.lock().unwrap().failing.insert(operation);
    }

    pub fn heal(&self) {
        self.state.lock().unwrap().failing.clear();
    }

    /// Deleting `id` answers 404.
    pub fn forget(&self, id: EntityId) {
        self.state.lock().unwrap().missing.insert(id);
    }

    /// Creates and updates take `delay` to answer.
    pub fn delay_writes(&self, delay: Duration) {
        self.state.lock().unwrap().write_delay = Some(delay);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Calls other than the list refreshes.
    pub fn writes(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| !matches!(c, Call::ListDevices | Call::ListCables))
            .collect()
    }

    pub fn refreshes(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::ListCables))
            .count()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    pub fn stored_cables(&self) -> Vec<Cable> {
        self.state.lock().unwrap().cables.clone()
    }

    pub fn stored_device(&self, id: u64) -> Option<Device> {
        let state = self.state.lock().unwrap();
        state
            .devices
            .iter()
            .find(|d| d.id == EntityId::Numeric(id))
            .cloned()
    }

    fn record(&self, call: Call, operation: &'static str) -> Result<(), CoreError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call);
        if state.failing.contains(operation) {
            return Err(CoreError::RemoteOperationFailure {
                operation: operation.into(),
                message: "HTTP 500: injected failure".into(),
                status: Some(500),
            });
        }
        Ok(())
    }

    async fn answer_later(&self) {
        let delay = self.state.lock().unwrap().write_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

impl PersistenceGateway for FakeGateway {
    async fn list_devices(&self) -> Result<Vec<Device>, CoreError> {
        self.record(Call::ListDevices, "list devices")?;
        Ok(self.state.lock().unwrap().devices.clone())
    }

    async fn list_cables(&self) -> Result<Vec<Cable>, CoreError> {
        self.record(Call::ListCables, "list cables")?;
        Ok(self.state.lock().unwrap().cables.clone())
    }

    async fn create_cable(&self, cable: &Cable) -> Result<Cable, CoreError> {
        self.record(
            Call::CreateCable {
                name: cable.name.clone(),
            },
            "create cable",
        )?;
        self.answer_later().await;
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let created = Cable {
            id: CableRef::Persisted(EntityId::Numeric(state.next_id)),
            ..cable.clone()
        };
        state.cables.push(created.clone());
        Ok(created)
    }

    async fn update_cable_path(&self, id: &EntityId, path: &[Point]) -> Result<Cable, CoreError> {
        self.record(
            Call::UpdateCablePath {
                id: id.clone(),
                path: path.to_vec(),
            },
            "update cable path",
        )?;
        self.answer_later().await;
        let mut state = self.state.lock().unwrap();
        let cable = state
            .cables
            .iter_mut()
            .find(|c| c.id.as_persisted() == Some(id))
            .ok_or_else(|| CoreError::RemoteOperationFailure {
                operation: "update cable path".into(),
                message: "HTTP 404: not found".into(),
                status: Some(404),
            })?;
        let (first, rest) = path.split_first().unwrap();
        let (last, middle) = rest.split_last().unwrap();
        cable.from = *first;
        cable.to = *last;
        cable.waypoints = middle.to_vec();
        Ok(cable.clone())
    }

    async fn delete_cable(&self, id: &EntityId) -> Result<(), CoreError> {
        self.record(Call::DeleteCable { id: id.clone() }, "delete cable")?;
        let mut state = self.state.lock().unwrap();
        if state.missing.contains(id) {
            return Err(CoreError::RemoteOperationFailure {
                operation: "delete cable".into(),
                message: "HTTP 404: not found".into(),
                status: Some(404),
            });
        }
        state.cables.retain(|c| c.id.as_persisted() != Some(id));
        Ok(())
    }

    async fn update_device_position(
        &self,
        _device_type: &DeviceType,
        id: &EntityId,
        position: Point,
    ) -> Result<(), CoreError> {
        self.record(
            Call::UpdateDevicePosition {
                id: id.clone(),
                position,
            },
            "update device position",
        )?;
        self.answer_later().await;
        let mut state = self.state.lock().unwrap();
        if let Some(device) = state.devices.iter_mut().find(|d| &d.id == id) {
            device.position = position;
        }
        Ok(())
    }

    async fn delete_device(&self, _device_type: &DeviceType, id: &EntityId) -> Result<(), CoreError> {
        self.record(Call::DeleteDevice { id: id.clone() }, "delete device")?;
        let mut state = self.state.lock().unwrap();
        state.devices.retain(|d| &d.id != id);
        for cable in &mut state.cables {
            for endpoint in [&mut cable.start, &mut cable.end] {
                if endpoint.device_id.as_ref() == Some(id) {
                    *endpoint = Endpoint::default();
                }
            }
        }
        Ok(())
    }
}

// ── Fixtures ────────────────────────────────────────────────────────

pub fn device(id: u64, lat: f64, lng: f64, ports: &[u64]) -> Device {
    Device {
        id: EntityId::Numeric(id),
        name: Some(format!("SPL-{id}")),
        device_type: DeviceType::Splitter,
        position: Point::new(lat, lng),
        ports: ports
            .iter()
            .zip(1..)
            .map(|(p, position)| Port {
                id: EntityId::Numeric(*p),
                device_id: EntityId::Numeric(id),
                name: format!("P{position}"),
                position,
                occupied: false,
            })
            .collect(),
    }
}

pub fn endpoint(device: u64, port: u64) -> Endpoint {
    Endpoint {
        device_id: Some(EntityId::Numeric(device)),
        port_id: Some(EntityId::Numeric(port)),
        port_name: None,
    }
}

/// Device 1 at (10,20) with ports 10/11, device 2 at (11,21) with ports
/// 20/21, device 3 at (12,22) with ports 30/31, and cable 100 from port 10
/// to port 20.
pub fn topology() -> FakeGateway {
    let cable = Cable {
        id: CableRef::Persisted(EntityId::Numeric(100)),
        name: "FO-100".into(),
        cable_type: "drop".into(),
        from: Point::new(10.0, 20.0),
        to: Point::new(11.0, 21.0),
        waypoints: Vec::new(),
        start: endpoint(1, 10),
        end: endpoint(2, 20),
    };
    FakeGateway::new(
        vec![
            device(1, 10.0, 20.0, &[10, 11]),
            device(2, 11.0, 21.0, &[20, 21]),
            device(3, 12.0, 22.0, &[30, 31]),
        ],
        vec![cable],
    )
}

pub fn cable_100() -> CableRef {
    CableRef::Persisted(EntityId::Numeric(100))
}
