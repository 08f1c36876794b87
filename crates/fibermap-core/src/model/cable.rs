// ── Cable domain types ──

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::entity_id::{CableRef, EntityId};
use super::point::Point;

/// Which end of a cable an operation addresses. `Start` sits at the
/// cable's `from` point, `End` at its `to` point.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CableEnd {
    Start,
    End,
}

impl CableEnd {
    pub const BOTH: [CableEnd; 2] = [CableEnd::Start, CableEnd::End];
}

/// Device/port assignment of one cable end.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Endpoint {
    pub device_id: Option<EntityId>,
    pub port_id: Option<EntityId>,
    pub port_name: Option<String>,
}

impl Endpoint {
    /// Both a device and a port are known.
    pub fn is_complete(&self) -> bool {
        self.device_id.is_some() && self.port_id.is_some()
    }

    /// Attached to a device but still waiting for a port choice.
    pub fn is_pending_port(&self) -> bool {
        self.device_id.is_some() && self.port_id.is_none()
    }

    pub(crate) fn attach_device(&mut self, device_id: EntityId) {
        self.device_id = Some(device_id);
        self.port_id = None;
        self.port_name = None;
    }

    pub(crate) fn detach(&mut self) {
        *self = Self::default();
    }
}

/// Name and type chosen when a cable is drawn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CableMeta {
    pub name: String,
    pub cable_type: String,
}

/// The canonical Cable type, shared by drafts and persisted cables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cable {
    pub id: CableRef,
    pub name: String,
    pub cable_type: String,
    pub from: Point,
    pub to: Point,
    pub waypoints: Vec<Point>,
    pub start: Endpoint,
    pub end: Endpoint,
}

impl Cable {
    pub fn endpoint(&self, end: CableEnd) -> &Endpoint {
        match end {
            CableEnd::Start => &self.start,
            CableEnd::End => &self.end,
        }
    }

    pub(crate) fn endpoint_mut(&mut self, end: CableEnd) -> &mut Endpoint {
        match end {
            CableEnd::Start => &mut self.start,
            CableEnd::End => &mut self.end,
        }
    }

    /// Map position of an end.
    pub fn position(&self, end: CableEnd) -> Point {
        match end {
            CableEnd::Start => self.from,
            CableEnd::End => self.to,
        }
    }

    pub(crate) fn set_position(&mut self, end: CableEnd, pos: Point) {
        match end {
            CableEnd::Start => self.from = pos,
            CableEnd::End => self.to = pos,
        }
    }

    /// Full polyline: `[from, ..waypoints, to]`.
    pub fn path(&self) -> Vec<Point> {
        let mut path = Vec::with_capacity(self.waypoints.len() + 2);
        path.push(self.from);
        path.extend_from_slice(&self.waypoints);
        path.push(self.to);
        path
    }

    /// Both ends have a port; the only state the inventory accepts.
    pub fn has_both_ports(&self) -> bool {
        self.start.is_complete() && self.end.is_complete()
    }

    /// Ports this cable currently holds, with the end holding each.
    pub fn held_ports(&self) -> impl Iterator<Item = (CableEnd, &EntityId)> {
        CableEnd::BOTH
            .into_iter()
            .filter_map(|end| self.endpoint(end).port_id.as_ref().map(|p| (end, p)))
    }

    /// Same geometry and port assignment as `other`, ignoring identity
    /// and metadata.
    pub fn same_shape(&self, other: &Cable) -> bool {
        self.from == other.from
            && self.to == other.to
            && self.waypoints == other.waypoints
            && self.start == other.start
            && self.end == other.end
    }

    /// Each end holds the same port as in `other` (names aside).
    pub fn same_ports(&self, other: &Cable) -> bool {
        CableEnd::BOTH
            .into_iter()
            .all(|end| self.endpoint(end).port_id == other.endpoint(end).port_id)
    }
}
