// ── Device domain types ──

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use strum::EnumString;

use super::entity_id::EntityId;
use super::point::Point;

/// Canonical device category.
///
/// The inventory exposes each category under its own resource path;
/// [`resource_path`](Self::resource_path) is that routing table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, EnumString)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
#[non_exhaustive]
pub enum DeviceType {
    Olt,
    #[strum(serialize = "onu", serialize = "ont")]
    Onu,
    Splitter,
    #[strum(serialize = "splice_closure", serialize = "closure")]
    SpliceClosure,
    #[strum(serialize = "distribution_box", serialize = "cabinet")]
    DistributionBox,
    /// A category this build has no route for.
    #[strum(default)]
    Other(String),
}

impl DeviceType {
    /// Resource path segment the inventory serves this category under.
    pub fn resource_path(&self) -> Option<&'static str> {
        match self {
            Self::Olt => Some("olts"),
            Self::Onu => Some("onus"),
            Self::Splitter => Some("splitters"),
            Self::SpliceClosure => Some("splice-closures"),
            Self::DistributionBox => Some("distribution-boxes"),
            Self::Other(_) => None,
        }
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Olt => "olt",
            Self::Onu => "onu",
            Self::Splitter => "splitter",
            Self::SpliceClosure => "splice_closure",
            Self::DistributionBox => "distribution_box",
            Self::Other(raw) => raw.as_str(),
        };
        f.write_str(name)
    }
}

impl Serialize for DeviceType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DeviceType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DeviceType::from_str(&raw).map_err(serde::de::Error::custom)
    }
}

/// A port on a device. Referenced (never owned) by at most one cable end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Port {
    pub id: EntityId,
    pub device_id: EntityId,
    pub name: String,
    /// Ordinal on the device faceplate.
    pub position: u32,
    /// Derived by the port allocator; never authoritative.
    #[serde(default)]
    pub occupied: bool,
}

/// The canonical Device type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub id: EntityId,
    pub name: Option<String>,
    pub device_type: DeviceType,
    pub position: Point,
    pub ports: Vec<Port>,
}

impl Device {
    pub fn port(&self, port_id: &EntityId) -> Option<&Port> {
        self.ports.iter().find(|p| &p.id == port_id)
    }

    /// Display label: name when known, else the id.
    pub fn label(&self) -> String {
        self.name.clone().unwrap_or_else(|| self.id.to_string())
    }
}
