// ── Core identity types ──
//
// EntityId is the canonical server identifier; DraftId and CableRef cover
// the client-side lifetime of a cable before the inventory acknowledges it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use fibermap_api::RecordId;

// ── EntityId ────────────────────────────────────────────────────────

/// Canonical identifier for any inventory entity.
///
/// Transparently wraps a numeric primary key, a UUID, or an opaque
/// string. Consumers never care which.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityId {
    Numeric(u64),
    Uuid(Uuid),
    Text(String),
}

impl EntityId {
    pub fn as_numeric(&self) -> Option<u64> {
        match self {
            Self::Numeric(n) => Some(*n),
            _ => None,
        }
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(n) => write!(f, "{n}"),
            Self::Uuid(u) => write!(f, "{u}"),
            Self::Text(s) => write!(f, "{s}"),
        }
    }
}

impl FromStr for EntityId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s.to_owned()))
    }
}

impl From<u64> for EntityId {
    fn from(n: u64) -> Self {
        Self::Numeric(n)
    }
}

impl From<Uuid> for EntityId {
    fn from(u: Uuid) -> Self {
        Self::Uuid(u)
    }
}

impl From<String> for EntityId {
    fn from(s: String) -> Self {
        if let Ok(n) = s.parse::<u64>() {
            return Self::Numeric(n);
        }
        match Uuid::parse_str(&s) {
            Ok(u) => Self::Uuid(u),
            Err(_) => Self::Text(s),
        }
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        Self::from(s.to_owned())
    }
}

impl From<RecordId> for EntityId {
    fn from(id: RecordId) -> Self {
        match id {
            RecordId::Number(n) => Self::Numeric(n),
            RecordId::Text(s) => Self::from(s),
        }
    }
}

impl From<&EntityId> for RecordId {
    fn from(id: &EntityId) -> Self {
        match id {
            EntityId::Numeric(n) => RecordId::Number(*n),
            other => RecordId::Text(other.to_string()),
        }
    }
}

// ── DraftId ─────────────────────────────────────────────────────────

/// Temporary client-generated identifier of a cable that the inventory
/// has not acknowledged yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DraftId(Uuid);

impl DraftId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for DraftId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DraftId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "draft-{}", self.0)
    }
}

// ── CableRef ────────────────────────────────────────────────────────

/// Addresses a cable in either population.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum CableRef {
    Draft(DraftId),
    Persisted(EntityId),
}

impl CableRef {
    pub fn is_draft(&self) -> bool {
        matches!(self, Self::Draft(_))
    }

    pub fn as_persisted(&self) -> Option<&EntityId> {
        match self {
            Self::Persisted(id) => Some(id),
            Self::Draft(_) => None,
        }
    }
}

impl fmt::Display for CableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Draft(id) => write!(f, "{id}"),
            Self::Persisted(id) => write!(f, "{id}"),
        }
    }
}

impl From<DraftId> for CableRef {
    fn from(id: DraftId) -> Self {
        Self::Draft(id)
    }
}

impl From<EntityId> for CableRef {
    fn from(id: EntityId) -> Self {
        Self::Persisted(id)
    }
}
