// ── Domain model ──
//
// Plain data: devices with their ports, cables with their endpoints, and
// the identifiers tying them together. Behaviour lives in the store.

pub mod cable;
pub mod device;
pub mod entity_id;
pub mod point;

pub use cable::{Cable, CableEnd, CableMeta, Endpoint};
pub use device::{Device, DeviceType, Port};
pub use entity_id::{CableRef, DraftId, EntityId};
pub use point::Point;
