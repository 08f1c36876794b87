//! Editing session for a fiber-optic network topology.
//!
//! The crate keeps a live, locally editable copy of the topology held by
//! an inventory service and pushes edits back in debounced batches:
//!
//! - **[`Session`]**: Lifecycle handle. [`open()`](Session::open) loads
//!   devices and cables through a [`PersistenceGateway`] and spawns the
//!   reconciliation worker; every successful mutation restarts its
//!   debounce window. [`flush()`](Session::flush) pushes immediately.
//!
//! - **[`SessionStore`]**: The synchronous editing core: draft cables,
//!   the overlay of local edits on persisted cables, pending device
//!   moves, the [`PortAllocator`] and snapshot-based undo/redo.
//!
//! - **[`geometry`]**: Point/segment distance, nearest waypoint
//!   insertion and device snapping.
//!
//! - **Domain model** ([`model`]): `Device`, `Port`, `Cable` and the
//!   identifiers linking them. [`CableRef`] distinguishes local drafts
//!   from server-issued ids.

pub mod config;
mod convert;
pub mod error;
pub mod event;
pub mod gateway;
pub mod geometry;
pub mod history;
pub mod model;
pub mod ports;
pub mod reconcile;
pub mod session;
pub mod store;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{GatewayConfig, SessionConfig, TlsVerification};
pub use error::CoreError;
pub use event::{SessionEvent, SyncStatus};
pub use gateway::PersistenceGateway;
pub use history::EditHistory;
pub use ports::{PortAllocator, PortClaim};
pub use reconcile::plan::{PassSummary, ReconcilePlan};
pub use session::Session;
pub use store::{
    Deletion, EndpointOutcome, OverlayEntry, PendingSelection, Restoration, SessionStore, Snapshot,
};

pub use model::{
    Cable, CableEnd, CableMeta, CableRef, Device, DeviceType, DraftId, Endpoint, EntityId, Point,
    Port,
};
