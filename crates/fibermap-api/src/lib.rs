// fibermap-api: Async Rust client for the fiber inventory service

mod cables;
mod client;
mod devices;
pub mod error;
pub mod models;
pub mod transport;

pub use client::InventoryClient;
pub use error::Error;
pub use models::{
    CableBody, CablePathBody, CableRecord, CreateCablePayload, DevicePositionPayload,
    DeviceRecord, DeviceRefRecord, PathRecord, PortRecord, RecordId, TerminationPayload,
    TerminationRecord, UpdateCablePathPayload,
};
pub use transport::{TlsMode, TransportConfig};
