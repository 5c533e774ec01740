//! SensorThings (FROST) integration

pub mod batch;
pub mod client;
pub mod models;
pub mod traits;

pub use client::FrostClient;
pub use models::{
    BatchMethod, BatchOperation, EntityId, OperationOutcome, RemoteThing, SensorDraft,
    OBSOLETE_PROPERTY,
};
pub use traits::ObservationCatalog;
