//! Observation catalog abstraction
//!
//! The reconciler talks to the remote SensorThings server only through
//! [`ObservationCatalog`], so its batching and obsolescence behaviour can be
//! exercised against an in-memory catalog.

use super::models::{BatchOperation, EntityId, OperationOutcome, RemoteThing, SensorDraft};
use crate::core::engine::VariableSpec;
use crate::domain::Result;
use async_trait::async_trait;
use std::collections::HashMap;

#[async_trait]
pub trait ObservationCatalog: Send + Sync {
    /// Checks that the service root answers
    async fn test_connection(&self) -> Result<()>;

    /// All Things with their first location, keyed by name
    async fn fetch_things(&self) -> Result<HashMap<String, RemoteThing>>;

    /// All ObservedProperty ids, keyed by name
    async fn fetch_observed_properties(&self) -> Result<HashMap<String, EntityId>>;

    async fn create_observed_property(&self, variable: &VariableSpec) -> Result<EntityId>;

    async fn create_sensor(&self, sensor: &SensorDraft) -> Result<EntityId>;

    /// Submits operations as one batch request
    ///
    /// An `Err` means the whole request failed; per-operation failures are
    /// reported through the outcomes instead.
    async fn submit_batch(&self, operations: Vec<BatchOperation>) -> Result<Vec<OperationOutcome>>;

    /// Human-readable server description
    fn describe(&self) -> String;
}
