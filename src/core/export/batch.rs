//! Concurrent `$batch` submission
//!
//! Things are grouped into [`PlannedBatch`]es of a fixed size. Batches are
//! independent: they are submitted with bounded concurrency and a failure in
//! one is recorded in its [`BatchResult`] without affecting the others.

use crate::adapters::frost::{BatchOperation, ObservationCatalog, OperationOutcome};
use crate::log_batch_processing;
use futures::stream::{self, StreamExt};
use std::collections::HashMap;

/// What a group of operations does to one Thing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Updated,
    Obsoleted,
}

#[derive(Debug, Clone)]
struct PlannedChange {
    name: String,
    kind: ChangeKind,
    operation_ids: Vec<String>,
}

/// Operations for a group of Things, sent as one request
#[derive(Debug, Clone, Default)]
pub struct PlannedBatch {
    index: usize,
    operations: Vec<BatchOperation>,
    changes: Vec<PlannedChange>,
}

impl PlannedBatch {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            ..Self::default()
        }
    }

    /// Adds the operations changing one Thing
    ///
    /// Operation ids are (re)assigned here so they are unique within the batch.
    pub fn push(&mut self, name: &str, kind: ChangeKind, operations: Vec<BatchOperation>) {
        let mut operation_ids = Vec::with_capacity(operations.len());
        for mut op in operations {
            op.id = (self.operations.len() + 1).to_string();
            operation_ids.push(op.id.clone());
            self.operations.push(op);
        }
        self.changes.push(PlannedChange {
            name: name.to_string(),
            kind,
            operation_ids,
        });
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn operations(&self) -> &[BatchOperation] {
        &self.operations
    }

    /// Number of Things in the batch
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

/// Result of processing one or more batches
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchResult {
    pub created: usize,
    pub updated: usize,
    pub obsoleted: usize,
    /// Things with at least one failed operation
    pub failed_things: usize,
    pub failed_operations: usize,
    /// Batches with any failure, including a failed request
    pub failed_batches: usize,
    pub batches: usize,
    pub errors: Vec<String>,
}

impl BatchResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_success(&mut self, kind: ChangeKind) {
        match kind {
            ChangeKind::Created => self.created += 1,
            ChangeKind::Updated => self.updated += 1,
            ChangeKind::Obsoleted => self.obsoleted += 1,
        }
    }

    pub fn add_failure(&mut self, failed_operations: usize, error: String) {
        self.failed_things += 1;
        self.failed_operations += failed_operations;
        self.errors.push(error);
    }

    /// Accounts a batch from the server's per-operation answers
    pub fn from_outcomes(batch: &PlannedBatch, outcomes: &[OperationOutcome]) -> Self {
        let by_id: HashMap<&str, &OperationOutcome> =
            outcomes.iter().map(|o| (o.id.as_str(), o)).collect();
        let mut result = Self {
            batches: 1,
            ..Self::default()
        };

        for change in &batch.changes {
            let failed: Vec<String> = change
                .operation_ids
                .iter()
                .filter_map(|id| match by_id.get(id.as_str()) {
                    Some(outcome) if outcome.is_success() => None,
                    Some(outcome) => Some(format!("{id}:{}", outcome.status)),
                    None => Some(format!("{id}:unanswered")),
                })
                .collect();

            if failed.is_empty() {
                result.add_success(change.kind);
            } else {
                result.add_failure(
                    failed.len(),
                    format!(
                        "Thing '{}' ({:?}) failed operations [{}]",
                        change.name,
                        change.kind,
                        failed.join(", ")
                    ),
                );
            }
        }

        if result.failed_things > 0 {
            result.failed_batches = 1;
        }
        result
    }

    /// Accounts a batch whose request failed as a whole
    pub fn request_failed(batch: &PlannedBatch, error: String) -> Self {
        Self {
            failed_things: batch.changes.len(),
            failed_operations: batch.operations.len(),
            failed_batches: 1,
            batches: 1,
            errors: vec![format!("Batch {} failed: {error}", batch.index + 1)],
            ..Self::default()
        }
    }

    /// Merge another batch result into this one
    pub fn merge(&mut self, other: BatchResult) {
        self.created += other.created;
        self.updated += other.updated;
        self.obsoleted += other.obsoleted;
        self.failed_things += other.failed_things;
        self.failed_operations += other.failed_operations;
        self.failed_batches += other.failed_batches;
        self.batches += other.batches;
        self.errors.extend(other.errors);
    }
}

/// Submits planned batches against a catalog with bounded concurrency
pub struct BatchRunner<'a> {
    catalog: &'a dyn ObservationCatalog,
    max_workers: usize,
}

impl<'a> BatchRunner<'a> {
    pub fn new(catalog: &'a dyn ObservationCatalog, max_workers: usize) -> Self {
        Self {
            catalog,
            max_workers: max_workers.max(1),
        }
    }

    /// Runs every batch; never fails as a whole
    pub async fn run(&self, batches: Vec<PlannedBatch>) -> BatchResult {
        let total = batches.len();
        if total == 0 {
            return BatchResult::new();
        }

        let results: Vec<BatchResult> = stream::iter(batches)
            .map(|batch| self.run_one(batch, total))
            .buffer_unordered(self.max_workers)
            .collect()
            .await;

        results.into_iter().fold(BatchResult::new(), |mut acc, r| {
            acc.merge(r);
            acc
        })
    }

    async fn run_one(&self, batch: PlannedBatch, total: usize) -> BatchResult {
        log_batch_processing!(batch.index + 1, total);

        match self.catalog.submit_batch(batch.operations.clone()).await {
            Ok(outcomes) => {
                let result = BatchResult::from_outcomes(&batch, &outcomes);
                for error in &result.errors {
                    tracing::warn!(batch = batch.index + 1, error = %error, "Batch operation failed");
                }
                result
            }
            Err(e) => {
                tracing::error!(
                    batch = batch.index + 1,
                    things = batch.len(),
                    error = %e,
                    "Batch request failed"
                );
                BatchResult::request_failed(&batch, e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn batch() -> PlannedBatch {
        let mut batch = PlannedBatch::new(0);
        batch.push(
            "J1",
            ChangeKind::Created,
            vec![BatchOperation::post("", "Things", json!({"name": "J1"}))],
        );
        batch.push(
            "J2",
            ChangeKind::Updated,
            vec![
                BatchOperation::patch("", "Things(2)", json!({})),
                BatchOperation::post("", "Datastreams", json!({})),
            ],
        );
        batch
    }

    fn outcome(id: &str, status: u16) -> OperationOutcome {
        OperationOutcome {
            id: id.to_string(),
            status,
            body: None,
        }
    }

    #[test]
    fn test_push_assigns_unique_ids() {
        let batch = batch();
        let ids: Vec<&str> = batch.operations().iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
        assert_eq!(batch.len(), 2);
    }

    #[test]
    fn test_from_outcomes_all_successful() {
        let outcomes = vec![outcome("1", 201), outcome("2", 200), outcome("3", 201)];
        let result = BatchResult::from_outcomes(&batch(), &outcomes);
        assert_eq!(result.created, 1);
        assert_eq!(result.updated, 1);
        assert_eq!(result.failed_batches, 0);
        assert!(result.errors.is_empty());
    }

    #[test]
    fn test_from_outcomes_partial_failure() {
        let outcomes = vec![outcome("1", 201), outcome("2", 200), outcome("3", 400)];
        let result = BatchResult::from_outcomes(&batch(), &outcomes);
        assert_eq!(result.created, 1);
        assert_eq!(result.updated, 0);
        assert_eq!(result.failed_things, 1);
        assert_eq!(result.failed_operations, 1);
        assert_eq!(result.failed_batches, 1);
        assert!(result.errors[0].contains("J2"));
    }

    #[test]
    fn test_request_failed_counts_everything() {
        let result = BatchResult::request_failed(&batch(), "HTTP 503".to_string());
        assert_eq!(result.failed_things, 2);
        assert_eq!(result.failed_operations, 3);
        assert_eq!(result.failed_batches, 1);
    }

    #[test]
    fn test_merge() {
        let mut total = BatchResult::new();
        total.merge(BatchResult::from_outcomes(
            &batch(),
            &[outcome("1", 201), outcome("2", 200), outcome("3", 201)],
        ));
        total.merge(BatchResult::request_failed(&batch(), "boom".to_string()));
        assert_eq!(total.batches, 2);
        assert_eq!(total.created, 1);
        assert_eq!(total.failed_batches, 1);
    }
}
