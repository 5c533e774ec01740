//! Export summary and reporting
//!
//! This module defines structures for tracking and reporting export results.

use super::reconcile::ReconcileReport;
use super::relational::RelationalReport;
use super::ExportTarget;
use crate::domain::HydroError;
use std::time::Duration;

/// Summary of one export call
#[derive(Debug, Clone)]
pub struct ExportSummary {
    pub result_id: String,

    pub target: ExportTarget,

    /// Outcome reported to the caller
    pub success: bool,

    pub dry_run: bool,

    pub duration: Duration,

    /// Set when the relational target ran
    pub relational: Option<RelationalReport>,

    /// Set when the observation-API target ran
    pub reconcile: Option<ReconcileReport>,

    /// Errors encountered during export
    pub errors: Vec<ExportError>,
}

impl ExportSummary {
    /// Create a new, not yet successful summary
    pub fn new(result_id: impl Into<String>, target: ExportTarget) -> Self {
        Self {
            result_id: result_id.into(),
            target,
            success: false,
            dry_run: false,
            duration: Duration::from_secs(0),
            relational: None,
            reconcile: None,
            errors: Vec::new(),
        }
    }

    /// Set the duration
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Add an error
    pub fn add_error(&mut self, error: ExportError) {
        self.errors.push(error);
    }

    /// Log the summary
    pub fn log_summary(&self) {
        if let Some(report) = &self.relational {
            tracing::info!(
                result_id = %self.result_id,
                node_rows = report.node_rows,
                arc_rows = report.arc_rows,
                reversed_arcs = report.reversed_arcs,
                dry_run = self.dry_run,
                "Relational export summary"
            );
        }

        if let Some(report) = &self.reconcile {
            tracing::info!(
                result_id = %self.result_id,
                created = report.created,
                updated = report.updated,
                obsoleted = report.obsoleted,
                skipped = report.skipped,
                batches = report.batches,
                failed_batches = report.failed_batches,
                failed_operations = report.failed_operations,
                dry_run = self.dry_run,
                "Observation export summary"
            );
        }

        for error in &self.errors {
            tracing::warn!(
                error_type = ?error.error_type,
                message = %error.message,
                context = error.context.as_deref().unwrap_or(""),
                "Export error"
            );
        }
    }
}

/// Type of export error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportErrorType {
    /// Missing series, topology, session or client
    Precondition,
    Configuration,
    Units,
    Database,
    Frost,
    Geo,
    /// Batches failed while `fail_on_partial_batch` is set
    PartialBatch,
    Unknown,
}

impl From<&HydroError> for ExportErrorType {
    fn from(error: &HydroError) -> Self {
        match error {
            HydroError::Configuration(_) | HydroError::Validation(_) => Self::Configuration,
            HydroError::Units(_) => Self::Units,
            HydroError::Database(_) => Self::Database,
            HydroError::Frost(_) => Self::Frost,
            HydroError::Geo(_) => Self::Geo,
            HydroError::Connection(_) => Self::Precondition,
            _ => Self::Unknown,
        }
    }
}

/// Export error with context
#[derive(Debug, Clone)]
pub struct ExportError {
    pub error_type: ExportErrorType,

    pub message: String,

    /// Optional context (e.g. the step or batch)
    pub context: Option<String>,
}

impl ExportError {
    /// Create a new export error
    pub fn new(error_type: ExportErrorType, message: String) -> Self {
        Self {
            error_type,
            message,
            context: None,
        }
    }

    /// Add context to the error
    pub fn with_context(mut self, context: String) -> Self {
        self.context = Some(context);
        self
    }
}

impl From<&HydroError> for ExportError {
    fn from(error: &HydroError) -> Self {
        Self::new(ExportErrorType::from(error), error.to_string())
    }
}
