//! Result export pipeline
//!
//! - [`relational`] - report tables in PostgreSQL, one transaction per run
//! - [`things`] and [`reconcile`] - SensorThings Things, datastreams and observations
//! - [`batch`] - concurrent `$batch` submission and per-batch accounting
//! - [`coordinator`] - the [`ExportOrchestrator`] entry point
//! - [`summary`] - what one export did

pub mod batch;
pub mod coordinator;
pub mod reconcile;
pub mod records;
pub mod relational;
pub mod summary;
pub mod things;

pub use batch::{BatchResult, BatchRunner, ChangeKind, PlannedBatch};
pub use coordinator::{ExportOrchestrator, ExportResources};
pub use reconcile::{ReconcileReport, Reconciler};
pub use relational::{RelationalExporter, RelationalReport};
pub use summary::{ExportError, ExportErrorType, ExportSummary};
pub use things::{ThingAssembler, ThingDraft};

use crate::core::units::DEFAULT_ROUND_DECIMALS;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Destination of an export
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportTarget {
    /// PostgreSQL report tables
    Database,
    /// SensorThings (FROST) server
    Frost,
}

impl fmt::Display for ExportTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportTarget::Database => write!(f, "database"),
            ExportTarget::Frost => write!(f, "frost"),
        }
    }
}

impl FromStr for ExportTarget {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "database" | "db" => Ok(ExportTarget::Database),
            "frost" => Ok(ExportTarget::Frost),
            _ => Err(format!(
                "Invalid export target '{s}'. Must be 'database' or 'frost'"
            )),
        }
    }
}

/// Per-call export settings
#[derive(Debug, Clone, PartialEq)]
pub struct ExportOptions {
    /// Decimals kept after unit conversion (relational target)
    pub round_decimals: u32,
    /// Things per `$batch` request
    pub batch_size: usize,
    /// Concurrent `$batch` requests
    pub max_workers: usize,
    /// EPSG code of the network coordinates
    pub crs_from: u32,
    /// EPSG code of published locations
    pub crs_to: u32,
    /// Simulation start; defaults to now plus the network start clock time
    pub start_time: Option<DateTime<Utc>>,
    /// Build and count, write nothing
    pub dry_run: bool,
    /// Report failure when any batch fails
    pub fail_on_partial_batch: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            round_decimals: DEFAULT_ROUND_DECIMALS,
            batch_size: 50,
            max_workers: 4,
            crs_from: 25831,
            crs_to: 4326,
            start_time: None,
            dry_run: false,
            fail_on_partial_batch: false,
        }
    }
}
