//! Export orchestrator - entry point of the export process
//!
//! Checks that a run is loaded, routes it to the relational exporter or the
//! observation-API reconciler, and turns every failure into a logged `false`.
//! Store and catalog handles are passed in explicitly and only borrowed for
//! the duration of one call.

use super::reconcile::{self, Reconciler};
use super::relational::RelationalExporter;
use super::summary::{ExportError, ExportErrorType, ExportSummary};
use super::{ExportOptions, ExportTarget};
use crate::adapters::database::ReportStore;
use crate::adapters::frost::ObservationCatalog;
use crate::core::engine::profile_for;
use crate::domain::{NetworkTopology, Result, ResultId, ResultSeries};
use crate::{log_export_complete, log_export_start};
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

/// Connections available to an export
#[derive(Clone, Default)]
pub struct ExportResources {
    /// Required by the database target
    pub report_store: Option<Arc<dyn ReportStore>>,
    /// Required by the frost target
    pub catalog: Option<Arc<dyn ObservationCatalog>>,
}

impl ExportResources {
    pub fn with_report_store(mut self, store: Arc<dyn ReportStore>) -> Self {
        self.report_store = Some(store);
        self
    }

    pub fn with_catalog(mut self, catalog: Arc<dyn ObservationCatalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }
}

/// Export orchestrator
pub struct ExportOrchestrator {
    resources: ExportResources,
}

impl ExportOrchestrator {
    pub fn new(resources: ExportResources) -> Self {
        Self { resources }
    }

    /// Exports one run and reports whether it succeeded
    ///
    /// Never fails: errors are logged with context and reported as `false`.
    pub async fn export(
        &self,
        result_id: &ResultId,
        target: ExportTarget,
        series: Option<&ResultSeries>,
        topology: Option<&NetworkTopology>,
        options: &ExportOptions,
    ) -> bool {
        self.run(result_id, target, series, topology, options)
            .await
            .success
    }

    /// Like [`export`](Self::export), returning the full summary
    pub async fn run(
        &self,
        result_id: &ResultId,
        target: ExportTarget,
        series: Option<&ResultSeries>,
        topology: Option<&NetworkTopology>,
        options: &ExportOptions,
    ) -> ExportSummary {
        let span = tracing::info_span!(
            "export",
            result_id = %result_id,
            target = %target,
            run_id = %Uuid::new_v4()
        );

        async {
            let start = Instant::now();
            log_export_start!(result_id, target);

            let mut summary = ExportSummary::new(result_id.as_str(), target);
            summary.dry_run = options.dry_run;
            summary.success = self
                .dispatch(&mut summary, result_id, series, topology, options)
                .await;

            let summary = summary.with_duration(start.elapsed());
            summary.log_summary();
            log_export_complete!(result_id, summary.success, summary.duration);
            summary
        }
        .instrument(span)
        .await
    }

    async fn dispatch(
        &self,
        summary: &mut ExportSummary,
        result_id: &ResultId,
        series: Option<&ResultSeries>,
        topology: Option<&NetworkTopology>,
        options: &ExportOptions,
    ) -> bool {
        let Some(series) = series else {
            return precondition_failed(summary, "No result series loaded");
        };
        let Some(topology) = topology else {
            return precondition_failed(summary, "No network topology loaded");
        };

        let outcome = match summary.target {
            ExportTarget::Database => self
                .export_relational(summary, result_id, series, topology, options)
                .await,
            ExportTarget::Frost => self
                .export_observations(summary, result_id, series, topology, options)
                .await,
        };

        match outcome {
            Ok(success) => success,
            Err(e) => {
                tracing::error!(
                    result_id = %result_id,
                    target = %summary.target,
                    error = %e,
                    "Export failed"
                );
                summary.add_error(ExportError::from(&e));
                false
            }
        }
    }

    async fn export_relational(
        &self,
        summary: &mut ExportSummary,
        result_id: &ResultId,
        series: &ResultSeries,
        topology: &NetworkTopology,
        options: &ExportOptions,
    ) -> Result<bool> {
        let profile = profile_for(topology.engine());
        if !profile.supports_relational() {
            return Ok(precondition_failed(
                summary,
                &format!(
                    "{} networks cannot be exported to the report database",
                    profile.network_type()
                ),
            ));
        }

        let exporter = RelationalExporter::new(result_id, series, topology, options.round_decimals);
        if options.dry_run {
            summary.relational = Some(exporter.dry_run()?);
            return Ok(true);
        }

        let Some(store) = self.resources.report_store.as_deref() else {
            return Ok(precondition_failed(summary, "No database connection available"));
        };

        tracing::debug!(store = %store.describe(), "Exporting to report database");
        summary.relational = Some(exporter.export(store).await?);
        Ok(true)
    }

    async fn export_observations(
        &self,
        summary: &mut ExportSummary,
        result_id: &ResultId,
        series: &ResultSeries,
        topology: &NetworkTopology,
        options: &ExportOptions,
    ) -> Result<bool> {
        if options.dry_run {
            summary.reconcile = Some(reconcile::dry_run(series, topology, options)?);
            return Ok(true);
        }

        let Some(catalog) = self.resources.catalog.as_deref() else {
            return Ok(precondition_failed(summary, "No observation API client available"));
        };

        tracing::debug!(catalog = %catalog.describe(), "Exporting to observation API");
        let report = Reconciler::new(catalog, options)
            .reconcile(result_id, series, topology)
            .await?;

        let failed_batches = report.failed_batches;
        summary.reconcile = Some(report);
        if failed_batches == 0 {
            return Ok(true);
        }

        if options.fail_on_partial_batch {
            tracing::error!(failed_batches, "Batches failed, reporting export as failed");
            summary.add_error(ExportError::new(
                ExportErrorType::PartialBatch,
                format!("{failed_batches} batch(es) failed"),
            ));
            Ok(false)
        } else {
            tracing::warn!(failed_batches, "Batches failed, other batches were applied");
            Ok(true)
        }
    }
}

fn precondition_failed(summary: &mut ExportSummary, message: &str) -> bool {
    tracing::error!(result_id = %summary.result_id, "{message}");
    summary.add_error(ExportError::new(
        ExportErrorType::Precondition,
        message.to_string(),
    ));
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EngineKind, Node, NodeKind, VariableTable};

    fn topology(engine: EngineKind) -> NetworkTopology {
        NetworkTopology::builder(engine)
            .flow_units("LPS")
            .node(Node::new("N1", NodeKind::Junction).with_coordinates(430000.0, 4580000.0))
            .build()
            .unwrap()
    }

    fn series() -> ResultSeries {
        let demand = VariableTable::new(vec![0, 3600])
            .with_column("N1", vec![0.1, 0.2])
            .unwrap();
        ResultSeries::new().with_node_variable("demand", demand).unwrap()
    }

    fn result_id() -> ResultId {
        ResultId::new("run_1").unwrap()
    }

    #[tokio::test]
    async fn test_missing_series_fails() {
        let orchestrator = ExportOrchestrator::new(ExportResources::default());
        let topology = topology(EngineKind::Epanet);
        let summary = orchestrator
            .run(
                &result_id(),
                ExportTarget::Database,
                None,
                Some(&topology),
                &ExportOptions::default(),
            )
            .await;

        assert!(!summary.success);
        assert_eq!(summary.errors[0].error_type, ExportErrorType::Precondition);
    }

    #[tokio::test]
    async fn test_missing_topology_fails() {
        let orchestrator = ExportOrchestrator::new(ExportResources::default());
        let series = series();
        assert!(
            !orchestrator
                .export(
                    &result_id(),
                    ExportTarget::Frost,
                    Some(&series),
                    None,
                    &ExportOptions::default(),
                )
                .await
        );
    }

    #[tokio::test]
    async fn test_database_target_without_store_fails() {
        let orchestrator = ExportOrchestrator::new(ExportResources::default());
        let (series, topology) = (series(), topology(EngineKind::Epanet));
        let summary = orchestrator
            .run(
                &result_id(),
                ExportTarget::Database,
                Some(&series),
                Some(&topology),
                &ExportOptions::default(),
            )
            .await;

        assert!(!summary.success);
        assert!(summary.errors[0].message.contains("database"));
    }

    #[tokio::test]
    async fn test_swmm_to_database_is_rejected() {
        let orchestrator = ExportOrchestrator::new(ExportResources::default());
        let (series, topology) = (series(), topology(EngineKind::Swmm));
        let options = ExportOptions {
            dry_run: true,
            ..ExportOptions::default()
        };
        let summary = orchestrator
            .run(
                &result_id(),
                ExportTarget::Database,
                Some(&series),
                Some(&topology),
                &options,
            )
            .await;

        assert!(!summary.success);
        assert!(summary.errors[0].message.contains("SWMM"));
    }

    #[tokio::test]
    async fn test_dry_run_needs_no_connections() {
        let orchestrator = ExportOrchestrator::new(ExportResources::default());
        let (series, topology) = (series(), topology(EngineKind::Epanet));
        let options = ExportOptions {
            dry_run: true,
            ..ExportOptions::default()
        };

        let summary = orchestrator
            .run(
                &result_id(),
                ExportTarget::Database,
                Some(&series),
                Some(&topology),
                &options,
            )
            .await;
        assert!(summary.success);
        assert_eq!(summary.relational.map(|r| r.node_rows), Some(2));

        let summary = orchestrator
            .run(
                &result_id(),
                ExportTarget::Frost,
                Some(&series),
                Some(&topology),
                &options,
            )
            .await;
        assert!(summary.success);
        assert_eq!(summary.reconcile.map(|r| r.created), Some(1));
    }

    #[tokio::test]
    async fn test_unknown_flow_units_fail_relational_dry_run() {
        let orchestrator = ExportOrchestrator::new(ExportResources::default());
        let topology = NetworkTopology::builder(EngineKind::Epanet)
            .flow_units("BARRELS")
            .node(Node::new("N1", NodeKind::Junction))
            .build()
            .unwrap();
        let series = series();
        let options = ExportOptions {
            dry_run: true,
            ..ExportOptions::default()
        };

        let summary = orchestrator
            .run(
                &result_id(),
                ExportTarget::Database,
                Some(&series),
                Some(&topology),
                &options,
            )
            .await;
        assert!(!summary.success);
        assert_eq!(summary.errors[0].error_type, ExportErrorType::Units);
    }
}
