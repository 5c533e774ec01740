//! Integration tests for the relational export
//!
//! A recording report store stands in for PostgreSQL so the step order,
//! transaction handling and row shaping can be checked statement by statement.

use async_trait::async_trait;
use hydrosync::adapters::database::{ReportSession, ReportStore, SqlParam};
use hydrosync::core::export::relational::PURGE_TABLES;
use hydrosync::core::export::{
    ExportErrorType, ExportOptions, ExportOrchestrator, ExportResources, ExportTarget,
    RelationalExporter,
};
use hydrosync::domain::{
    EngineKind, HydroError, Link, LinkKind, NetworkTopology, Node, NodeKind, Result, ResultId,
    ResultSeries, VariableTable,
};
use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
struct Journal {
    statements: Vec<(String, usize)>,
    committed: bool,
    rolled_back: bool,
}

impl Journal {
    fn position(&self, prefix: &str) -> Option<usize> {
        self.statements.iter().position(|(sql, _)| sql.starts_with(prefix))
    }
}

#[derive(Default)]
struct RecordingStore {
    journal: Arc<Mutex<Journal>>,
    /// Statements starting with this prefix fail
    fail_on: Option<&'static str>,
    /// Rows reported by the geometry reversal statement
    reversed: u64,
}

struct RecordingSession {
    journal: Arc<Mutex<Journal>>,
    fail_on: Option<&'static str>,
    reversed: u64,
}

#[async_trait]
impl ReportStore for RecordingStore {
    async fn test_connection(&self) -> Result<()> {
        Ok(())
    }

    async fn begin(&self) -> Result<Box<dyn ReportSession>> {
        Ok(Box::new(RecordingSession {
            journal: Arc::clone(&self.journal),
            fail_on: self.fail_on,
            reversed: self.reversed,
        }))
    }

    fn describe(&self) -> String {
        "recording store".to_string()
    }
}

#[async_trait]
impl ReportSession for RecordingSession {
    async fn execute(&mut self, sql: &str, params: &[SqlParam<'_>]) -> Result<u64> {
        self.journal
            .lock()
            .unwrap()
            .statements
            .push((sql.to_string(), params.len()));

        if self.fail_on.is_some_and(|prefix| sql.starts_with(prefix)) {
            return Err(HydroError::Database("relation does not exist".to_string()));
        }
        if sql.starts_with("UPDATE rpt_inp_arc") {
            return Ok(self.reversed);
        }
        Ok(1)
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.journal.lock().unwrap().committed = true;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        self.journal.lock().unwrap().rolled_back = true;
        Ok(())
    }
}

fn result_id() -> ResultId {
    ResultId::new("run_gpm").unwrap()
}

/// One junction and one pipe in a GPM model
fn topology() -> NetworkTopology {
    NetworkTopology::builder(EngineKind::Epanet)
        .flow_units("GPM")
        .node(Node::new("N1", NodeKind::Junction).with_elevation(30.48))
        .node(Node::new("R1", NodeKind::Reservoir))
        .link(
            Link::new("P1", LinkKind::Pipe, "R1", "N1")
                .with_length(304.8)
                .with_diameter(0.3048),
        )
        .build()
        .unwrap()
}

fn series() -> ResultSeries {
    let steps = vec![0, 3600, 7200];
    let demand = VariableTable::new(steps.clone())
        .with_column("N1", vec![0.1, 0.2, 0.15])
        .unwrap();
    let flow = VariableTable::new(steps)
        .with_column("P1", vec![-0.01, 0.02, -0.03])
        .unwrap();
    ResultSeries::new()
        .with_node_variable("demand", demand)
        .unwrap()
        .with_link_variable("flowrate", flow)
        .unwrap()
}

#[tokio::test]
async fn test_export_commits_after_every_step() {
    let store = RecordingStore {
        reversed: 1,
        ..RecordingStore::default()
    };
    let (id, series, topology) = (result_id(), series(), topology());

    let report = RelationalExporter::new(&id, &series, &topology, 2)
        .export(&store)
        .await
        .unwrap();

    assert_eq!(report.node_rows, 3);
    assert_eq!(report.arc_rows, 3);
    assert_eq!(report.reversed_arcs, 1);

    let journal = store.journal.lock().unwrap();
    assert!(journal.committed);
    assert!(!journal.rolled_back);

    // Purge runs first, for every report table, bound to the run id
    for (i, table) in PURGE_TABLES.iter().enumerate() {
        let (sql, params) = &journal.statements[i];
        assert_eq!(sql, &format!("DELETE FROM {table} WHERE result_id = $1::text"));
        assert_eq!(*params, 1);
    }

    let order = [
        "INSERT INTO rpt_node ",
        "INSERT INTO rpt_arc ",
        "UPDATE rpt_inp_arc SET the_geom = ST_Reverse",
        "UPDATE rpt_arc SET flow = ABS(flow)",
        "INSERT INTO rpt_node_stats",
        "INSERT INTO rpt_arc_stats",
        "UPDATE rpt_cat_result",
        "DELETE FROM selector_rpt_main",
        "INSERT INTO selector_rpt_main",
    ];
    let positions: Vec<usize> = order
        .iter()
        .map(|prefix| journal.position(prefix).unwrap())
        .collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]), "{positions:?}");
    assert!(positions[0] >= PURGE_TABLES.len());

    // Three rows of eight node columns, three rows of twelve arc columns
    assert_eq!(journal.statements[positions[0]].1, 24);
    assert_eq!(journal.statements[positions[1]].1, 36);

    // Missing time labels are normalised last
    let last = &journal.statements.last().unwrap().0;
    assert!(last.starts_with("UPDATE rpt_arc SET time = '0:00:00'"));
}

#[tokio::test]
async fn test_failing_step_rolls_back() {
    let store = RecordingStore {
        fail_on: Some("INSERT INTO rpt_arc_stats"),
        ..RecordingStore::default()
    };
    let (id, series, topology) = (result_id(), series(), topology());

    let err = RelationalExporter::new(&id, &series, &topology, 2)
        .export(&store)
        .await
        .unwrap_err();

    assert!(matches!(err, HydroError::Database(ref m) if m.contains("arc_stats")));

    let journal = store.journal.lock().unwrap();
    assert!(journal.rolled_back);
    assert!(!journal.committed);
    assert!(journal.position("UPDATE rpt_cat_result").is_none());
}

#[tokio::test]
async fn test_unknown_flow_units_never_open_a_session() {
    let store = RecordingStore::default();
    let topology = NetworkTopology::builder(EngineKind::Epanet)
        .flow_units("FURLONGS")
        .node(Node::new("N1", NodeKind::Junction))
        .build()
        .unwrap();
    let (id, series) = (result_id(), series());

    let err = RelationalExporter::new(&id, &series, &topology, 2)
        .export(&store)
        .await
        .unwrap_err();

    assert!(matches!(err, HydroError::Units(_)));
    let journal = store.journal.lock().unwrap();
    assert!(journal.statements.is_empty());
    assert!(!journal.committed && !journal.rolled_back);
}

#[test]
fn test_dry_run_counts_rows_and_reversals() {
    let (id, series, topology) = (result_id(), series(), topology());

    let report = RelationalExporter::new(&id, &series, &topology, 2)
        .dry_run()
        .unwrap();

    assert_eq!(report.node_rows, 3);
    assert_eq!(report.arc_rows, 3);
    assert_eq!(report.reversed_arcs, 1);
}

#[tokio::test]
async fn test_orchestrator_reports_database_failure() {
    let store = Arc::new(RecordingStore {
        fail_on: Some("DELETE FROM rpt_node "),
        ..RecordingStore::default()
    });
    let journal = Arc::clone(&store.journal);
    let orchestrator =
        ExportOrchestrator::new(ExportResources::default().with_report_store(store));
    let (id, series, topology) = (result_id(), series(), topology());

    let summary = orchestrator
        .run(
            &id,
            ExportTarget::Database,
            Some(&series),
            Some(&topology),
            &ExportOptions::default(),
        )
        .await;

    assert!(!summary.success);
    assert_eq!(summary.errors[0].error_type, ExportErrorType::Database);
    assert!(journal.lock().unwrap().rolled_back);
    assert_eq!(journal.lock().unwrap().statements.len(), 1);
}

#[tokio::test]
async fn test_orchestrator_database_export_succeeds() {
    let store = Arc::new(RecordingStore::default());
    let journal = Arc::clone(&store.journal);
    let orchestrator =
        ExportOrchestrator::new(ExportResources::default().with_report_store(store));
    let (id, series, topology) = (result_id(), series(), topology());

    let ok = orchestrator
        .export(
            &id,
            ExportTarget::Database,
            Some(&series),
            Some(&topology),
            &ExportOptions::default(),
        )
        .await;

    assert!(ok);
    assert!(journal.lock().unwrap().committed);
}
