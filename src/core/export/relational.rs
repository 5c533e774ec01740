//! Relational exporter
//!
//! Writes one run into the report tables inside a single transaction:
//! purge, node rows, arc rows, flow post-processing, node and arc statistics,
//! then run metadata. Any failing step rolls the whole transaction back.

use super::records::{build_arc_records, build_node_records, ArcRecord, NodeRecord};
use crate::adapters::database::{ReportSession, ReportStore, SqlParam};
use crate::core::units::UnitSystem;
use crate::domain::{HydroError, NetworkTopology, Result, ResultId, ResultSeries};
use crate::log_step_failure;
use std::collections::HashSet;
use std::future::Future;

/// Maximum rows per multi-row `INSERT`
pub const INSERT_CHUNK_ROWS: usize = 1000;

/// Tables purged for the run before anything is written
pub const PURGE_TABLES: [&str; 6] = [
    "rpt_node",
    "rpt_arc",
    "rpt_node_stats",
    "rpt_arc_stats",
    "rpt_energy_usage",
    "rpt_hydraulic_status",
];

const NODE_COLUMNS: [(&str, &str); 8] = [
    ("result_id", "text"),
    ("node_id", "text"),
    ("time", "text"),
    ("top_elev", "float8"),
    ("demand", "float8"),
    ("head", "float8"),
    ("press", "float8"),
    ("quality", "float8"),
];

const ARC_COLUMNS: [(&str, &str); 12] = [
    ("result_id", "text"),
    ("arc_id", "text"),
    ("time", "text"),
    ("length", "float8"),
    ("diameter", "float8"),
    ("flow", "float8"),
    ("vel", "float8"),
    ("headloss", "float8"),
    ("setting", "float8"),
    ("reaction", "float8"),
    ("ffactor", "float8"),
    ("status", "text"),
];

const REVERSE_NEGATIVE_FLOW_GEOMETRY: &str = "\
UPDATE rpt_inp_arc SET the_geom = ST_Reverse(the_geom) \
FROM rpt_arc \
WHERE rpt_arc.arc_id::text = rpt_inp_arc.arc_id::text \
AND rpt_arc.flow < 0 \
AND rpt_arc.result_id = $1::text \
AND rpt_inp_arc.result_id = $1::text";

const ABSOLUTE_FLOW: &str =
    "UPDATE rpt_arc SET flow = ABS(flow) WHERE flow < 0 AND result_id = $1::text";

const NODE_STATS: &str = "\
INSERT INTO rpt_node_stats (\
node_id, result_id, node_type, sector_id, nodecat_id, top_elev, \
demand_max, demand_min, demand_avg, \
head_max, head_min, head_avg, \
press_max, press_min, press_avg, \
quality_max, quality_min, quality_avg, \
the_geom) \
SELECT node.node_id, $1::text, node.node_type, node.sector_id, node.nodecat_id, \
MAX(rpt.top_elev), \
MAX(rpt.demand), MIN(rpt.demand), AVG(rpt.demand)::numeric(12,2), \
MAX(rpt.head), MIN(rpt.head), AVG(rpt.head)::numeric(12,2), \
MAX(rpt.press), MIN(rpt.press), AVG(rpt.press)::numeric(12,2), \
MAX(rpt.quality), MIN(rpt.quality), AVG(rpt.quality)::numeric(12,2), \
node.the_geom \
FROM rpt_inp_node node \
JOIN rpt_node rpt ON rpt.node_id::text = node.node_id::text \
WHERE node.result_id = $1::text AND rpt.result_id = $1::text \
GROUP BY node.node_id, node.node_type, node.sector_id, node.nodecat_id, node.the_geom \
ORDER BY node.node_id";

const ARC_STATS: &str = "\
INSERT INTO rpt_arc_stats (\
arc_id, result_id, arc_type, sector_id, arccat_id, \
flow_max, flow_min, flow_avg, \
vel_max, vel_min, vel_avg, \
headloss_max, headloss_min, \
setting_max, setting_min, \
reaction_max, reaction_min, \
ffactor_max, ffactor_min, \
length, tot_headloss_max, tot_headloss_min, \
the_geom) \
SELECT arc.arc_id, $1::text, arc.arc_type, arc.sector_id, arc.arccat_id, \
MAX(rpt.flow), MIN(rpt.flow), AVG(rpt.flow)::numeric(12,2), \
MAX(rpt.vel), MIN(rpt.vel), AVG(rpt.vel)::numeric(12,2), \
MAX(rpt.headloss), MIN(rpt.headloss), \
MAX(rpt.setting), MIN(rpt.setting), \
MAX(rpt.reaction), MIN(rpt.reaction), \
MAX(rpt.ffactor), MIN(rpt.ffactor), \
arc.length, \
(MAX(rpt.headloss) * arc.length / 1000)::numeric(12,2), \
(MIN(rpt.headloss) * arc.length / 1000)::numeric(12,2), \
arc.the_geom \
FROM rpt_inp_arc arc \
JOIN rpt_arc rpt ON rpt.arc_id::text = arc.arc_id::text \
WHERE arc.result_id = $1::text AND rpt.result_id = $1::text \
GROUP BY arc.arc_id, arc.arc_type, arc.sector_id, arc.arccat_id, arc.length, arc.the_geom \
ORDER BY arc.arc_id";

const UPDATE_RUN_METADATA: &str = "\
UPDATE rpt_cat_result \
SET exec_date = now(), cur_user = current_user, status = 2, \
expl_id = (SELECT array_agg(expl_id) FROM selector_expl WHERE cur_user = current_user AND expl_id > 0), \
sector_id = (SELECT array_agg(sector_id) FROM selector_sector WHERE cur_user = current_user AND sector_id > 0) \
WHERE result_id = $1::text";

const CLEAR_SELECTOR: &str = "DELETE FROM selector_rpt_main WHERE cur_user = current_user";

const SET_SELECTOR: &str =
    "INSERT INTO selector_rpt_main (result_id, cur_user) VALUES ($1::text, current_user)";

/// Label written over missing or sentinel time labels
pub const ZERO_TIME_LABEL: &str = "0:00:00";

/// What one relational export wrote
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelationalReport {
    pub node_rows: usize,
    pub arc_rows: usize,
    /// Arcs whose geometry was reversed because of negative flow
    pub reversed_arcs: u64,
}

/// Exports one run into the report tables
pub struct RelationalExporter<'a> {
    result_id: &'a ResultId,
    series: &'a ResultSeries,
    topology: &'a NetworkTopology,
    round_decimals: u32,
}

impl<'a> RelationalExporter<'a> {
    pub fn new(
        result_id: &'a ResultId,
        series: &'a ResultSeries,
        topology: &'a NetworkTopology,
        round_decimals: u32,
    ) -> Self {
        Self {
            result_id,
            series,
            topology,
            round_decimals,
        }
    }

    /// Resolves the display unit system declared by the topology
    ///
    /// # Errors
    ///
    /// Returns [`HydroError::Units`] when the flow units are not recognised.
    pub fn unit_system(&self) -> Result<UnitSystem> {
        let system = self.topology.flow_units().parse::<UnitSystem>()?;
        Ok(system)
    }

    /// Builds every node and arc row in memory
    pub fn build_records(&self) -> Result<(Vec<NodeRecord>, Vec<ArcRecord>)> {
        let system = self.unit_system().inspect_err(|e| {
            tracing::error!(
                result_id = %self.result_id,
                flow_units = %self.topology.flow_units(),
                error = %e,
                "Error getting unit system"
            );
        })?;

        let nodes = build_node_records(
            self.result_id,
            self.series,
            self.topology,
            system,
            self.round_decimals,
        );
        let arcs = build_arc_records(
            self.result_id,
            self.series,
            self.topology,
            system,
            self.round_decimals,
        );
        Ok((nodes, arcs))
    }

    /// Counts what an export would write without opening a session
    pub fn dry_run(&self) -> Result<RelationalReport> {
        let (nodes, arcs) = self.build_records()?;
        let reversed: HashSet<&str> = arcs
            .iter()
            .filter(|a| a.flow.is_some_and(|f| f < 0.0))
            .map(|a| a.arc_id.as_str())
            .collect();

        tracing::info!(
            result_id = %self.result_id,
            node_rows = nodes.len(),
            arc_rows = arcs.len(),
            "Dry run: no rows written"
        );

        Ok(RelationalReport {
            node_rows: nodes.len(),
            arc_rows: arcs.len(),
            reversed_arcs: reversed.len() as u64,
        })
    }

    /// Runs every step in one transaction and commits
    ///
    /// # Errors
    ///
    /// Returns the first failing step's error after rolling back.
    pub async fn export(&self, store: &dyn ReportStore) -> Result<RelationalReport> {
        let (nodes, arcs) = self.build_records()?;

        let mut session = store.begin().await?;
        match self.run_steps(session.as_mut(), &nodes, &arcs).await {
            Ok(report) => {
                session.commit().await.inspect_err(|e| {
                    log_step_failure!("commit", self.result_id, e);
                })?;
                Ok(report)
            }
            Err(e) => {
                if let Err(rollback_err) = session.rollback().await {
                    tracing::warn!(
                        result_id = %self.result_id,
                        error = %rollback_err,
                        "Rollback failed"
                    );
                }
                Err(e)
            }
        }
    }

    async fn run_steps(
        &self,
        session: &mut dyn ReportSession,
        nodes: &[NodeRecord],
        arcs: &[ArcRecord],
    ) -> Result<RelationalReport> {
        let id = self.result_id.as_str();

        self.step("purge", purge(session, id)).await?;

        let node_rows = self.step("insert_nodes", insert_nodes(session, nodes)).await?;
        let arc_rows = self.step("insert_arcs", insert_arcs(session, arcs)).await?;

        let reversed_arcs = self.step("post_process", post_process(session, id)).await?;

        self.step("node_stats", session.execute(NODE_STATS, &[&id]))
            .await?;
        self.step("arc_stats", session.execute(ARC_STATS, &[&id]))
            .await?;

        self.step("finalize", finalize(session, id)).await?;

        tracing::info!(
            result_id = %self.result_id,
            node_rows,
            arc_rows,
            reversed_arcs,
            "Relational export steps completed"
        );

        Ok(RelationalReport {
            node_rows,
            arc_rows,
            reversed_arcs,
        })
    }

    async fn step<T>(&self, name: &'static str, fut: impl Future<Output = Result<T>>) -> Result<T> {
        fut.await.map_err(|e| {
            log_step_failure!(name, self.result_id, e);
            HydroError::Database(format!("Step '{name}' failed: {e}"))
        })
    }
}

async fn purge(session: &mut dyn ReportSession, id: &str) -> Result<()> {
    for table in PURGE_TABLES {
        let sql = format!("DELETE FROM {table} WHERE result_id = $1::text");
        let deleted = session.execute(&sql, &[&id]).await?;
        tracing::debug!(table, deleted, "Purged previous rows");
    }
    Ok(())
}

/// Multi-row `INSERT` with typed placeholders for `rows` rows
pub fn insert_statement(table: &str, columns: &[(&str, &str)], rows: usize) -> String {
    let names: Vec<&str> = columns.iter().map(|(name, _)| *name).collect();
    let mut sql = format!("INSERT INTO {table} ({}) VALUES ", names.join(", "));

    let mut placeholder = 1;
    for row in 0..rows {
        if row > 0 {
            sql.push_str(", ");
        }
        sql.push('(');
        for (col, (_, pg_type)) in columns.iter().enumerate() {
            if col > 0 {
                sql.push_str(", ");
            }
            sql.push_str(&format!("${placeholder}::{pg_type}"));
            placeholder += 1;
        }
        sql.push(')');
    }
    sql
}

async fn insert_nodes(session: &mut dyn ReportSession, records: &[NodeRecord]) -> Result<usize> {
    for chunk in records.chunks(INSERT_CHUNK_ROWS) {
        let sql = insert_statement("rpt_node", &NODE_COLUMNS, chunk.len());
        let mut params: Vec<SqlParam<'_>> = Vec::with_capacity(chunk.len() * NODE_COLUMNS.len());
        for r in chunk {
            params.push(&r.result_id);
            params.push(&r.node_id);
            params.push(&r.time);
            params.push(&r.top_elev);
            params.push(&r.demand);
            params.push(&r.head);
            params.push(&r.press);
            params.push(&r.quality);
        }
        session.execute(&sql, &params).await?;
    }
    Ok(records.len())
}

async fn insert_arcs(session: &mut dyn ReportSession, records: &[ArcRecord]) -> Result<usize> {
    for chunk in records.chunks(INSERT_CHUNK_ROWS) {
        let sql = insert_statement("rpt_arc", &ARC_COLUMNS, chunk.len());
        let mut params: Vec<SqlParam<'_>> = Vec::with_capacity(chunk.len() * ARC_COLUMNS.len());
        for r in chunk {
            params.push(&r.result_id);
            params.push(&r.arc_id);
            params.push(&r.time);
            params.push(&r.length);
            params.push(&r.diameter);
            params.push(&r.flow);
            params.push(&r.vel);
            params.push(&r.headloss);
            params.push(&r.setting);
            params.push(&r.reaction);
            params.push(&r.ffactor);
            params.push(&r.status);
        }
        session.execute(&sql, &params).await?;
    }
    Ok(records.len())
}

/// Reverses geometry of arcs with negative flow, then stores flow as absolute
async fn post_process(session: &mut dyn ReportSession, id: &str) -> Result<u64> {
    let reversed = session
        .execute(REVERSE_NEGATIVE_FLOW_GEOMETRY, &[&id])
        .await?;
    session.execute(ABSOLUTE_FLOW, &[&id]).await?;
    Ok(reversed)
}

async fn finalize(session: &mut dyn ReportSession, id: &str) -> Result<()> {
    session.execute(UPDATE_RUN_METADATA, &[&id]).await?;
    session.execute(CLEAR_SELECTOR, &[]).await?;
    session.execute(SET_SELECTOR, &[&id]).await?;

    for table in ["rpt_node", "rpt_arc"] {
        let sql = format!(
            "UPDATE {table} SET time = '{ZERO_TIME_LABEL}' \
             WHERE result_id = $1::text AND (time IS NULL OR time = 'null')"
        );
        session.execute(&sql, &[&id]).await?;
    }
    Ok(())
}
