//! Row shaping for the relational report tables
//!
//! Records are built in memory before any statement is issued, so an
//! unresolvable unit system fails the export without touching the database.

use crate::core::units::{convert, round_value, time_label, Quantity, UnitSystem};
use crate::domain::{NetworkTopology, ResultId, ResultSeries, VariableTable};

/// Variable gating node rows
pub const NODE_GATE_VARIABLE: &str = "demand";

/// Variable gating arc rows
pub const ARC_GATE_VARIABLE: &str = "flowrate";

/// One `rpt_node` row
#[derive(Debug, Clone, PartialEq)]
pub struct NodeRecord {
    pub result_id: String,
    pub node_id: String,
    pub time: String,
    pub top_elev: Option<f64>,
    pub demand: Option<f64>,
    pub head: Option<f64>,
    pub press: Option<f64>,
    pub quality: Option<f64>,
}

/// One `rpt_arc` row
#[derive(Debug, Clone, PartialEq)]
pub struct ArcRecord {
    pub result_id: String,
    pub arc_id: String,
    pub time: String,
    pub length: Option<f64>,
    pub diameter: Option<f64>,
    pub flow: Option<f64>,
    pub vel: Option<f64>,
    pub headloss: Option<f64>,
    pub setting: Option<f64>,
    pub reaction: Option<f64>,
    pub ffactor: Option<f64>,
    pub status: Option<String>,
}

/// Textual link status: 0 CLOSED, 1 OPEN, 2 ACTIVE, anything else verbatim
///
/// Fractional codes are truncated toward zero first.
///
/// ```
/// use hydrosync::core::export::records::status_label;
///
/// assert_eq!(status_label(1.0).as_deref(), Some("OPEN"));
/// assert_eq!(status_label(5.0).as_deref(), Some("5"));
/// assert_eq!(status_label(f64::NAN), None);
/// ```
pub fn status_label(code: f64) -> Option<String> {
    if !code.is_finite() {
        tracing::error!(value = code, "Error reading non-finite link status");
        return None;
    }
    let label = match code.trunc() as i64 {
        0 => "CLOSED".to_string(),
        1 => "OPEN".to_string(),
        2 => "ACTIVE".to_string(),
        other => other.to_string(),
    };
    Some(label)
}

/// Reads one cell of an optional variable and converts it
fn converted(
    table: Option<&VariableTable>,
    step: usize,
    entity_id: &str,
    system: UnitSystem,
    quantity: Quantity,
    decimals: u32,
) -> Option<f64> {
    table
        .and_then(|t| t.value(step, entity_id))
        .and_then(|v| convert(v, system, quantity, decimals))
}

/// Reads one cell of an optional variable and rounds it
fn rounded(table: Option<&VariableTable>, step: usize, entity_id: &str, decimals: u32) -> Option<f64> {
    table
        .and_then(|t| t.value(step, entity_id))
        .and_then(|v| round_value(v, decimals))
}

/// Builds `rpt_node` rows: every timestep × every node of the gate variable
///
/// Returns an empty vector (with a warning) when the gate variable is absent.
pub fn build_node_records(
    result_id: &ResultId,
    series: &ResultSeries,
    topology: &NetworkTopology,
    system: UnitSystem,
    decimals: u32,
) -> Vec<NodeRecord> {
    let Some(demand) = series.node_variable(NODE_GATE_VARIABLE) else {
        tracing::warn!(
            result_id = %result_id,
            "No demand data found in results, skipping node rows"
        );
        return Vec::new();
    };

    let head = series.node_variable("head");
    let pressure = series.node_variable("pressure");
    let quality = series.node_variable("quality");

    let node_ids: Vec<&str> = demand.entity_ids().collect();
    let top_elevs: Vec<Option<f64>> = node_ids
        .iter()
        .map(|id| {
            topology
                .node(id)
                .and_then(|n| n.elevation)
                .and_then(|e| convert(e, system, Quantity::Elevation, decimals))
        })
        .collect();

    let mut records = Vec::with_capacity(demand.timesteps().len() * node_ids.len());
    for (step, &seconds) in demand.timesteps().iter().enumerate() {
        let time = time_label(seconds);
        for (node_id, top_elev) in node_ids.iter().zip(&top_elevs) {
            records.push(NodeRecord {
                result_id: result_id.to_string(),
                node_id: (*node_id).to_string(),
                time: time.clone(),
                top_elev: *top_elev,
                demand: converted(Some(demand), step, node_id, system, Quantity::Demand, decimals),
                head: converted(head, step, node_id, system, Quantity::HydraulicHead, decimals),
                press: converted(pressure, step, node_id, system, Quantity::Pressure, decimals),
                quality: rounded(quality, step, node_id, decimals),
            });
        }
    }
    records
}

/// Builds `rpt_arc` rows: every timestep × every link of the gate variable
pub fn build_arc_records(
    result_id: &ResultId,
    series: &ResultSeries,
    topology: &NetworkTopology,
    system: UnitSystem,
    decimals: u32,
) -> Vec<ArcRecord> {
    let Some(flow) = series.link_variable(ARC_GATE_VARIABLE) else {
        tracing::warn!(
            result_id = %result_id,
            "No flowrate data found in results, skipping arc rows"
        );
        return Vec::new();
    };

    let velocity = series.link_variable("velocity");
    let headloss = series.link_variable("headloss");
    let setting = series.link_variable("setting");
    let reaction = series.link_variable("reaction_rate");
    let ffactor = series.link_variable("friction_factor");
    let status = series.link_variable("status");

    let arc_ids: Vec<&str> = flow.entity_ids().collect();
    let statics: Vec<(Option<f64>, Option<f64>)> = arc_ids
        .iter()
        .map(|id| {
            let link = topology.link(id);
            let length = link
                .and_then(|l| l.length)
                .and_then(|v| convert(v, system, Quantity::Length, decimals));
            let diameter = link
                .and_then(|l| l.diameter)
                .and_then(|v| convert(v, system, Quantity::PipeDiameter, decimals));
            (length, diameter)
        })
        .collect();

    let mut records = Vec::with_capacity(flow.timesteps().len() * arc_ids.len());
    for (step, &seconds) in flow.timesteps().iter().enumerate() {
        let time = time_label(seconds);
        for (arc_id, (length, diameter)) in arc_ids.iter().zip(&statics) {
            records.push(ArcRecord {
                result_id: result_id.to_string(),
                arc_id: (*arc_id).to_string(),
                time: time.clone(),
                length: *length,
                diameter: *diameter,
                flow: converted(Some(flow), step, arc_id, system, Quantity::Flow, decimals),
                vel: converted(velocity, step, arc_id, system, Quantity::Velocity, decimals),
                headloss: converted(headloss, step, arc_id, system, Quantity::HeadLoss, decimals),
                setting: rounded(setting, step, arc_id, decimals),
                reaction: rounded(reaction, step, arc_id, decimals),
                ffactor: rounded(ffactor, step, arc_id, decimals),
                status: status
                    .and_then(|t| t.value(step, arc_id))
                    .and_then(status_label),
            });
        }
    }
    records
}
