//! Observation-API reconciler
//!
//! Synchronises one run against a SensorThings catalog:
//!
//! 1. pre-fetch every Thing and ObservedProperty (two paged reads)
//! 2. create missing ObservedProperties and one Sensor for the run
//! 3. assemble a draft per network element
//! 4. create or update Things in concurrent batches, matched by name
//! 5. flag every remote Thing the run did not touch as obsolete
//!
//! Steps 1 and 2 abort the export on failure. Batch failures in steps 4 and
//! 5 are counted in the [`ReconcileReport`] and do not stop other batches.

use super::batch::{BatchResult, BatchRunner, ChangeKind, PlannedBatch};
use super::things::{ThingAssembler, ThingDraft};
use super::ExportOptions;
use crate::adapters::frost::{
    BatchOperation, EntityId, ObservationCatalog, RemoteThing, SensorDraft, OBSOLETE_PROPERTY,
};
use crate::core::engine::{profile_for, EngineProfile};
use crate::core::geo::CoordinateTransform;
use crate::domain::{HydroError, NetworkTopology, Result, ResultId, ResultSeries};
use chrono::{DateTime, TimeDelta, Utc};
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// What one reconciliation did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub created: usize,
    pub updated: usize,
    pub obsoleted: usize,
    /// Elements without usable coordinates
    pub skipped: usize,
    pub batches: usize,
    pub failed_batches: usize,
    pub failed_operations: usize,
}

impl ReconcileReport {
    pub fn has_failures(&self) -> bool {
        self.failed_batches > 0
    }

    fn absorb(&mut self, result: &BatchResult) {
        self.created += result.created;
        self.updated += result.updated;
        self.obsoleted += result.obsoleted;
        self.batches += result.batches;
        self.failed_batches += result.failed_batches;
        self.failed_operations += result.failed_operations;
    }
}

/// Synchronises runs against one catalog
pub struct Reconciler<'a> {
    catalog: &'a dyn ObservationCatalog,
    options: &'a ExportOptions,
}

impl<'a> Reconciler<'a> {
    pub fn new(catalog: &'a dyn ObservationCatalog, options: &'a ExportOptions) -> Self {
        Self { catalog, options }
    }

    /// Runs the full protocol for one run
    ///
    /// # Errors
    ///
    /// Returns an error when the CRS pair is unsupported, or when pre-fetch
    /// or provisioning fails. Batch failures are reported, not returned.
    pub async fn reconcile(
        &self,
        result_id: &ResultId,
        series: &ResultSeries,
        topology: &NetworkTopology,
    ) -> Result<ReconcileReport> {
        let profile = profile_for(topology.engine());
        let transform = CoordinateTransform::new(self.options.crs_from, self.options.crs_to)?;
        let start = start_time(self.options, topology)?;

        let existing = self.catalog.fetch_things().await?;
        let mut properties = self.catalog.fetch_observed_properties().await?;
        tracing::info!(
            things = existing.len(),
            observed_properties = properties.len(),
            "Fetched remote catalog"
        );

        self.provision_properties(profile, &mut properties).await?;
        let sensor = self
            .catalog
            .create_sensor(&sensor_draft(result_id, profile, topology))
            .await?;

        let assembly = ThingAssembler::new(
            profile,
            topology,
            series,
            &transform,
            &sensor,
            &properties,
            start,
        )
        .assemble();

        let mut report = ReconcileReport {
            skipped: assembly.skipped.len(),
            ..ReconcileReport::default()
        };

        let runner = BatchRunner::new(self.catalog, self.options.max_workers);

        let upserts = plan_upserts(&assembly.things, &existing, self.options.batch_size);
        tracing::info!(batches = upserts.len(), things = assembly.things.len(), "Submitting things");
        report.absorb(&runner.run(upserts).await);

        let touched: HashSet<&str> = assembly.things.iter().map(|t| t.name.as_str()).collect();
        let sweep = plan_obsolescence(&existing, &touched, self.options.batch_size);
        if !sweep.is_empty() {
            tracing::info!(batches = sweep.len(), "Flagging obsolete things");
        }
        report.absorb(&runner.run(sweep).await);

        Ok(report)
    }

    async fn provision_properties(
        &self,
        profile: &dyn EngineProfile,
        properties: &mut HashMap<String, EntityId>,
    ) -> Result<()> {
        for variable in profile.all_variables() {
            if properties.contains_key(variable.name) {
                continue;
            }
            let id = self.catalog.create_observed_property(variable).await?;
            properties.insert(variable.name.to_string(), id);
        }
        Ok(())
    }
}

/// Counts what a reconciliation would submit, without contacting the server
///
/// Every assembled Thing is counted as created since nothing is fetched.
///
/// # Errors
///
/// Returns an error when the CRS pair is unsupported or the start time is
/// out of range.
pub fn dry_run(
    series: &ResultSeries,
    topology: &NetworkTopology,
    options: &ExportOptions,
) -> Result<ReconcileReport> {
    let profile = profile_for(topology.engine());
    let transform = CoordinateTransform::new(options.crs_from, options.crs_to)?;
    let start = start_time(options, topology)?;
    let placeholder = EntityId::from("dry-run");
    let properties: HashMap<String, EntityId> = profile
        .all_variables()
        .into_iter()
        .map(|v| (v.name.to_string(), placeholder.clone()))
        .collect();

    let assembly = ThingAssembler::new(
        profile,
        topology,
        series,
        &transform,
        &placeholder,
        &properties,
        start,
    )
    .assemble();

    let batch_size = options.batch_size.max(1);
    let report = ReconcileReport {
        created: assembly.things.len(),
        skipped: assembly.skipped.len(),
        batches: assembly.things.len().div_ceil(batch_size),
        ..ReconcileReport::default()
    };

    tracing::info!(
        things = report.created,
        skipped = report.skipped,
        batches = report.batches,
        "Dry run: nothing submitted"
    );
    Ok(report)
}

/// Simulation start: the configured time, or now plus the network's start clock time
///
/// # Errors
///
/// Returns an error when the start clock time overflows the calendar.
pub fn start_time(options: &ExportOptions, topology: &NetworkTopology) -> Result<DateTime<Utc>> {
    if let Some(start) = options.start_time {
        return Ok(start);
    }

    let clocktime = topology.start_clocktime();
    i64::try_from(clocktime)
        .ok()
        .and_then(TimeDelta::try_seconds)
        .and_then(|offset| Utc::now().checked_add_signed(offset))
        .ok_or_else(|| {
            HydroError::Export(format!("Start clock time {clocktime}s is out of range"))
        })
}

/// One fresh sensor per run
pub fn sensor_draft(
    result_id: &ResultId,
    profile: &dyn EngineProfile,
    topology: &NetworkTopology,
) -> SensorDraft {
    let network = profile.network_type();
    let source = topology
        .source_file()
        .and_then(|s| Path::new(s).file_name())
        .and_then(|s| s.to_str())
        .unwrap_or("unknown");

    SensorDraft {
        name: format!("{network} {result_id} ({source})"),
        description: format!("{network} simulation run {result_id} of {source}"),
        encoding_type: "text/plain".to_string(),
        metadata: topology.source_file().unwrap_or(source).to_string(),
    }
}

/// Operations creating unknown Things and refreshing known ones
pub fn plan_upserts(
    drafts: &[ThingDraft],
    existing: &HashMap<String, RemoteThing>,
    batch_size: usize,
) -> Vec<PlannedBatch> {
    drafts
        .chunks(batch_size.max(1))
        .enumerate()
        .map(|(index, chunk)| {
            let mut batch = PlannedBatch::new(index);
            for draft in chunk {
                match existing.get(&draft.name) {
                    None => batch.push(
                        &draft.name,
                        ChangeKind::Created,
                        vec![BatchOperation::post("", "Things", draft.create_body())],
                    ),
                    Some(remote) => batch.push(
                        &draft.name,
                        ChangeKind::Updated,
                        update_operations(draft, remote),
                    ),
                }
            }
            batch
        })
        .collect()
}

fn update_operations(draft: &ThingDraft, remote: &RemoteThing) -> Vec<BatchOperation> {
    let thing_path = remote.id.path("Things");
    let mut operations = vec![BatchOperation::patch(
        "",
        thing_path.clone(),
        draft.update_body(remote),
    )];

    if draft.location_changed(remote) {
        operations.push(BatchOperation::post(
            "",
            format!("{thing_path}/Locations"),
            draft.location.clone(),
        ));
    }

    operations.extend(
        draft
            .linked_datastreams(&remote.id)
            .into_iter()
            .map(|ds| BatchOperation::post("", "Datastreams", ds)),
    );
    operations
}

/// Patches flagging every untouched, not yet obsolete remote Thing
pub fn plan_obsolescence(
    existing: &HashMap<String, RemoteThing>,
    touched: &HashSet<&str>,
    batch_size: usize,
) -> Vec<PlannedBatch> {
    let mut stale: Vec<&RemoteThing> = existing
        .values()
        .filter(|t| !touched.contains(t.name.as_str()) && !t.is_obsolete())
        .collect();
    stale.sort_by(|a, b| a.name.cmp(&b.name));

    stale
        .chunks(batch_size.max(1))
        .enumerate()
        .map(|(index, chunk)| {
            let mut batch = PlannedBatch::new(index);
            for thing in chunk {
                let mut properties = thing.properties.clone();
                properties.insert(OBSOLETE_PROPERTY.to_string(), Value::Bool(true));
                batch.push(
                    &thing.name,
                    ChangeKind::Obsoleted,
                    vec![BatchOperation::patch(
                        "",
                        thing.id.path("Things"),
                        json!({ "properties": properties }),
                    )],
                );
            }
            batch
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::frost::BatchMethod;
    use crate::domain::{EngineKind, Node, NodeKind};
    use chrono::TimeZone;
    use serde_json::Map;

    fn remote(id: i64, name: &str, obsolete: bool) -> RemoteThing {
        let mut properties = Map::new();
        properties.insert("obsolete".to_string(), Value::Bool(obsolete));
        RemoteThing {
            id: EntityId::from(id),
            name: name.to_string(),
            properties,
            location: None,
        }
    }

    fn draft(name: &str) -> ThingDraft {
        ThingDraft {
            name: name.to_string(),
            kind: super::super::things::EntityKind::Node,
            description: format!("EPANET Junction {name}"),
            properties: Map::new(),
            location: json!({"name": format!("{name} Location"), "location": {"type": "Point", "coordinates": [2.0, 41.0]}}),
            datastreams: vec![json!({"name": format!("Demand at {name}")})],
        }
    }

    #[test]
    fn test_plan_upserts_create_and_update() {
        let drafts = vec![draft("J1"), draft("J2"), draft("J3")];
        let existing: HashMap<String, RemoteThing> =
            [("J2".to_string(), remote(7, "J2", true))].into_iter().collect();

        let batches = plan_upserts(&drafts, &existing, 2);
        assert_eq!(batches.len(), 2);

        let first = batches[0].operations();
        assert_eq!(first[0].method, BatchMethod::Post);
        assert_eq!(first[0].url, "Things");
        // J2: patch, relocate (no remote location), one datastream
        assert_eq!(first[1].url, "Things(7)");
        assert_eq!(first[1].body["properties"]["obsolete"], false);
        assert_eq!(first[2].url, "Things(7)/Locations");
        assert_eq!(first[3].url, "Datastreams");
        assert_eq!(first[3].body["Thing"]["@iot.id"], 7);
        assert_eq!(batches[1].len(), 1);
    }

    #[test]
    fn test_plan_obsolescence_skips_touched_and_already_obsolete() {
        let existing: HashMap<String, RemoteThing> = [
            remote(1, "J1", false),
            remote(2, "OLD", false),
            remote(3, "GONE", true),
        ]
        .into_iter()
        .map(|t| (t.name.clone(), t))
        .collect();
        let touched: HashSet<&str> = ["J1"].into_iter().collect();

        let batches = plan_obsolescence(&existing, &touched, 50);
        assert_eq!(batches.len(), 1);
        let ops = batches[0].operations();
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].method, BatchMethod::Patch);
        assert_eq!(ops[0].url, "Things(2)");
        assert_eq!(ops[0].body["properties"]["obsolete"], true);
    }

    #[test]
    fn test_sensor_draft_names_run() {
        let topology = NetworkTopology::builder(EngineKind::Epanet)
            .flow_units("LPS")
            .flow_units("LPS")
            .source_file("/data/models/ciudad.inp")
            .node(Node::new("J1", NodeKind::Junction))
            .build()
            .unwrap();
        let id = ResultId::new("run_7").unwrap();
        let sensor = sensor_draft(&id, profile_for(EngineKind::Epanet), &topology);
        assert_eq!(sensor.name, "EPANET run_7 (ciudad.inp)");
        assert_eq!(sensor.metadata, "/data/models/ciudad.inp");
    }

    #[test]
    fn test_start_time_prefers_option() {
        let topology = NetworkTopology::builder(EngineKind::Epanet)
            .flow_units("LPS")
            .flow_units("LPS")
            .start_clocktime(3600)
            .build()
            .unwrap();
        let fixed = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let options = ExportOptions {
            start_time: Some(fixed),
            ..ExportOptions::default()
        };
        assert_eq!(start_time(&options, &topology).unwrap(), fixed);

        let defaulted = start_time(&ExportOptions::default(), &topology).unwrap();
        assert!(defaulted > Utc::now() + TimeDelta::seconds(3500));
    }

    #[test]
    fn test_start_clocktime_overflow_is_an_error() {
        let topology = NetworkTopology::builder(EngineKind::Epanet)
            .flow_units("LPS")
            .flow_units("LPS")
            .start_clocktime(u64::MAX)
            .build()
            .unwrap();
        let err = start_time(&ExportOptions::default(), &topology).unwrap_err();
        assert!(matches!(err, HydroError::Export(ref m) if m.contains("out of range")));

        let huge = NetworkTopology::builder(EngineKind::Epanet)
            .flow_units("LPS")
            .flow_units("LPS")
            .start_clocktime(10_000_000_000_000)
            .build()
            .unwrap();
        assert!(start_time(&ExportOptions::default(), &huge).is_err());
    }
}
