//! Integration tests for observation-API reconciliation
//!
//! These tests run the reconciler and the orchestrator against an in-memory
//! catalog that records every provisioning call and batch request.

use async_trait::async_trait;
use hydrosync::adapters::frost::{
    BatchMethod, BatchOperation, EntityId, ObservationCatalog, OperationOutcome, RemoteThing,
    SensorDraft,
};
use hydrosync::core::engine::{profile_for, VariableSpec};
use hydrosync::core::export::{
    ExportOptions, ExportOrchestrator, ExportResources, ExportTarget, Reconciler,
};
use hydrosync::domain::{
    EngineKind, FrostError, HydroError, Link, LinkKind, NetworkTopology, Node, NodeKind, Result,
    ResultId, ResultSeries, VariableTable,
};
use serde_json::{json, Map, Value};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
struct FakeCatalog {
    things: HashMap<String, RemoteThing>,
    properties: HashMap<String, EntityId>,
    fail_prefetch: bool,
    /// Batch requests touching a Thing with this name fail as a whole
    fail_batches_with: Option<String>,
    created_properties: Mutex<Vec<String>>,
    sensors: Mutex<Vec<SensorDraft>>,
    batches: Mutex<Vec<Vec<BatchOperation>>>,
    /// Time each batch request stays in flight
    delay: Option<Duration>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl FakeCatalog {
    fn with_things(mut self, things: Vec<RemoteThing>) -> Self {
        self.things = things.into_iter().map(|t| (t.name.clone(), t)).collect();
        self
    }

    fn operations(&self) -> Vec<BatchOperation> {
        self.batches.lock().unwrap().iter().flatten().cloned().collect()
    }

    fn touches(operation: &BatchOperation, name: &str) -> bool {
        operation.body["name"] == name || operation.url.contains(&format!("'{name}'"))
    }
}

#[async_trait]
impl ObservationCatalog for FakeCatalog {
    async fn test_connection(&self) -> Result<()> {
        Ok(())
    }

    async fn fetch_things(&self) -> Result<HashMap<String, RemoteThing>> {
        if self.fail_prefetch {
            return Err(HydroError::Frost(FrostError::ConnectionFailed(
                "connection refused".to_string(),
            )));
        }
        Ok(self.things.clone())
    }

    async fn fetch_observed_properties(&self) -> Result<HashMap<String, EntityId>> {
        Ok(self.properties.clone())
    }

    async fn create_observed_property(&self, variable: &VariableSpec) -> Result<EntityId> {
        let mut created = self.created_properties.lock().unwrap();
        created.push(variable.name.to_string());
        Ok(EntityId::from(100 + created.len() as i64))
    }

    async fn create_sensor(&self, sensor: &SensorDraft) -> Result<EntityId> {
        self.sensors.lock().unwrap().push(sensor.clone());
        Ok(EntityId::from(900))
    }

    async fn submit_batch(&self, operations: Vec<BatchOperation>) -> Result<Vec<OperationOutcome>> {
        self.batches.lock().unwrap().push(operations.clone());

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(current, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if let Some(ref name) = self.fail_batches_with {
            if operations.iter().any(|op| Self::touches(op, name)) {
                return Err(HydroError::Frost(FrostError::ServerError {
                    status: 503,
                    message: "unavailable".to_string(),
                }));
            }
        }

        Ok(operations
            .iter()
            .map(|op| OperationOutcome {
                id: op.id.clone(),
                status: 201,
                body: None,
            })
            .collect())
    }

    fn describe(&self) -> String {
        "in-memory catalog".to_string()
    }
}

fn remote(id: &str, name: &str, obsolete: bool) -> RemoteThing {
    let mut properties = Map::new();
    properties.insert("node_type".to_string(), Value::from("Junction"));
    properties.insert("obsolete".to_string(), Value::Bool(obsolete));
    RemoteThing {
        id: EntityId::from(id),
        name: name.to_string(),
        properties,
        location: None,
    }
}

/// J1 and J2 with coordinates, T9 without; P1 joins J1 and J2
fn topology() -> NetworkTopology {
    NetworkTopology::builder(EngineKind::Epanet)
        .flow_units("LPS")
        .source_file("/models/district.inp")
        .node(Node::new("J1", NodeKind::Junction).with_coordinates(430_000.0, 4_580_000.0))
        .node(Node::new("J2", NodeKind::Junction).with_coordinates(430_100.0, 4_580_050.0))
        .node(Node::new("T9", NodeKind::Tank))
        .link(Link::new("P1", LinkKind::Pipe, "J1", "J2"))
        .build()
        .unwrap()
}

/// Demand for J1 and J2, pressure for J1 only, flow for P1; no head or quality
fn series() -> ResultSeries {
    let steps = vec![0, 3600, 7200];
    let demand = VariableTable::new(steps.clone())
        .with_column("J1", vec![0.1, 0.2, 0.15])
        .and_then(|t| t.with_column("J2", vec![0.3, 0.3, 0.3]))
        .unwrap();
    let pressure = VariableTable::new(steps.clone())
        .with_column("J1", vec![30.0, 29.5, 29.8])
        .unwrap();
    let flow = VariableTable::new(steps)
        .with_column("P1", vec![-5.0, 3.0, 2.0])
        .unwrap();

    ResultSeries::new()
        .with_node_variable("demand", demand)
        .and_then(|s| s.with_node_variable("pressure", pressure))
        .and_then(|s| s.with_link_variable("flowrate", flow))
        .unwrap()
}

fn result_id() -> ResultId {
    ResultId::new("run_42").unwrap()
}

fn thing_create<'a>(operations: &'a [BatchOperation], name: &str) -> &'a BatchOperation {
    operations
        .iter()
        .find(|op| op.method == BatchMethod::Post && op.url == "Things" && op.body["name"] == name)
        .unwrap_or_else(|| panic!("no create for {name}"))
}

fn datastream_names(body: &Value) -> HashSet<String> {
    body["Datastreams"]
        .as_array()
        .unwrap()
        .iter()
        .map(|ds| ds["name"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn test_empty_catalog_creates_everything_with_coordinates() {
    let catalog = FakeCatalog::default();
    let options = ExportOptions::default();

    let report = Reconciler::new(&catalog, &options)
        .reconcile(&result_id(), &series(), &topology())
        .await
        .unwrap();

    assert_eq!(report.created, 3);
    assert_eq!(report.updated, 0);
    assert_eq!(report.obsoleted, 0);
    assert_eq!(report.skipped, 1);
    assert!(!report.has_failures());

    let sensors = catalog.sensors.lock().unwrap();
    assert_eq!(sensors.len(), 1);
    assert_eq!(sensors[0].name, "EPANET run_42 (district.inp)");
}

#[tokio::test]
async fn test_provisions_missing_properties_once_by_name() {
    let catalog = FakeCatalog {
        properties: [("Demand".to_string(), EntityId::from(7))].into_iter().collect(),
        ..FakeCatalog::default()
    };
    let options = ExportOptions::default();

    Reconciler::new(&catalog, &options)
        .reconcile(&result_id(), &series(), &topology())
        .await
        .unwrap();

    let created = catalog.created_properties.lock().unwrap();
    let unique: HashSet<&String> = created.iter().collect();
    assert_eq!(unique.len(), created.len());
    assert!(!created.contains(&"Demand".to_string()));
    assert!(created.contains(&"Pressure".to_string()));

    let expected: HashSet<&str> = profile_for(EngineKind::Epanet)
        .all_variables()
        .iter()
        .map(|v| v.name)
        .collect();
    assert_eq!(created.len() + 1, expected.len());
}

#[tokio::test]
async fn test_swmm_shared_variable_names_are_provisioned_once() {
    let catalog = FakeCatalog::default();
    let options = ExportOptions::default();
    let topology = NetworkTopology::builder(EngineKind::Swmm)
        .flow_units("CMS")
        .node(Node::new("O1", NodeKind::Outfall).with_coordinates(430_000.0, 4_580_000.0))
        .build()
        .unwrap();

    Reconciler::new(&catalog, &options)
        .reconcile(&result_id(), &ResultSeries::new(), &topology)
        .await
        .unwrap();

    let created = catalog.created_properties.lock().unwrap();
    let unique: HashSet<&String> = created.iter().collect();
    assert_eq!(unique.len(), created.len());
    assert_eq!(created.iter().filter(|n| *n == "Depth").count(), 1);
}

#[tokio::test]
async fn test_absent_variables_produce_no_datastreams() {
    let catalog = FakeCatalog::default();
    let options = ExportOptions::default();

    Reconciler::new(&catalog, &options)
        .reconcile(&result_id(), &series(), &topology())
        .await
        .unwrap();

    let operations = catalog.operations();

    let j1 = datastream_names(&thing_create(&operations, "J1").body);
    assert_eq!(
        j1,
        ["Demand at J1", "Pressure at J1"]
            .into_iter()
            .map(String::from)
            .collect()
    );

    let j2 = datastream_names(&thing_create(&operations, "J2").body);
    assert_eq!(j2.len(), 1);

    let p1 = thing_create(&operations, "P1");
    assert_eq!(p1.body["Locations"][0]["location"]["type"], "LineString");
    let flow = &p1.body["Datastreams"][0];
    assert_eq!(flow["name"], "Flow at P1");
    assert_eq!(flow["Observations"].as_array().unwrap().len(), 3);
    // canonical units, no conversion
    assert_eq!(flow["Observations"][0]["result"], -5.0);
}

#[tokio::test]
async fn test_untouched_things_are_marked_obsolete_not_deleted() {
    let catalog = FakeCatalog::default().with_things(vec![
        remote("j1", "J1", true),
        remote("old", "OLD_PIPE", false),
        remote("gone", "GONE", true),
    ]);
    let options = ExportOptions::default();

    let report = Reconciler::new(&catalog, &options)
        .reconcile(&result_id(), &series(), &topology())
        .await
        .unwrap();

    assert_eq!(report.created, 2);
    assert_eq!(report.updated, 1);
    assert_eq!(report.obsoleted, 1);

    let operations = catalog.operations();
    assert!(operations
        .iter()
        .all(|op| matches!(op.method, BatchMethod::Post | BatchMethod::Patch)));

    let sweep: Vec<&BatchOperation> = operations
        .iter()
        .filter(|op| op.body["properties"]["obsolete"] == true)
        .collect();
    assert_eq!(sweep.len(), 1);
    assert_eq!(sweep[0].url, "Things('old')");
    assert_eq!(sweep[0].body["properties"]["node_type"], "Junction");

    // J1 is current again
    let revive = operations
        .iter()
        .find(|op| op.url == "Things('j1')")
        .unwrap();
    assert_eq!(revive.method, BatchMethod::Patch);
    assert_eq!(revive.body["properties"]["obsolete"], false);

    assert!(!operations.iter().any(|op| op.url.contains("'gone'")));
}

#[tokio::test]
async fn test_existing_thing_gets_linked_datastreams_and_new_location() {
    let catalog = FakeCatalog::default().with_things(vec![remote("j1", "J1", false)]);
    let options = ExportOptions::default();

    Reconciler::new(&catalog, &options)
        .reconcile(&result_id(), &series(), &topology())
        .await
        .unwrap();

    let operations = catalog.operations();
    let location = operations
        .iter()
        .find(|op| op.url == "Things('j1')/Locations")
        .unwrap();
    assert_eq!(location.body["location"]["type"], "Point");

    let linked: Vec<&BatchOperation> = operations
        .iter()
        .filter(|op| op.url == "Datastreams")
        .collect();
    assert_eq!(linked.len(), 2);
    assert!(linked
        .iter()
        .all(|op| op.body["Thing"] == json!({"@iot.id": "j1"})));
}

#[tokio::test]
async fn test_failed_batch_does_not_block_siblings() {
    let catalog = FakeCatalog {
        fail_batches_with: Some("J2".to_string()),
        ..FakeCatalog::default()
    };
    let options = ExportOptions {
        batch_size: 1,
        max_workers: 2,
        ..ExportOptions::default()
    };

    let report = Reconciler::new(&catalog, &options)
        .reconcile(&result_id(), &series(), &topology())
        .await
        .unwrap();

    assert_eq!(report.batches, 3);
    assert_eq!(report.failed_batches, 1);
    assert_eq!(report.created, 2);
    assert_eq!(catalog.batches.lock().unwrap().len(), 3);
}

#[tokio::test]
async fn test_batches_never_exceed_worker_limit() {
    for (max_workers, expected_peak) in [(1, 1), (2, 2)] {
        let catalog = FakeCatalog {
            delay: Some(Duration::from_millis(50)),
            ..FakeCatalog::default()
        };
        let options = ExportOptions {
            batch_size: 1,
            max_workers,
            ..ExportOptions::default()
        };

        let report = Reconciler::new(&catalog, &options)
            .reconcile(&result_id(), &series(), &topology())
            .await
            .unwrap();

        assert_eq!(report.batches, 3);
        assert_eq!(report.failed_batches, 0);
        let peak = catalog.peak_in_flight.load(Ordering::SeqCst);
        assert!(peak <= max_workers, "peak {peak} over {max_workers} workers");
        assert_eq!(peak, expected_peak);
        assert_eq!(catalog.in_flight.load(Ordering::SeqCst), 0);
    }
}

#[tokio::test]
async fn test_partial_batch_failure_outcome_follows_option() {
    let (series, topology) = (series(), topology());

    for (fail_on_partial_batch, expected) in [(false, true), (true, false)] {
        let catalog = Arc::new(FakeCatalog {
            fail_batches_with: Some("P1".to_string()),
            ..FakeCatalog::default()
        });
        let orchestrator =
            ExportOrchestrator::new(ExportResources::default().with_catalog(catalog.clone()));
        let options = ExportOptions {
            batch_size: 1,
            fail_on_partial_batch,
            ..ExportOptions::default()
        };

        let ok = orchestrator
            .export(
                &result_id(),
                ExportTarget::Frost,
                Some(&series),
                Some(&topology),
                &options,
            )
            .await;
        assert_eq!(ok, expected);
    }
}

#[tokio::test]
async fn test_prefetch_failure_aborts_export() {
    let catalog = Arc::new(FakeCatalog {
        fail_prefetch: true,
        ..FakeCatalog::default()
    });
    let orchestrator =
        ExportOrchestrator::new(ExportResources::default().with_catalog(catalog.clone()));
    let (series, topology) = (series(), topology());

    let ok = orchestrator
        .export(
            &result_id(),
            ExportTarget::Frost,
            Some(&series),
            Some(&topology),
            &ExportOptions::default(),
        )
        .await;

    assert!(!ok);
    assert!(catalog.sensors.lock().unwrap().is_empty());
    assert!(catalog.batches.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_unsupported_crs_fails_before_provisioning() {
    let catalog = FakeCatalog::default();
    let options = ExportOptions {
        crs_from: 2062,
        ..ExportOptions::default()
    };

    let result = Reconciler::new(&catalog, &options)
        .reconcile(&result_id(), &series(), &topology())
        .await;

    assert!(matches!(result, Err(HydroError::Geo(_))));
    assert!(catalog.created_properties.lock().unwrap().is_empty());
}
