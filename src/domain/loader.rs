//! JSON loaders for topology and result documents
//!
//! The solver harness writes the parsed input model and the parsed result
//! file as JSON. These helpers read them back into domain types.

use super::errors::HydroError;
use super::result::Result;
use super::series::ResultSeries;
use super::topology::NetworkTopology;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::Path;

/// Loads a [`NetworkTopology`] from a JSON file
pub fn load_topology(path: impl AsRef<Path>) -> Result<NetworkTopology> {
    let topology: NetworkTopology = load_json(path.as_ref(), "topology")?;
    tracing::info!(
        path = %path.as_ref().display(),
        engine = %topology.engine(),
        nodes = topology.nodes().len(),
        links = topology.links().len(),
        flow_units = %topology.flow_units(),
        "Loaded network topology"
    );
    Ok(topology)
}

/// Loads a [`ResultSeries`] from a JSON file
pub fn load_results(path: impl AsRef<Path>) -> Result<ResultSeries> {
    let series: ResultSeries = load_json(path.as_ref(), "results")?;
    tracing::info!(
        path = %path.as_ref().display(),
        node_variables = series.node_variable_names().count(),
        link_variables = series.link_variable_names().count(),
        "Loaded result series"
    );
    Ok(series)
}

fn load_json<T: DeserializeOwned>(path: &Path, what: &str) -> Result<T> {
    if !path.exists() {
        return Err(HydroError::Io(format!(
            "{what} file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        HydroError::Io(format!("Failed to read {what} file {}: {e}", path.display()))
    })?;

    serde_json::from_str(&contents).map_err(|e| {
        HydroError::Serialization(format!(
            "Failed to parse {what} file {}: {e}",
            path.display()
        ))
    })
}
