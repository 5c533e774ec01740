//! Resource factory
//!
//! Builds the explicit resource handles handed to the export orchestrator.

use crate::adapters::database::traits::ReportStore;
use crate::adapters::frost::{FrostClient, ObservationCatalog};
use crate::adapters::postgresql::{PostgreSQLAdapter, PostgreSQLClient};
use crate::config::HydrosyncConfig;
use crate::domain::{HydroError, Result};
use std::sync::Arc;

/// Create the report store from the `[postgresql]` section
///
/// # Errors
///
/// Returns a configuration error if the section is missing, or the client's
/// own error if the pool cannot be created.
pub async fn create_report_store(config: &HydrosyncConfig) -> Result<Arc<dyn ReportStore>> {
    let pg_config = config.postgresql.as_ref().ok_or_else(|| {
        HydroError::Configuration("postgresql configuration is missing".to_string())
    })?;

    tracing::info!("Creating PostgreSQL report store");
    let client = PostgreSQLClient::new(pg_config.clone()).await?;
    Ok(Arc::new(PostgreSQLAdapter::new(client)) as Arc<dyn ReportStore>)
}

/// Create the observation catalog from the `[frost]` section
///
/// # Errors
///
/// Returns a configuration error if the section is missing or the client
/// cannot be built.
pub fn create_catalog(config: &HydrosyncConfig) -> Result<Arc<dyn ObservationCatalog>> {
    let frost_config = config.frost.as_ref().ok_or_else(|| {
        HydroError::Configuration("frost configuration is missing".to_string())
    })?;

    tracing::info!(base_url = %frost_config.base_url, "Creating FROST client");
    let client = FrostClient::new(frost_config)?;
    Ok(Arc::new(client) as Arc<dyn ObservationCatalog>)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ExportConfig, FrostConfig};

    fn config() -> HydrosyncConfig {
        HydrosyncConfig {
            application: Default::default(),
            environment: Default::default(),
            input: Default::default(),
            export: ExportConfig::default(),
            postgresql: None,
            frost: None,
            logging: Default::default(),
        }
    }

    #[tokio::test]
    async fn test_missing_sections_are_configuration_errors() {
        let cfg = config();
        assert!(matches!(
            create_report_store(&cfg).await,
            Err(HydroError::Configuration(_))
        ));
        assert!(matches!(
            create_catalog(&cfg),
            Err(HydroError::Configuration(_))
        ));
    }

    #[test]
    fn test_create_catalog() {
        let mut cfg = config();
        cfg.frost = Some(FrostConfig::default());
        let catalog = create_catalog(&cfg).unwrap();
        assert!(catalog.describe().starts_with("http://localhost:8080/"));
    }
}
