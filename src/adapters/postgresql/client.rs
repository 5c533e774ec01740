//! PostgreSQL client implementation
//!
//! Owns the connection pool for the report database. TLS is negotiated with
//! `native-tls` when `ssl_mode` is `require`, `verify-ca` or `verify-full`.

use crate::config::schema::PostgreSQLConfig;
use crate::domain::{HydroError, Result};
use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod, Runtime};
use native_tls::TlsConnector;
use postgres_native_tls::MakeTlsConnector;
use secrecy::ExposeSecret;
use std::time::Duration;
use tokio_postgres::NoTls;

/// Pooled connection source for the report tables
pub struct PostgreSQLClient {
    pool: Pool,
    config: PostgreSQLConfig,
}

impl PostgreSQLClient {
    /// Create a new PostgreSQL client
    ///
    /// No connection is opened until the first one is requested from the pool.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection string cannot be parsed, the TLS
    /// connector cannot be built or the pool cannot be created.
    pub async fn new(config: PostgreSQLConfig) -> Result<Self> {
        let pg_config: tokio_postgres::Config = config
            .connection_string
            .expose_secret()
            .as_str()
            .parse()
            .map_err(|e| {
                HydroError::Configuration(format!("Invalid PostgreSQL connection string: {e}"))
            })?;

        let manager_config = ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        };

        let manager = if config.requires_tls() {
            let tls = build_tls_connector(&config.ssl_mode)?;
            Manager::from_config(pg_config, tls, manager_config)
        } else {
            Manager::from_config(pg_config, NoTls, manager_config)
        };

        let timeout = Some(Duration::from_secs(config.connection_timeout_seconds));
        let pool = Pool::builder(manager)
            .max_size(config.max_connections)
            .runtime(Runtime::Tokio1)
            .wait_timeout(timeout)
            .create_timeout(timeout)
            .recycle_timeout(timeout)
            .build()
            .map_err(|e| HydroError::Database(format!("Failed to create connection pool: {e}")))?;

        Ok(Self { pool, config })
    }

    /// Test the connection to PostgreSQL
    ///
    /// # Errors
    ///
    /// Returns a connection error if no connection can be obtained or
    /// `SELECT 1` fails.
    pub async fn test_connection(&self) -> Result<()> {
        let client = self.get_connection().await?;

        client
            .query_one("SELECT 1", &[])
            .await
            .map_err(|e| HydroError::Connection(format!("Connection test failed: {e}")))?;

        tracing::info!(target_db = %self.connection_string_safe(), "PostgreSQL connection test successful");
        Ok(())
    }

    /// Get a connection from the pool
    ///
    /// # Errors
    ///
    /// Returns a connection error if a connection cannot be obtained.
    pub async fn get_connection(&self) -> Result<deadpool_postgres::Object> {
        self.pool
            .get()
            .await
            .map_err(|e| HydroError::Connection(format!("Failed to get connection from pool: {e}")))
    }

    pub fn statement_timeout_ms(&self) -> u64 {
        self.config.statement_timeout_seconds * 1000
    }

    /// Get the connection string (without credentials)
    pub fn connection_string_safe(&self) -> String {
        redact_connection_string(self.config.connection_string.expose_secret().as_str())
    }

    /// Get the pool statistics
    pub fn pool_status(&self) -> deadpool_postgres::Status {
        self.pool.status()
    }
}

fn redact_connection_string(connection_string: &str) -> String {
    match connection_string.rsplit_once('@') {
        Some((_, host)) => format!("postgresql://***@{host}"),
        None => "postgresql://***".to_string(),
    }
}

/// `require` encrypts without verifying, `verify-ca` skips the host name
/// check and `verify-full` verifies both.
fn build_tls_connector(ssl_mode: &str) -> Result<MakeTlsConnector> {
    let mut builder = TlsConnector::builder();
    match ssl_mode {
        "require" => {
            builder
                .danger_accept_invalid_certs(true)
                .danger_accept_invalid_hostnames(true);
        }
        "verify-ca" => {
            builder.danger_accept_invalid_hostnames(true);
        }
        _ => {}
    }

    let connector = builder
        .build()
        .map_err(|e| HydroError::Configuration(format!("Failed to build TLS connector: {e}")))?;
    Ok(MakeTlsConnector::new(connector))
}
