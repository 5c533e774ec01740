//! [`ReportStore`] implementation over a pooled PostgreSQL client
//!
//! Each session takes one pooled connection, opens a transaction and keeps the
//! connection until commit or rollback. A session dropped while its
//! transaction is still open detaches its connection from the pool, so the
//! server aborts the transaction when the connection closes.

use super::client::PostgreSQLClient;
use crate::adapters::database::traits::{ReportSession, ReportStore, SqlParam};
use crate::domain::{HydroError, Result};
use async_trait::async_trait;
use deadpool_postgres::Object;
use std::sync::Arc;

/// PostgreSQL-backed report store
pub struct PostgreSQLAdapter {
    client: Arc<PostgreSQLClient>,
}

impl PostgreSQLAdapter {
    pub fn new(client: PostgreSQLClient) -> Self {
        Self {
            client: Arc::new(client),
        }
    }

    pub fn client(&self) -> &Arc<PostgreSQLClient> {
        &self.client
    }
}

#[async_trait]
impl ReportStore for PostgreSQLAdapter {
    async fn test_connection(&self) -> Result<()> {
        self.client.test_connection().await
    }

    async fn begin(&self) -> Result<Box<dyn ReportSession>> {
        let conn = self.client.get_connection().await?;

        conn.batch_execute("BEGIN")
            .await
            .map_err(|e| HydroError::Database(format!("Failed to begin transaction: {e}")))?;

        let timeout = format!(
            "SET LOCAL statement_timeout = {}",
            self.client.statement_timeout_ms()
        );
        if let Err(e) = conn.batch_execute(&timeout).await {
            let _ = conn.batch_execute("ROLLBACK").await;
            return Err(HydroError::Database(format!(
                "Failed to set statement timeout: {e}"
            )));
        }

        tracing::debug!(pool = ?self.client.pool_status(), "Report transaction started");
        Ok(Box::new(PgReportSession { conn: Some(conn) }))
    }

    fn describe(&self) -> String {
        self.client.connection_string_safe()
    }
}

/// One open transaction on a pooled connection
pub struct PgReportSession {
    conn: Option<Object>,
}

impl PgReportSession {
    fn conn(&self) -> Result<&Object> {
        self.conn
            .as_ref()
            .ok_or_else(|| HydroError::Database("Session already closed".to_string()))
    }

    async fn finish(mut self: Box<Self>, statement: &str) -> Result<()> {
        let conn = self
            .conn
            .take()
            .ok_or_else(|| HydroError::Database("Session already closed".to_string()))?;

        match conn.batch_execute(statement).await {
            Ok(()) => Ok(()),
            Err(e) => {
                // Never hand a connection in an unknown transaction state back to the pool
                drop(Object::take(conn));
                Err(HydroError::Database(format!("{statement} failed: {e}")))
            }
        }
    }
}

#[async_trait]
impl ReportSession for PgReportSession {
    async fn execute(&mut self, sql: &str, params: &[SqlParam<'_>]) -> Result<u64> {
        self.conn()?
            .execute(sql, params)
            .await
            .map_err(|e| HydroError::Database(e.to_string()))
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.finish("COMMIT").await
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        self.finish("ROLLBACK").await
    }
}

impl Drop for PgReportSession {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            tracing::warn!("Report session dropped with an open transaction; closing connection");
            drop(Object::take(conn));
        }
    }
}
