//! Report store abstraction traits
//!
//! The relational exporter only needs a transactional session that runs
//! parameterised statements. Keeping that behind a trait lets the exporter's
//! step sequencing and rollback behaviour be tested without PostgreSQL.

use crate::domain::Result;
use async_trait::async_trait;
use tokio_postgres::types::ToSql;

/// Statement parameter, as accepted by `tokio-postgres`
pub type SqlParam<'a> = &'a (dyn ToSql + Sync);

/// Source of transactional sessions against the report tables
#[async_trait]
pub trait ReportStore: Send + Sync {
    /// Test the database connection
    ///
    /// # Errors
    ///
    /// Returns an error if the connection test fails.
    async fn test_connection(&self) -> Result<()>;

    /// Opens a session with a transaction already started
    ///
    /// The session is exclusively owned by the caller until it is committed
    /// or rolled back.
    ///
    /// # Errors
    ///
    /// Returns an error if no connection is available or `BEGIN` fails.
    async fn begin(&self) -> Result<Box<dyn ReportSession>>;

    /// Human-readable target description, credentials redacted
    fn describe(&self) -> String;
}

/// One open transaction
#[async_trait]
pub trait ReportSession: Send {
    /// Executes a statement and returns the number of affected rows
    ///
    /// # Errors
    ///
    /// Returns an error if the statement fails. The transaction is then
    /// unusable and must be rolled back.
    async fn execute(&mut self, sql: &str, params: &[SqlParam<'_>]) -> Result<u64>;

    /// Commits the transaction
    async fn commit(self: Box<Self>) -> Result<()>;

    /// Rolls the transaction back
    async fn rollback(self: Box<Self>) -> Result<()>;
}
