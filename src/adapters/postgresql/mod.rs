//! PostgreSQL report database integration

pub mod adapter;
pub mod client;

pub use adapter::{PgReportSession, PostgreSQLAdapter};
pub use client::PostgreSQLClient;
