//! Store abstractions and factories
//!
//! The export core depends only on the traits defined here; the factory picks
//! the concrete PostgreSQL and FROST implementations from configuration.

pub mod factory;
pub mod traits;

pub use factory::{create_catalog, create_report_store};
pub use traits::{ReportSession, ReportStore, SqlParam};
