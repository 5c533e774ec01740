//! Configuration management for Hydrosync.
//!
//! Configuration is read from a TOML file (default `hydrosync.toml`, or the
//! path in `HYDROSYNC_CONFIG`), with `${VAR_NAME}` substitution, defaults for
//! optional settings, `HYDROSYNC_<SECTION>_<KEY>` overrides and validation.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use hydrosync::config::load_config;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("hydrosync.toml")?;
//! println!("Export target: {}", config.export.target);
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration Structure
//!
//! - [`ApplicationConfig`] - Log level and dry run
//! - [`InputConfig`] - Topology and result document paths
//! - [`ExportConfig`] - Target, rounding, batching and CRS settings
//! - [`PostgreSQLConfig`] - Report database connection
//! - [`FrostConfig`] - SensorThings server connection and retry policy
//! - [`LoggingConfig`] - Local log files
//!
//! # Example Configuration
//!
//! ```toml
//! environment = "production"
//!
//! [application]
//! log_level = "info"
//!
//! [input]
//! topology_path = "network.json"
//! results_path = "results.json"
//!
//! [export]
//! target = "frost"
//! batch_size = 50
//! max_workers = 4
//! crs_from = 25831
//!
//! [frost]
//! base_url = "https://frost.example.com/FROST-Server/v1.1"
//! username = "hydrosync"
//! password = "${FROST_PASSWORD}"
//! ```

pub mod loader;
pub mod schema;
pub mod secret;

pub use loader::load_config;
pub use schema::{
    ApplicationConfig, Environment, ExportConfig, FrostConfig, HydrosyncConfig, InputConfig,
    LoggingConfig, PostgreSQLConfig, RetryConfig,
};
pub use secret::{secret_string, secret_string_opt, SecretString, SecretValue};

/// Default configuration file name
pub const DEFAULT_CONFIG_FILE: &str = "hydrosync.toml";

/// Environment variable naming an alternative configuration file
pub const CONFIG_PATH_ENV: &str = "HYDROSYNC_CONFIG";
