//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::{Environment, FrostConfig, HydrosyncConfig, PostgreSQLConfig};
use super::secret::secret_string;
use crate::core::export::ExportTarget;
use crate::domain::{HydroError, Result};
use regex::Regex;
use std::fs;
use std::path::Path;

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (`${VAR}` syntax)
/// 3. Parses the TOML into [`HydrosyncConfig`]
/// 4. Applies environment variable overrides (`HYDROSYNC_*` prefix)
/// 5. Validates the configuration
///
/// # Errors
///
/// Returns a configuration error if the file cannot be read or parsed, a
/// referenced variable is unset, an override is malformed or validation fails.
///
/// # Examples
///
/// ```no_run
/// use hydrosync::config::load_config;
///
/// let config = load_config("hydrosync.toml").expect("Failed to load config");
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<HydrosyncConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(HydroError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        HydroError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    let contents = substitute_env_vars(&contents)?;

    let mut config: HydrosyncConfig = toml::from_str(&contents)
        .map_err(|e| HydroError::Configuration(format!("Failed to parse TOML: {e}")))?;

    apply_env_overrides(&mut config)?;

    config.validate().map_err(|e| {
        HydroError::Configuration(format!("Configuration validation failed: {e}"))
    })?;

    Ok(config)
}

/// Substitutes environment variables written as `${VAR_NAME}`
///
/// Comment lines are left untouched. All missing variables are reported at once.
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")
        .map_err(|e| HydroError::Configuration(format!("Invalid substitution pattern: {e}")))?;
    let mut result = String::with_capacity(input.len());
    let mut missing_vars: Vec<String> = Vec::new();

    for line in input.lines() {
        if line.trim_start().starts_with('#') {
            result.push_str(line);
            result.push('\n');
            continue;
        }

        let mut processed_line = line.to_string();
        for cap in re.captures_iter(line) {
            let var_name = &cap[1];
            match std::env::var(var_name) {
                Ok(value) => {
                    processed_line = processed_line.replace(&format!("${{{var_name}}}"), &value);
                }
                Err(_) => {
                    if !missing_vars.iter().any(|v| v == var_name) {
                        missing_vars.push(var_name.to_string());
                    }
                }
            }
        }
        result.push_str(&processed_line);
        result.push('\n');
    }

    if !missing_vars.is_empty() {
        return Err(HydroError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(result)
}

fn env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value.parse().map_err(|_| {
        HydroError::Configuration(format!("Invalid value '{value}' for {name}"))
    })
}

/// Applies `HYDROSYNC_<SECTION>_<KEY>` environment overrides
///
/// `HYDROSYNC_POSTGRESQL_CONNECTION_STRING` and `HYDROSYNC_FROST_BASE_URL`
/// create their section when the file omits it.
fn apply_env_overrides(config: &mut HydrosyncConfig) -> Result<()> {
    // Application
    if let Some(val) = env("HYDROSYNC_APPLICATION_LOG_LEVEL") {
        config.application.log_level = val;
    }
    if let Some(val) = env("HYDROSYNC_APPLICATION_DRY_RUN") {
        config.application.dry_run = parse_env("HYDROSYNC_APPLICATION_DRY_RUN", &val)?;
    }
    if let Some(val) = env("HYDROSYNC_ENVIRONMENT") {
        config.environment = match val.to_lowercase().as_str() {
            "development" => Environment::Development,
            "staging" => Environment::Staging,
            "production" => Environment::Production,
            _ => {
                return Err(HydroError::Configuration(format!(
                    "Invalid value '{val}' for HYDROSYNC_ENVIRONMENT"
                )))
            }
        };
    }

    // Input
    if let Some(val) = env("HYDROSYNC_INPUT_TOPOLOGY_PATH") {
        config.input.topology_path = Some(val);
    }
    if let Some(val) = env("HYDROSYNC_INPUT_RESULTS_PATH") {
        config.input.results_path = Some(val);
    }

    // Export
    if let Some(val) = env("HYDROSYNC_EXPORT_TARGET") {
        config.export.target = val
            .parse::<ExportTarget>()
            .map_err(HydroError::Configuration)?;
    }
    if let Some(val) = env("HYDROSYNC_EXPORT_RESULT_ID") {
        config.export.result_id = Some(val);
    }
    if let Some(val) = env("HYDROSYNC_EXPORT_ROUND_DECIMALS") {
        config.export.round_decimals = parse_env("HYDROSYNC_EXPORT_ROUND_DECIMALS", &val)?;
    }
    if let Some(val) = env("HYDROSYNC_EXPORT_BATCH_SIZE") {
        config.export.batch_size = parse_env("HYDROSYNC_EXPORT_BATCH_SIZE", &val)?;
    }
    if let Some(val) = env("HYDROSYNC_EXPORT_MAX_WORKERS") {
        config.export.max_workers = parse_env("HYDROSYNC_EXPORT_MAX_WORKERS", &val)?;
    }
    if let Some(val) = env("HYDROSYNC_EXPORT_CRS_FROM") {
        config.export.crs_from = parse_env("HYDROSYNC_EXPORT_CRS_FROM", &val)?;
    }
    if let Some(val) = env("HYDROSYNC_EXPORT_CRS_TO") {
        config.export.crs_to = parse_env("HYDROSYNC_EXPORT_CRS_TO", &val)?;
    }
    if let Some(val) = env("HYDROSYNC_EXPORT_START_TIME") {
        config.export.start_time = Some(val);
    }
    if let Some(val) = env("HYDROSYNC_EXPORT_FAIL_ON_PARTIAL_BATCH") {
        config.export.fail_on_partial_batch =
            parse_env("HYDROSYNC_EXPORT_FAIL_ON_PARTIAL_BATCH", &val)?;
    }

    // PostgreSQL
    if let Some(val) = env("HYDROSYNC_POSTGRESQL_CONNECTION_STRING") {
        match config.postgresql {
            Some(ref mut pg) => pg.connection_string = secret_string(val),
            None => {
                config.postgresql = Some(PostgreSQLConfig {
                    connection_string: secret_string(val),
                    max_connections: 10,
                    connection_timeout_seconds: 30,
                    statement_timeout_seconds: 60,
                    ssl_mode: "prefer".to_string(),
                })
            }
        }
    }
    if let Some(ref mut pg) = config.postgresql {
        if let Some(val) = env("HYDROSYNC_POSTGRESQL_MAX_CONNECTIONS") {
            pg.max_connections = parse_env("HYDROSYNC_POSTGRESQL_MAX_CONNECTIONS", &val)?;
        }
        if let Some(val) = env("HYDROSYNC_POSTGRESQL_SSL_MODE") {
            pg.ssl_mode = val;
        }
        if let Some(val) = env("HYDROSYNC_POSTGRESQL_STATEMENT_TIMEOUT_SECONDS") {
            pg.statement_timeout_seconds =
                parse_env("HYDROSYNC_POSTGRESQL_STATEMENT_TIMEOUT_SECONDS", &val)?;
        }
    }

    // FROST
    if let Some(val) = env("HYDROSYNC_FROST_BASE_URL") {
        config
            .frost
            .get_or_insert_with(FrostConfig::default)
            .base_url = val;
    }
    if let Some(ref mut frost) = config.frost {
        if let Some(val) = env("HYDROSYNC_FROST_USERNAME") {
            frost.username = Some(val);
        }
        if let Some(val) = env("HYDROSYNC_FROST_PASSWORD") {
            frost.password = Some(secret_string(val));
        }
        if let Some(val) = env("HYDROSYNC_FROST_TLS_VERIFY") {
            frost.tls_verify = parse_env("HYDROSYNC_FROST_TLS_VERIFY", &val)?;
        }
        if let Some(val) = env("HYDROSYNC_FROST_TIMEOUT_SECONDS") {
            frost.timeout_seconds = parse_env("HYDROSYNC_FROST_TIMEOUT_SECONDS", &val)?;
        }
    }

    // Logging
    if let Some(val) = env("HYDROSYNC_LOGGING_LOCAL_ENABLED") {
        config.logging.local_enabled = parse_env("HYDROSYNC_LOGGING_LOCAL_ENABLED", &val)?;
    }
    if let Some(val) = env("HYDROSYNC_LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }
    if let Some(val) = env("HYDROSYNC_LOGGING_LOCAL_ROTATION") {
        config.logging.local_rotation = val;
    }

    Ok(())
}
