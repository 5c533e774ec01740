//! FROST SensorThings HTTP client
//!
//! Collections are read page by page following `@iot.nextLink`. Reads go
//! through [`FrostClient::retry_request`], which retries transient failures
//! (connection errors, timeouts, 5xx, 429) with exponential backoff and
//! jitter. Creates and `$batch` submissions are sent once; their failures are
//! accounted per batch by the caller. Client errors are returned immediately.

use super::batch::{decode_batch, encode_batch};
use super::models::{
    BatchOperation, CreatedEntry, EntityId, NamedEntry, OperationOutcome, Page, RemoteThing,
    SensorDraft, ThingEntry,
};
use super::traits::ObservationCatalog;
use crate::config::FrostConfig;
use crate::core::engine::VariableSpec;
use crate::domain::{FrostError, HydroError, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use rand::Rng;
use regex::Regex;
use reqwest::header::{AUTHORIZATION, LOCATION};
use reqwest::{Client, ClientBuilder, Method, Response, StatusCode};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Duration;
use url::Url;

const THINGS_QUERY: &str = "Things?$expand=Locations($select=location)&$select=id,name,properties";
const OBSERVED_PROPERTIES_QUERY: &str = "ObservedProperties?$select=id,name";

/// SensorThings client for one FROST service root
///
/// # Example
///
/// ```no_run
/// use hydrosync::adapters::frost::{FrostClient, ObservationCatalog};
/// use hydrosync::config::FrostConfig;
///
/// # async fn example() -> hydrosync::domain::Result<()> {
/// let client = FrostClient::new(&FrostConfig::default())?;
/// client.test_connection().await?;
/// let things = client.fetch_things().await?;
/// println!("{} things on the server", things.len());
/// # Ok(())
/// # }
/// ```
pub struct FrostClient {
    base_url: Url,
    client: Client,
    config: FrostConfig,
    location_id: Regex,
}

impl FrostClient {
    /// Builds a client for `config.base_url`
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the URL is invalid or the HTTP client
    /// cannot be built.
    pub fn new(config: &FrostConfig) -> Result<Self> {
        // A trailing slash makes `Url::join` append instead of replacing the
        // last path segment.
        let mut root = config.base_url.trim_end_matches('/').to_string();
        root.push('/');
        let base_url = Url::parse(&root).map_err(|e| {
            HydroError::Configuration(format!("Invalid FROST base URL '{}': {e}", config.base_url))
        })?;

        let mut client_builder = ClientBuilder::new()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .connect_timeout(Duration::from_secs(30));

        if !config.tls_verify {
            tracing::warn!(base_url = %base_url, "TLS certificate verification disabled");
            client_builder = client_builder.danger_accept_invalid_certs(true);
        }

        let client = client_builder.build().map_err(|e| {
            HydroError::Configuration(format!("Failed to build HTTP client: {e}"))
        })?;

        let location_id = Regex::new(r"\(([^)]+)\)$")
            .map_err(|e| HydroError::Configuration(format!("Invalid id pattern: {e}")))?;

        Ok(Self {
            base_url,
            client,
            config: config.clone(),
            location_id,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, path: &str) -> Result<Url> {
        self.base_url.join(path).map_err(|e| {
            HydroError::Configuration(format!("Cannot build URL for '{path}': {e}"))
        })
    }

    fn auth_header_value(&self) -> Option<String> {
        match (&self.config.username, &self.config.password) {
            (Some(username), Some(password)) => {
                let credentials = format!("{username}:{}", password.expose_secret().as_str());
                let encoded = general_purpose::STANDARD.encode(credentials.as_bytes());
                Some(format!("Basic {encoded}"))
            }
            _ => None,
        }
    }

    /// Backoff before retry `attempt` (1-based), with up to 25% jitter
    fn backoff_delay(&self, attempt: usize) -> Duration {
        let retry = &self.config.retry;
        let base = retry.initial_delay_ms as f64 * retry.backoff_multiplier.powi(attempt as i32 - 1);
        let capped = base.min(retry.max_delay_ms as f64);
        let jitter = rand::thread_rng().gen_range(0.0..=capped * 0.25);
        Duration::from_millis((capped + jitter).min(retry.max_delay_ms as f64) as u64)
    }

    /// Retry a request with exponential backoff
    async fn retry_request<F, T, Fut>(&self, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let max_retries = self.config.retry.max_retries;
        let mut attempt = 0;

        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    attempt += 1;
                    if attempt >= max_retries || !e.is_transient() {
                        return Err(e);
                    }

                    let delay = self.backoff_delay(attempt);
                    crate::log_retry_attempt!(attempt, max_retries, e);
                    tracing::debug!(delay_ms = delay.as_millis() as u64, "Backing off");

                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    /// Sends one request, retrying only reads
    ///
    /// Mutations are sent once: a create that timed out may already be
    /// committed, and resending it would duplicate entities.
    async fn send(&self, method: Method, url: &Url, body: Option<&Value>) -> Result<Response> {
        if method == Method::GET {
            self.retry_request(|| self.send_once(method.clone(), url, body))
                .await
        } else {
            self.send_once(method, url, body).await
        }
    }

    /// Single attempt, mapping transport errors and non-success statuses
    async fn send_once(&self, method: Method, url: &Url, body: Option<&Value>) -> Result<Response> {
        let mut request = self.client.request(method, url.clone());

        if let Some(auth) = self.auth_header_value() {
            request = request.header(AUTHORIZATION, auth);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let resp = request.send().await.map_err(|e| {
            if e.is_timeout() {
                FrostError::Timeout(e.to_string())
            } else {
                FrostError::ConnectionFailed(e.to_string())
            }
        })?;

        check_status(resp).await
    }

    async fn read_json<T: DeserializeOwned>(resp: Response) -> Result<T> {
        resp.json::<T>()
            .await
            .map_err(|e| FrostError::InvalidResponse(e.to_string()).into())
    }

    /// Reads every page of a collection query
    async fn get_collection<T: DeserializeOwned>(&self, query: &str) -> Result<Vec<T>> {
        let separator = if query.contains('?') { '&' } else { '?' };
        let mut next = Some(self.url(&format!(
            "{query}{separator}$top={}",
            self.config.page_size
        ))?);
        let mut items = Vec::new();
        let mut pages = 0usize;

        while let Some(url) = next.take() {
            let resp = self.send(Method::GET, &url, None).await?;
            let page: Page<T> = Self::read_json(resp).await?;
            pages += 1;
            items.extend(page.value);

            next = match page.next_link {
                Some(link) => Some(Url::parse(&link).or_else(|_| self.url(&link)).map_err(
                    |_| FrostError::InvalidResponse(format!("Invalid @iot.nextLink '{link}'")),
                )?),
                None => None,
            };
        }

        tracing::debug!(query = %query, pages = pages, count = items.len(), "Fetched collection");
        Ok(items)
    }

    /// Creates an entity and returns its id
    ///
    /// The id is taken from the `Location` header when present, otherwise
    /// from `@iot.id` in the response body.
    async fn create_entity(&self, collection: &str, body: &Value) -> Result<EntityId> {
        let url = self.url(collection)?;
        let resp = self.send(Method::POST, &url, Some(body)).await?;

        let from_header = resp
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|location| self.id_from_location(location));
        if let Some(id) = from_header {
            return Ok(id);
        }

        let created: CreatedEntry = Self::read_json(resp).await?;
        Ok(created.id)
    }

    fn id_from_location(&self, location: &str) -> Option<EntityId> {
        self.location_id
            .captures(location)
            .map(|cap| EntityId::from_key(&cap[1]))
    }
}

async fn check_status(resp: Response) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let body = resp.text().await.unwrap_or_default();
    let err = match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            FrostError::AuthenticationFailed(format!("{status}: {body}"))
        }
        StatusCode::TOO_MANY_REQUESTS => FrostError::RateLimited(body),
        s if s.is_server_error() => FrostError::ServerError {
            status: s.as_u16(),
            message: body,
        },
        s => FrostError::ClientError {
            status: s.as_u16(),
            message: body,
        },
    };
    Err(err.into())
}

#[async_trait]
impl ObservationCatalog for FrostClient {
    async fn test_connection(&self) -> Result<()> {
        self.send(Method::GET, &self.base_url, None).await?;
        tracing::debug!(base_url = %self.base_url, "FROST connection test successful");
        Ok(())
    }

    async fn fetch_things(&self) -> Result<HashMap<String, RemoteThing>> {
        let entries: Vec<ThingEntry> = self.get_collection(THINGS_QUERY).await?;
        Ok(entries
            .into_iter()
            .map(RemoteThing::from)
            .map(|thing| (thing.name.clone(), thing))
            .collect())
    }

    async fn fetch_observed_properties(&self) -> Result<HashMap<String, EntityId>> {
        let entries: Vec<NamedEntry> = self.get_collection(OBSERVED_PROPERTIES_QUERY).await?;
        Ok(entries.into_iter().map(|e| (e.name, e.id)).collect())
    }

    async fn create_observed_property(&self, variable: &VariableSpec) -> Result<EntityId> {
        let body = json!({
            "name": variable.name,
            "definition": variable.definition,
            "description": variable.description,
        });
        let id = self.create_entity("ObservedProperties", &body).await?;
        tracing::info!(name = variable.name, id = %id, "Created observed property");
        Ok(id)
    }

    async fn create_sensor(&self, sensor: &SensorDraft) -> Result<EntityId> {
        let body = serde_json::to_value(sensor)?;
        let id = self.create_entity("Sensors", &body).await?;
        tracing::info!(name = %sensor.name, id = %id, "Created sensor");
        Ok(id)
    }

    async fn submit_batch(&self, operations: Vec<BatchOperation>) -> Result<Vec<OperationOutcome>> {
        let url = self.url("$batch")?;
        let body = encode_batch(&operations);
        let resp = self.send(Method::POST, &url, Some(&body)).await?;
        let answer: Value = Self::read_json(resp).await?;
        decode_batch(answer, &operations)
    }

    fn describe(&self) -> String {
        self.base_url.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{secret_string, RetryConfig};

    fn config(base_url: &str) -> FrostConfig {
        FrostConfig {
            base_url: base_url.to_string(),
            retry: RetryConfig {
                max_retries: 3,
                initial_delay_ms: 100,
                max_delay_ms: 1000,
                backoff_multiplier: 2.0,
            },
            ..FrostConfig::default()
        }
    }

    #[test]
    fn test_base_url_gets_trailing_slash() {
        let client = FrostClient::new(&config("http://localhost:8080/FROST-Server/v1.1")).unwrap();
        assert_eq!(
            client.url("Things").unwrap().as_str(),
            "http://localhost:8080/FROST-Server/v1.1/Things"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(FrostClient::new(&config("not a url")).is_err());
    }

    #[test]
    fn test_auth_header_requires_both_credentials() {
        let mut cfg = config("http://localhost:8080/v1.1");
        cfg.username = Some("user".to_string());
        let client = FrostClient::new(&cfg).unwrap();
        assert!(client.auth_header_value().is_none());

        cfg.password = Some(secret_string("pass".to_string()));
        let client = FrostClient::new(&cfg).unwrap();
        // base64("user:pass")
        assert_eq!(client.auth_header_value().unwrap(), "Basic dXNlcjpwYXNz");
    }

    #[test]
    fn test_id_from_location_header() {
        let client = FrostClient::new(&config("http://localhost:8080/v1.1")).unwrap();
        assert_eq!(
            client.id_from_location("http://localhost:8080/v1.1/Sensors(12)"),
            Some(EntityId::from(12))
        );
        assert_eq!(
            client.id_from_location("http://localhost:8080/v1.1/Sensors('abc')"),
            Some(EntityId::from("abc"))
        );
        assert_eq!(client.id_from_location("http://localhost:8080/v1.1/Sensors"), None);
    }

    #[test]
    fn test_backoff_delay_is_capped() {
        let client = FrostClient::new(&config("http://localhost:8080/v1.1")).unwrap();
        let first = client.backoff_delay(1);
        assert!(first >= Duration::from_millis(100) && first <= Duration::from_millis(125));
        assert_eq!(client.backoff_delay(10), Duration::from_millis(1000));
    }
}
