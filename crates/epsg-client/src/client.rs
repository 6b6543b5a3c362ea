//! epsg.io definition client

use crate::config::ClientConfig;
use crate::error::{ApiError, ApiResult};
use bfgeo_geo::DefinitionLookup;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::{Client, Response};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

/// Request correlation ID header
const X_REQUEST_ID: &str = "X-Request-ID";

/// Client for the authoritative projection definition service.
///
/// One GET per call, no retry and no backoff. Cloning is cheap and shares
/// the connection pool.
#[derive(Debug, Clone)]
pub struct EpsgClient {
    inner: Client,
    config: Arc<ClientConfig>,
}

impl EpsgClient {
    /// Create a new client with configuration from environment
    pub fn new() -> ApiResult<Self> {
        Self::with_config(ClientConfig::from_env()?)
    }

    /// Create a new client with specific configuration
    pub fn with_config(config: ClientConfig) -> ApiResult<Self> {
        config.validate()?;

        let mut default_headers = HeaderMap::new();
        default_headers.insert(ACCEPT, HeaderValue::from_static("text/plain"));
        match HeaderValue::from_str(&config.user_agent) {
            Ok(value) => {
                default_headers.insert(USER_AGENT, value);
            }
            Err(_) => warn!(user_agent = %config.user_agent, "Ignoring invalid User-Agent"),
        }

        let mut builder = Client::builder().default_headers(default_headers);
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let inner = builder.build().map_err(ApiError::Request)?;

        Ok(Self {
            inner,
            config: Arc::new(config),
        })
    }

    /// Get the current configuration
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Fetch the raw proj4 definition for an EPSG code.
    ///
    /// Non-success statuses and blank bodies are errors.
    #[instrument(skip(self), fields(request_id))]
    pub async fn lookup(&self, code: &str) -> ApiResult<String> {
        validate_code(code)?;

        let url = self.config.definition_url(code);
        let request_id = Uuid::new_v4().to_string();
        tracing::Span::current().record("request_id", request_id.as_str());

        let start = Instant::now();
        let response = self
            .inner
            .get(&url)
            .header(X_REQUEST_ID, &request_id)
            .send()
            .await
            .inspect_err(|e| debug!(url = %url, error = %e, "Definition request failed"))?;

        let definition = handle_response(code, response).await?;
        debug!(
            url = %url,
            elapsed_ms = start.elapsed().as_millis(),
            "Fetched projection definition"
        );
        Ok(definition)
    }
}

impl DefinitionLookup for EpsgClient {
    async fn fetch(&self, code: &str) -> bfgeo_geo::Result<String> {
        self.lookup(code).await.map_err(|e| e.into_geo_error(code))
    }
}

/// Codes become a path segment, so only plain identifiers are allowed.
fn validate_code(code: &str) -> ApiResult<()> {
    let valid = !code.is_empty()
        && code
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(ApiError::InvalidCode(code.to_string()))
    }
}

async fn handle_response(code: &str, response: Response) -> ApiResult<String> {
    let status = response.status();

    if !status.is_success() {
        let message = response
            .text()
            .await
            .ok()
            .map(|body| body.trim().to_string())
            .filter(|body| !body.is_empty())
            .or_else(|| status.canonical_reason().map(String::from))
            .unwrap_or_else(|| "Unknown error".to_string());
        return Err(ApiError::api_response(status.as_u16(), message));
    }

    let body = response.text().await?;
    let definition = body.trim();
    if definition.is_empty() {
        return Err(ApiError::EmptyDefinition(code.to_string()));
    }

    Ok(definition.to_string())
}
