//! Configuration for the definition service client
//!
//! Supports environment-based configuration with sensible defaults.

use crate::error::{ApiError, ApiResult};
use bfgeo_core::config::LookupConfig;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Default service root
pub const DEFAULT_BASE_URL: &str = "https://epsg.io";

/// Environment variable overriding the service root
pub const ENV_BASE_URL: &str = "BFGEO_EPSG_URL";

/// Environment variable setting the request timeout in seconds
pub const ENV_TIMEOUT_SECS: &str = "BFGEO_LOOKUP_TIMEOUT_SECS";

/// Client configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Service root; definitions live at `{base_url}/{code}.proj4`
    pub base_url: String,
    /// Request timeout. `None` leaves the HTTP client default in place.
    #[serde(default, with = "optional_secs")]
    pub timeout: Option<Duration>,
    /// User-Agent header value
    pub user_agent: String,
}

mod optional_secs {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(
        duration: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        duration.map(|d| d.as_secs()).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_secs))
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: None,
            user_agent: concat!("bfgeo-epsg-client/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl From<&LookupConfig> for ClientConfig {
    fn from(lookup: &LookupConfig) -> Self {
        Self {
            base_url: lookup.base_url.clone(),
            timeout: lookup.timeout_secs.map(Duration::from_secs),
            user_agent: lookup.user_agent.clone(),
        }
    }
}

impl ClientConfig {
    /// Create configuration from environment variables
    ///
    /// Reads the following environment variables:
    /// - `BFGEO_EPSG_URL`: service root
    /// - `BFGEO_LOOKUP_TIMEOUT_SECS`: request timeout in seconds
    pub fn from_env() -> ApiResult<Self> {
        Self::default().with_env_overrides()
    }

    /// Apply environment variables on top of this configuration
    pub fn with_env_overrides(mut self) -> ApiResult<Self> {
        if let Ok(url) = env::var(ENV_BASE_URL) {
            self.base_url = url;
        }

        if let Ok(secs) = env::var(ENV_TIMEOUT_SECS) {
            let secs: u64 = secs
                .trim()
                .parse()
                .map_err(|_| ApiError::config(format!("{ENV_TIMEOUT_SECS} must be a whole number of seconds")))?;
            self.timeout = Some(Duration::from_secs(secs));
        }

        self.validate()?;
        Ok(self)
    }

    /// Builder-style method to set base URL
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Builder-style method to set timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Builder-style method to set the User-Agent
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// URL of the proj4 definition for `code`
    pub fn definition_url(&self, code: &str) -> String {
        format!("{}/{}.proj4", self.base_url.trim_end_matches('/'), code)
    }

    /// Validate the configuration
    pub fn validate(&self) -> ApiResult<()> {
        if self.base_url.is_empty() {
            return Err(ApiError::config("base_url cannot be empty"));
        }

        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ApiError::config("base_url must start with http:// or https://"));
        }

        if self.timeout.is_some_and(|timeout| timeout.is_zero()) {
            return Err(ApiError::config("timeout cannot be zero"));
        }

        Ok(())
    }
}
