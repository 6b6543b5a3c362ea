//! Configuration schema definitions

use serde::{Deserialize, Serialize};

/// Root configuration schema
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ConfigSchema {
    #[serde(default)]
    pub lookup: LookupConfig,

    #[serde(default)]
    pub reproject: ReprojectConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// External projection definition service
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LookupConfig {
    /// Query the service for codes missing from the built-in table
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Service root; definitions are fetched from `{base_url}/{code}.proj4`
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Request timeout in seconds. Unset means the HTTP client default.
    #[serde(default)]
    pub timeout_secs: Option<u64>,

    /// User-Agent header sent with lookups
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: default_base_url(),
            timeout_secs: None,
            user_agent: default_user_agent(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_base_url() -> String {
    "https://epsg.io".to_string()
}

fn default_user_agent() -> String {
    concat!("bfgeo/", env!("CARGO_PKG_VERSION")).to_string()
}

/// Reprojection behaviour
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReprojectConfig {
    /// EPSG code every collection is transformed into
    #[serde(default = "default_target_crs")]
    pub target_crs: String,

    /// Report projected-looking data that has no determinable CRS
    #[serde(default = "default_true")]
    pub warn_on_projected_passthrough: bool,
}

impl Default for ReprojectConfig {
    fn default() -> Self {
        Self {
            target_crs: default_target_crs(),
            warn_on_projected_passthrough: true,
        }
    }
}

fn default_target_crs() -> String {
    "4326".to_string()
}

/// Log output
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Default level when `RUST_LOG` is unset
    #[serde(default = "default_level")]
    pub level: String,

    /// Emit JSON lines instead of the compact format
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            json: false,
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}
