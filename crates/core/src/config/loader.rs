//! Configuration file loading

use super::schema::ConfigSchema;
use crate::error::{Error, ErrorCode, Result};
use std::path::{Path, PathBuf};

/// Candidate file names, checked in order relative to the working directory
const CANDIDATES: &[&str] = &[".bfgeo.toml", "bfgeo.toml", ".config/bfgeo.toml"];

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error", "off"];

/// Configuration wrapper
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub schema: ConfigSchema,
    pub path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from an explicit path, or the first standard
    /// location that exists, or defaults.
    ///
    /// An explicit path that does not exist is an error; a missing standard
    /// file is not.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                if !path.exists() {
                    return Err(Error::config_not_found(path));
                }
                Self::from_file(path)
            }
            None => match find_config_file(Path::new(".")) {
                Some(found) => Self::from_file(&found),
                None => Ok(Self::default()),
            },
        }
    }

    /// Load and validate one file
    pub fn from_file(path: &Path) -> Result<Self> {
        let schema = load_config_file(path)?;
        validate(&schema).map_err(|e| e.with_context(format!("In {}", path.display())))?;

        Ok(Self {
            schema,
            path: Some(path.to_path_buf()),
        })
    }
}

/// Find configuration file in standard locations under `root`
pub fn find_config_file(root: &Path) -> Option<PathBuf> {
    CANDIDATES
        .iter()
        .map(|candidate| root.join(candidate))
        .find(|candidate| candidate.is_file())
}

/// Load and parse a TOML configuration file
fn load_config_file(path: &Path) -> Result<ConfigSchema> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::from(e).with_context(format!("Failed to read config file {}", path.display()))
    })?;

    toml::from_str(&content).map_err(|e| {
        Error::from(e).with_context(format!("Failed to parse config file {}", path.display()))
    })
}

fn validate(schema: &ConfigSchema) -> Result<()> {
    let lookup = &schema.lookup;
    if lookup.enabled
        && !lookup.base_url.starts_with("http://")
        && !lookup.base_url.starts_with("https://")
    {
        return Err(invalid("lookup.base_url must start with http:// or https://"));
    }

    if lookup.timeout_secs == Some(0) {
        return Err(invalid("lookup.timeout_secs cannot be zero"));
    }

    if schema.reproject.target_crs.trim().is_empty() {
        return Err(invalid("reproject.target_crs cannot be empty"));
    }

    if !LOG_LEVELS.contains(&schema.logging.level.to_lowercase().as_str()) {
        return Err(invalid(format!(
            "logging.level must be one of {}",
            LOG_LEVELS.join(", ")
        )));
    }

    Ok(())
}

fn invalid(message: impl Into<String>) -> Error {
    Error::new(ErrorCode::ConfigValidationError, message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert!(config.path.is_none());
        assert!(config.schema.lookup.enabled);
        assert_eq!(config.schema.lookup.base_url, "https://epsg.io");
        assert_eq!(config.schema.reproject.target_crs, "4326");
        assert_eq!(config.schema.logging.level, "info");
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bfgeo.toml");
        fs::write(
            &path,
            r#"
[lookup]
enabled = false
timeout_secs = 5

[logging]
json = true
"#,
        )
        .unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.path.as_deref(), Some(path.as_path()));
        assert!(!config.schema.lookup.enabled);
        assert_eq!(config.schema.lookup.timeout_secs, Some(5));
        // Untouched sections keep their defaults
        assert_eq!(config.schema.lookup.base_url, "https://epsg.io");
        assert!(config.schema.reproject.warn_on_projected_passthrough);
        assert!(config.schema.logging.json);
    }

    #[test]
    fn test_missing_explicit_file() {
        let dir = TempDir::new().unwrap();
        let err = Config::load(Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigNotFound);
    }

    #[test]
    fn test_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bfgeo.toml");
        fs::write(&path, "[lookup\nenabled = ").unwrap();

        let err = Config::load(Some(&path)).unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigParseError);
    }

    #[test]
    fn test_validation_errors() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bfgeo.toml");

        for bad in [
            "[lookup]\nbase_url = \"ftp://epsg.io\"",
            "[lookup]\ntimeout_secs = 0",
            "[reproject]\ntarget_crs = \" \"",
            "[logging]\nlevel = \"loud\"",
        ] {
            fs::write(&path, bad).unwrap();
            let err = Config::load(Some(&path)).unwrap_err();
            assert_eq!(err.code, ErrorCode::ConfigValidationError, "{bad}");
        }
    }

    #[test]
    fn test_find_config_file_order() {
        let dir = TempDir::new().unwrap();
        assert!(find_config_file(dir.path()).is_none());

        fs::create_dir(dir.path().join(".config")).unwrap();
        fs::write(dir.path().join(".config/bfgeo.toml"), "").unwrap();
        assert_eq!(
            find_config_file(dir.path()),
            Some(dir.path().join(".config/bfgeo.toml"))
        );

        fs::write(dir.path().join("bfgeo.toml"), "").unwrap();
        assert_eq!(find_config_file(dir.path()), Some(dir.path().join("bfgeo.toml")));

        fs::write(dir.path().join(".bfgeo.toml"), "").unwrap();
        assert_eq!(find_config_file(dir.path()), Some(dir.path().join(".bfgeo.toml")));
    }
}
