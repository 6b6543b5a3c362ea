//! Core utilities shared by the bfgeo crates and binaries
//!
//! - **Error handling**: errors with codes, context, and recovery suggestions
//! - **Configuration**: TOML-based configuration with validation
//!
//! # Example
//!
//! ```rust,no_run
//! use bfgeo_core::config::Config;
//!
//! let config = Config::load(None).expect("invalid configuration");
//! if !config.schema.lookup.enabled {
//!     eprintln!("Definition lookups are disabled");
//! }
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;

pub use error::{exit_codes, Error, ErrorCode, ErrorReport, Result, ResultExt};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::{Config, ConfigSchema, LoggingConfig, LookupConfig, ReprojectConfig};
    pub use crate::error::{exit_codes, Error, ErrorCode, Result, ResultExt};
}
