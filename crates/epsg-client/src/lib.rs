//! Client for the epsg.io projection definition service
//!
//! Fetches proj4 definitions for EPSG codes the resolver does not know
//! locally. [`EpsgClient`] implements [`bfgeo_geo::DefinitionLookup`], so it
//! plugs straight into a [`bfgeo_geo::Resolver`].
//!
//! # Example
//!
//! ```rust,no_run
//! use bfgeo_epsg_client::{ClientConfig, EpsgClient};
//! use bfgeo_geo::Resolver;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = EpsgClient::with_config(ClientConfig::from_env()?)?;
//!
//!     let definition = client.lookup("26918").await?;
//!     println!("{definition}");
//!
//!     let resolver = Resolver::new(client);
//!     assert!(resolver.resolve("26918").await.is_some());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod client;
pub mod config;
pub mod error;

pub use client::EpsgClient;
pub use config::ClientConfig;
pub use error::{ApiError, ApiResult};
