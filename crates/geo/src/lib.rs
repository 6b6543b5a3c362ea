//! CRS identification and reprojection of GeoJSON feature collections.
//!
//! This crate provides:
//! - Projection definition resolution (cache, well-known table, external lookup)
//! - Exact coordinate transforms via `proj4rs`, with magnitude-based fallbacks
//! - Shape-preserving geometry transforms
//! - CRS identification from `crs` tags or sample coordinates
//! - Whole-collection reprojection into WGS84
//!
//! # Example
//!
//! ```
//! use bfgeo_geo::{Reprojector, Resolver, Transformer};
//! use geojson::{Feature, FeatureCollection, Geometry, Value};
//!
//! # tokio_test::block_on(async {
//! let collection = FeatureCollection {
//!     bbox: None,
//!     features: vec![Feature {
//!         geometry: Some(Geometry::new(Value::Point(vec![573729.31, 4957893.41]))),
//!         ..Default::default()
//!     }],
//!     foreign_members: None,
//! };
//!
//! let reprojector = Reprojector::new(Transformer::new(Resolver::offline()));
//! let (wgs84, report) = reprojector.reproject_collection(collection).await;
//!
//! assert!(report.transformed);
//! assert_eq!(report.source_crs.as_deref(), Some("6346"));
//! # let _ = wgs84;
//! # });
//! ```

mod cache;
mod definition;
mod error;
mod geometry;
mod identify;
mod pipeline;
mod resolver;
mod transform;

pub use cache::DefinitionCache;
pub use definition::{
    well_known, well_known_codes, ProjectionDefinition, WEB_MERCATOR, WGS84, WGS84_DEFINITION,
};
pub use error::{GeoError, GeoErrorCode, Result};
pub use geometry::TransformReport;
pub use identify::{
    crs_member, crs_tag, detect_crs_from_coordinates, extract_crs_code, sample_coordinates,
    URN_PREFIX,
};
pub use pipeline::{
    identify_collection, CrsIdentification, CrsSource, Diagnostic, ReprojectionReport, Reprojector,
};
pub use resolver::{DefinitionLookup, Offline, Resolution, ResolutionSource, Resolver};
pub use transform::{
    fallback_transform, Coordinate, FallbackKind, ProjectionPlan, TransformOutcome, Transformer,
};
