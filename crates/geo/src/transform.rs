//! Coordinate transformation between CRS definitions.
//!
//! The exact path composes the inverse of the source projection with the
//! forward target projection using `proj4rs`. When a definition cannot be
//! resolved, or the math rejects a coordinate, [`fallback_transform`]
//! produces a best-effort value from the coordinate magnitude alone.

use crate::definition::WGS84;
use crate::resolver::{DefinitionLookup, Resolver};
use crate::{GeoError, ProjectionDefinition, Result};
use proj4rs::Proj;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use tracing::{debug, warn};

/// Metres per degree used by the flat-earth approximations.
const METRES_PER_DEGREE: f64 = 111_320.0;

/// False easting of every UTM zone.
const UTM_FALSE_EASTING: f64 = 500_000.0;

/// Centre of the regional offset approximation, as (lng, lat, northing).
const REGIONAL_ORIGIN: (f64, f64, f64) = (-95.0, 45.0, 5_000_000.0);

/// A planar or geographic position with optional elevation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    /// Easting or longitude
    pub x: f64,
    /// Northing or latitude
    pub y: f64,
    /// Elevation, carried through untouched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z: Option<f64>,
}

impl Coordinate {
    /// Creates a 2D coordinate.
    #[inline]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y, z: None }
    }

    /// Creates a coordinate with elevation.
    #[inline]
    pub fn with_z(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z: Some(z) }
    }

    /// Read a GeoJSON position; `None` if it has fewer than two values.
    pub fn from_position(position: &[f64]) -> Option<Self> {
        match position {
            [x, y] => Some(Self::new(*x, *y)),
            [x, y, z, ..] => Some(Self::with_z(*x, *y, *z)),
            _ => None,
        }
    }

    /// Returns true if the values fit longitude/latitude ranges.
    #[inline]
    pub fn is_geographic(&self) -> bool {
        self.x.abs() <= 180.0 && self.y.abs() <= 90.0
    }

    #[inline]
    fn with_xy(self, (x, y): (f64, f64)) -> Self {
        Self { x, y, z: self.z }
    }
}

impl From<(f64, f64)> for Coordinate {
    fn from((x, y): (f64, f64)) -> Self {
        Self::new(x, y)
    }
}

/// Heuristic applied by [`fallback_transform`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackKind {
    /// Values were already within geographic bounds
    AlreadyGeographic,
    /// Flat-earth UTM inverse, zone guessed from the easting
    ApproximateUtm,
    /// Linear offset around a fixed North American reference point
    RegionalOffset,
    /// Nothing matched; the coordinate was returned unchanged
    Unrecognized,
}

/// How a coordinate ended up in the target CRS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "path", content = "heuristic")]
pub enum TransformOutcome {
    /// Projection math with resolved definitions
    Exact,
    /// Magnitude-based heuristic
    Fallback(FallbackKind),
}

/// Best-effort transform to WGS84 used when the exact path is unavailable.
///
/// The UTM and regional branches are **approximations** meant only to put
/// data roughly in the right place on a map; they are not geodetically
/// correct. The function is pure: equal input gives equal output.
///
/// # Example
/// ```
/// use bfgeo_geo::{fallback_transform, Coordinate, FallbackKind};
///
/// let (coord, kind) = fallback_transform(Coordinate::new(-79.4, 43.7), "9999");
/// assert_eq!(kind, FallbackKind::AlreadyGeographic);
/// assert_eq!(coord, Coordinate::new(-79.4, 43.7));
/// ```
pub fn fallback_transform(coord: Coordinate, from_crs: &str) -> (Coordinate, FallbackKind) {
    let Coordinate { x, y, .. } = coord;

    if coord.is_geographic() {
        return (coord, FallbackKind::AlreadyGeographic);
    }

    if x > 100_000.0 && y > 1_000_000.0 {
        let zone = ((x - 166_021.44) / 1_000_000.0).floor() + 31.0;
        let central_meridian = (zone - 1.0) * 6.0 - 180.0 + 3.0;
        let lng = central_meridian
            + (x - UTM_FALSE_EASTING) / (METRES_PER_DEGREE * (PI * y / 20_003_931.46).cos());
        let lat = y / METRES_PER_DEGREE;

        debug!(from_crs, x, y, lng, lat, "Fallback UTM approximation");
        return (coord.with_xy((lng, lat)), FallbackKind::ApproximateUtm);
    }

    if x > 100_000.0 && y > 100_000.0 {
        let (origin_lng, origin_lat, origin_northing) = REGIONAL_ORIGIN;
        let lng = origin_lng + (x - UTM_FALSE_EASTING) / METRES_PER_DEGREE;
        let lat = origin_lat + (y - origin_northing) / METRES_PER_DEGREE;

        debug!(from_crs, x, y, lng, lat, "Fallback regional approximation");
        return (coord.with_xy((lng, lat)), FallbackKind::RegionalOffset);
    }

    warn!(from_crs, x, y, "Unknown coordinate system, returning original coordinates");
    (coord, FallbackKind::Unrecognized)
}

/// Prepared source/target projection pair.
///
/// Building a plan parses both definitions once; applying it is pure math.
pub struct ProjectionPlan {
    source: Proj,
    target: Proj,
    source_is_geographic: bool,
    target_is_geographic: bool,
}

impl std::fmt::Debug for ProjectionPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProjectionPlan")
            .field("source_is_geographic", &self.source_is_geographic)
            .field("target_is_geographic", &self.target_is_geographic)
            .finish_non_exhaustive()
    }
}

impl ProjectionPlan {
    /// Build a plan between two resolved definitions.
    pub fn new(from: &ProjectionDefinition, to: &ProjectionDefinition) -> Result<Self> {
        Ok(Self {
            source: from.to_proj()?,
            target: to.to_proj()?,
            source_is_geographic: from.is_geographic(),
            target_is_geographic: to.is_geographic(),
        })
    }

    /// Transform one coordinate, keeping its elevation.
    pub fn apply(&self, coord: Coordinate) -> Result<Coordinate> {
        let (x, y) = if self.source_is_geographic {
            (coord.x.to_radians(), coord.y.to_radians())
        } else {
            (coord.x, coord.y)
        };

        let mut point = (x, y, 0.0);
        proj4rs::transform::transform(&self.source, &self.target, &mut point)
            .map_err(|e| GeoError::Transform(format!("{e:?}")))?;

        let (out_x, out_y) = if self.target_is_geographic {
            (point.0.to_degrees(), point.1.to_degrees())
        } else {
            (point.0, point.1)
        };

        if !out_x.is_finite() || !out_y.is_finite() {
            return Err(GeoError::Transform(format!(
                "non-finite result for [{}, {}]",
                coord.x, coord.y
            )));
        }

        Ok(coord.with_xy((out_x, out_y)))
    }
}

/// Per-coordinate transform strategy for one geometry.
#[derive(Debug)]
pub(crate) enum Strategy {
    /// Source and target are the same CRS
    Identity,
    /// Both definitions resolved
    Exact(ProjectionPlan),
    /// Definitions unavailable; every coordinate goes through the fallback
    Fallback,
}

impl Strategy {
    /// Transform one coordinate, absorbing failures with the fallback.
    pub(crate) fn apply(&self, coord: Coordinate, from_crs: &str) -> (Coordinate, TransformOutcome) {
        match self {
            Strategy::Identity => (coord, TransformOutcome::Exact),
            Strategy::Exact(plan) => match plan.apply(coord) {
                Ok(projected) => (projected, TransformOutcome::Exact),
                Err(e) => {
                    debug!(from_crs, error = %e, "Exact transform failed, using fallback");
                    let (fallback, kind) = fallback_transform(coord, from_crs);
                    (fallback, TransformOutcome::Fallback(kind))
                }
            },
            Strategy::Fallback => {
                let (fallback, kind) = fallback_transform(coord, from_crs);
                (fallback, TransformOutcome::Fallback(kind))
            }
        }
    }
}

/// Transforms coordinates and geometries, resolving definitions on demand.
#[derive(Debug)]
pub struct Transformer<L> {
    resolver: Resolver<L>,
}

impl<L: DefinitionLookup> Transformer<L> {
    /// Create a transformer over a resolver.
    pub fn new(resolver: Resolver<L>) -> Self {
        Self { resolver }
    }

    /// The underlying resolver.
    pub fn resolver(&self) -> &Resolver<L> {
        &self.resolver
    }

    /// Build the projection plan for a CRS pair.
    ///
    /// Fails with [`GeoError::ProjectionUnavailable`] if either definition
    /// cannot be resolved. WGS84 never goes through the resolver.
    pub async fn plan(&self, from_crs: &str, to_crs: &str) -> Result<ProjectionPlan> {
        let from = self.definition(from_crs).await?;
        let to = self.definition(to_crs).await?;
        ProjectionPlan::new(&from, &to)
    }

    /// Exact transform of one coordinate, without fallback.
    pub async fn try_transform_coordinate(
        &self,
        coord: Coordinate,
        from_crs: &str,
        to_crs: &str,
    ) -> Result<Coordinate> {
        self.plan(from_crs, to_crs).await?.apply(coord)
    }

    /// Transform one coordinate, falling back to heuristics on failure.
    pub async fn transform_coordinate(
        &self,
        coord: Coordinate,
        from_crs: &str,
        to_crs: &str,
    ) -> (Coordinate, TransformOutcome) {
        match self.try_transform_coordinate(coord, from_crs, to_crs).await {
            Ok(projected) => (projected, TransformOutcome::Exact),
            Err(e) => {
                warn!(
                    from_crs,
                    to_crs,
                    error = %e,
                    "Coordinate transformation failed, using fallback"
                );
                let (fallback, kind) = fallback_transform(coord, from_crs);
                (fallback, TransformOutcome::Fallback(kind))
            }
        }
    }

    /// Decide how every coordinate of one geometry will be transformed.
    pub(crate) async fn strategy(&self, from_crs: &str, to_crs: &str) -> Strategy {
        if from_crs == to_crs {
            return Strategy::Identity;
        }

        match self.plan(from_crs, to_crs).await {
            Ok(plan) => Strategy::Exact(plan),
            Err(e) => {
                warn!(
                    from_crs,
                    to_crs,
                    error = %e,
                    "Coordinate transformation unavailable, using fallback"
                );
                Strategy::Fallback
            }
        }
    }

    async fn definition(&self, code: &str) -> Result<ProjectionDefinition> {
        if code == WGS84 {
            return Ok(ProjectionDefinition::wgs84());
        }
        self.resolver.require(code).await
    }
}
