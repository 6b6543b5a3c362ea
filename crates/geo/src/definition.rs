//! Projection definitions and the table of well-known EPSG codes.
//!
//! Definitions are proj4 strings. The table covers the reference systems
//! expected in uploaded survey data (Ontario and the surrounding region),
//! so those never need a network round trip.

use crate::{GeoError, Result};
use proj4rs::Proj;
use std::fmt;
use std::sync::Arc;

/// EPSG code of WGS84 geographic coordinates, the universal output target.
pub const WGS84: &str = "4326";

/// EPSG code of Web Mercator.
pub const WEB_MERCATOR: &str = "3857";

/// proj4 definition of WGS84 geographic coordinates.
pub const WGS84_DEFINITION: &str = "+proj=longlat +datum=WGS84 +no_defs";

/// Tokens that appear in service responses but carry no meaning for the
/// transform itself.
const IGNORED_TOKENS: &[&str] = &["+type=crs", "+wktext", "+nadgrids=@null"];

/// Well-known definitions, keyed by EPSG code.
///
/// EPSG:6346 is NAD83(2011) / UTM zone 17N.
const WELL_KNOWN: &[(&str, &str)] = &[
    (WGS84, WGS84_DEFINITION),
    (
        WEB_MERCATOR,
        "+proj=merc +a=6378137 +b=6378137 +lat_ts=0.0 +lon_0=0.0 +x_0=0.0 +y_0=0 +k=1.0 +units=m +nadgrids=@null +wktext +no_defs",
    ),
    ("26914", "+proj=utm +zone=14 +datum=NAD83 +units=m +no_defs"),
    ("26915", "+proj=utm +zone=15 +datum=NAD83 +units=m +no_defs"),
    ("26916", "+proj=utm +zone=16 +datum=NAD83 +units=m +no_defs"),
    ("26917", "+proj=utm +zone=17 +datum=NAD83 +units=m +no_defs"),
    ("32614", "+proj=utm +zone=14 +datum=WGS84 +units=m +no_defs"),
    ("32615", "+proj=utm +zone=15 +datum=WGS84 +units=m +no_defs"),
    ("32616", "+proj=utm +zone=16 +datum=WGS84 +units=m +no_defs"),
    ("32617", "+proj=utm +zone=17 +datum=WGS84 +units=m +no_defs"),
    (
        "6344",
        "+proj=utm +zone=15 +ellps=GRS80 +towgs84=0,0,0,0,0,0,0 +units=m +no_defs",
    ),
    (
        "6345",
        "+proj=utm +zone=16 +ellps=GRS80 +towgs84=0,0,0,0,0,0,0 +units=m +no_defs",
    ),
    (
        "6346",
        "+proj=utm +zone=17 +ellps=GRS80 +towgs84=0,0,0,0,0,0,0 +units=m +no_defs",
    ),
];

/// Look up a definition in the static table.
pub fn well_known(code: &str) -> Option<&'static str> {
    WELL_KNOWN
        .iter()
        .find(|(known, _)| *known == code)
        .map(|(_, definition)| *definition)
}

/// Codes present in the static table, in table order.
pub fn well_known_codes() -> impl Iterator<Item = &'static str> {
    WELL_KNOWN.iter().map(|(code, _)| *code)
}

/// A proj4 projection definition.
///
/// Cheap to clone; the text is never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProjectionDefinition(Arc<str>);

impl ProjectionDefinition {
    /// Wrap definition text. Surrounding whitespace is dropped.
    pub fn new(text: impl AsRef<str>) -> Self {
        Self(Arc::from(text.as_ref().trim()))
    }

    /// The WGS84 geographic definition.
    pub fn wgs84() -> Self {
        Self::new(WGS84_DEFINITION)
    }

    /// Raw definition text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if the definition describes angular (degree) coordinates.
    pub fn is_geographic(&self) -> bool {
        self.tokens()
            .any(|token| token == "+proj=longlat" || token == "+proj=latlong")
    }

    /// Build the projection, skipping tokens that only matter to other tools.
    pub fn to_proj(&self) -> Result<Proj> {
        let normalized = self
            .tokens()
            .filter(|token| !IGNORED_TOKENS.contains(token))
            .collect::<Vec<_>>()
            .join(" ");

        Proj::from_proj_string(&normalized).map_err(|e| GeoError::InvalidDefinition {
            definition: self.as_str().to_string(),
            message: format!("{e:?}"),
        })
    }

    fn tokens(&self) -> impl Iterator<Item = &str> {
        self.0.split_whitespace()
    }
}

impl fmt::Display for ProjectionDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProjectionDefinition {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}
