//! Turning uploaded files into feature collections.

use bfgeo_core::{Error, Result, ResultExt};
use geojson::{Feature, FeatureCollection, GeoJson, Geometry, JsonObject, Value};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

/// Location used for formats that are accepted but not parsed.
pub const PLACEHOLDER_POINT: [f64; 2] = [-98.5795, 39.8283];

/// How an input file is handled, decided by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    /// `.geojson` or `.json`, parsed
    GeoJson,
    /// `.csv`, replaced by a placeholder point
    Csv,
    /// Anything else, replaced by a placeholder point
    Other,
}

impl InputKind {
    pub fn from_path(path: &Path) -> Self {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);

        match extension.as_deref() {
            Some("geojson" | "json") => Self::GeoJson,
            Some("csv") => Self::Csv,
            _ => Self::Other,
        }
    }
}

/// An imported layer, ready for a map.
#[derive(Debug, Clone, Serialize)]
pub struct Layer {
    pub id: String,
    pub name: String,
    pub data: FeatureCollection,
}

impl Layer {
    pub fn new(name: impl Into<String>, data: FeatureCollection) -> Self {
        Self {
            id: format!("layer_{}", Uuid::new_v4().simple()),
            name: name.into(),
            data,
        }
    }
}

/// File name without its final extension.
pub fn layer_name(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "layer".to_string())
}

/// `<stem>.wgs84.geojson` next to the input.
pub fn default_output_path(input: &Path) -> PathBuf {
    input.with_file_name(format!("{}.wgs84.geojson", layer_name(input)))
}

/// Read a file into a collection according to its [`InputKind`].
pub fn load_collection(path: &Path) -> Result<FeatureCollection> {
    if !path.is_file() {
        return Err(Error::file_not_found(path));
    }

    match InputKind::from_path(path) {
        InputKind::GeoJson => {
            let text = std::fs::read_to_string(path)
                .map_err(Error::from)
                .context(format!("Reading {}", path.display()))?;
            parse_geojson(&text).context(format!("Parsing {}", path.display()))
        }
        InputKind::Csv => {
            warn!(path = %path.display(), "CSV parsing is not supported, using a placeholder point");
            Ok(placeholder_collection("CSV Data"))
        }
        InputKind::Other => {
            warn!(path = %path.display(), "Unsupported format, using a placeholder point");
            Ok(placeholder_collection("Uploaded Data"))
        }
    }
}

/// Parse GeoJSON text, wrapping a bare Feature or Geometry in a collection.
pub fn parse_geojson(text: &str) -> Result<FeatureCollection> {
    let geojson: GeoJson = text
        .parse()
        .map_err(|e: geojson::Error| Error::invalid_geojson(e.to_string()).with_source(e))?;

    Ok(match geojson {
        GeoJson::FeatureCollection(collection) => collection,
        GeoJson::Feature(feature) => {
            debug!("Wrapping single feature in a collection");
            collection_of(vec![feature])
        }
        GeoJson::Geometry(geometry) => {
            debug!("Wrapping bare geometry in a collection");
            collection_of(vec![Feature {
                geometry: Some(geometry),
                ..Default::default()
            }])
        }
    })
}

/// Single-point collection standing in for data we cannot parse.
pub fn placeholder_collection(name: &str) -> FeatureCollection {
    let mut properties = JsonObject::new();
    properties.insert("name".to_string(), name.into());

    collection_of(vec![Feature {
        geometry: Some(Geometry::new(Value::Point(PLACEHOLDER_POINT.to_vec()))),
        properties: Some(properties),
        ..Default::default()
    }])
}

fn collection_of(features: Vec<Feature>) -> FeatureCollection {
    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}
