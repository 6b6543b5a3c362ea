//! Whole-collection reprojection.
//!
//! [`Reprojector::reproject_collection`] is the entry point used by the
//! ingestion layer. It identifies the source CRS, resolves the projection
//! pair once, fans the per-feature transforms out as one batch, rewrites the
//! `crs` member and returns a report of what happened. It never fails: every CRS or transform problem
//! ends up as a [`Diagnostic`] instead.

use crate::definition::WGS84;
use crate::geometry::TransformReport;
use crate::identify::{crs_member, crs_tag, detect_crs_from_coordinates, extract_crs_code, sample_coordinates};
use crate::resolver::DefinitionLookup;
use crate::transform::{Strategy, Transformer};
use futures::future::join_all;
use geojson::{Feature, FeatureCollection, JsonValue, Position};
use serde::Serialize;
use tracing::{info, instrument, warn};

/// How the source CRS of a collection was determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CrsSource {
    /// Read from the collection's `crs` member
    Declared,
    /// Guessed from a sample coordinate
    Inferred,
    /// No tag and no usable guess
    Undetermined,
    /// A `crs` member was present but no EPSG code could be read from it
    UnrecognizedTag,
}

/// Non-fatal conditions found while reprojecting.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// A definition could not be resolved; coordinates were approximated
    ProjectionUnavailable { code: String },
    /// The fallback did not recognize some coordinates and left them as-is
    UnrecognizedCoordinateSystem { code: String, coordinates: usize },
    /// Coordinates look projected but no CRS could be determined
    ProjectedWithoutCrs { sample: Position },
    /// The `crs` member is in an encoding we cannot read
    UnrecognizedCrsTag { tag: JsonValue },
}

/// Result of identifying a collection's source CRS.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrsIdentification {
    /// How the code was obtained
    pub source: CrsSource,
    /// The EPSG code, if any
    pub code: Option<String>,
    /// First coordinate of the sample, if the collection has one
    pub sample: Option<Position>,
}

/// Summary of one `reproject_collection` call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReprojectionReport {
    /// How the source CRS was determined
    pub crs_source: CrsSource,
    /// Source EPSG code, if one was determined
    pub source_crs: Option<String>,
    /// EPSG code the collection was reprojected into
    pub target_crs: String,
    /// True if coordinates were transformed and the `crs` member rewritten
    pub transformed: bool,
    /// Number of features in the collection
    pub features: usize,
    /// Per-coordinate outcome counts across all features
    pub coordinates: TransformReport,
    /// Conditions worth surfacing to the user
    pub diagnostics: Vec<Diagnostic>,
}

impl ReprojectionReport {
    fn passthrough(identification: CrsIdentification, target_crs: &str, features: usize) -> Self {
        Self {
            crs_source: identification.source,
            source_crs: identification.code,
            target_crs: target_crs.to_string(),
            transformed: false,
            features,
            coordinates: TransformReport::default(),
            diagnostics: Vec::new(),
        }
    }

    /// True if nothing needs a user's attention.
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

/// Identify the source CRS of a collection.
///
/// An explicit `crs` member always wins. Without one, the first geometry of
/// the first feature is sampled and the coordinate heuristic applied. A
/// member that is present but unreadable is reported as such and no guess
/// is made.
pub fn identify_collection(collection: &FeatureCollection) -> CrsIdentification {
    let sample = collection_sample(collection);
    let first = sample.first().cloned();

    if let Some(tag) = crs_member(collection.foreign_members.as_ref()) {
        return match extract_crs_code(Some(tag)) {
            Some(code) => CrsIdentification {
                source: CrsSource::Declared,
                code: Some(code),
                sample: first,
            },
            None => CrsIdentification {
                source: CrsSource::UnrecognizedTag,
                code: None,
                sample: first,
            },
        };
    }

    match detect_crs_from_coordinates(&sample) {
        Some(code) => CrsIdentification {
            source: CrsSource::Inferred,
            code: Some(code),
            sample: first,
        },
        None => CrsIdentification {
            source: CrsSource::Undetermined,
            code: None,
            sample: first,
        },
    }
}

fn collection_sample(collection: &FeatureCollection) -> Vec<Position> {
    collection
        .features
        .first()
        .and_then(|feature| feature.geometry.as_ref())
        .map(|geometry| sample_coordinates(&geometry.value))
        .unwrap_or_default()
}

fn looks_projected(position: &[f64]) -> bool {
    position.iter().take(2).any(|value| value.abs() > 180.0)
}

/// Reprojects feature collections into a target CRS (WGS84 by default).
#[derive(Debug)]
pub struct Reprojector<L> {
    transformer: Transformer<L>,
    target_crs: String,
    warn_on_projected_passthrough: bool,
}

impl<L: DefinitionLookup> Reprojector<L> {
    /// Create a reprojector targeting WGS84.
    pub fn new(transformer: Transformer<L>) -> Self {
        Self {
            transformer,
            target_crs: WGS84.to_string(),
            warn_on_projected_passthrough: true,
        }
    }

    /// Set the target CRS.
    pub fn with_target_crs(mut self, code: impl Into<String>) -> Self {
        self.target_crs = code.into();
        self
    }

    /// Enable or disable the [`Diagnostic::ProjectedWithoutCrs`] check.
    pub fn with_projected_passthrough_warning(mut self, enabled: bool) -> Self {
        self.warn_on_projected_passthrough = enabled;
        self
    }

    /// The underlying transformer.
    pub fn transformer(&self) -> &Transformer<L> {
        &self.transformer
    }

    /// EPSG code collections are reprojected into.
    pub fn target_crs(&self) -> &str {
        &self.target_crs
    }

    /// Reproject every geometry of a collection into the target CRS.
    ///
    /// The definitions are resolved once for the whole collection, so an
    /// unknown code costs at most one lookup. Features are then transformed
    /// concurrently and awaited as one batch. On success the `crs` member names the target; when no transform was
    /// needed or possible the collection comes back untouched.
    #[instrument(skip_all, fields(features = collection.features.len(), target = %self.target_crs))]
    pub async fn reproject_collection(
        &self,
        collection: FeatureCollection,
    ) -> (FeatureCollection, ReprojectionReport) {
        let identification = identify_collection(&collection);
        let mut report =
            ReprojectionReport::passthrough(identification.clone(), &self.target_crs, collection.features.len());

        let Some(code) = identification.code else {
            self.report_passthrough(&collection, &identification.source, identification.sample, &mut report);
            return (collection, report);
        };

        if code == self.target_crs {
            info!(code = %code, source = ?identification.source, "Collection already in target CRS");
            return (collection, report);
        }

        let FeatureCollection {
            features,
            foreign_members,
            ..
        } = collection;

        let strategy = self.transformer.strategy(&code, &self.target_crs).await;
        report.coordinates.projection_unavailable = matches!(strategy, Strategy::Fallback);

        let results = join_all(
            features
                .into_iter()
                .map(|feature| transform_feature(feature, &strategy, &code)),
        )
        .await;

        let mut features = Vec::with_capacity(results.len());
        for (feature, feature_report) in results {
            report.coordinates += feature_report;
            features.push(feature);
        }

        let mut foreign_members = foreign_members.unwrap_or_default();
        foreign_members.insert("crs".to_string(), crs_tag(&self.target_crs));

        if report.coordinates.projection_unavailable {
            report.diagnostics.push(Diagnostic::ProjectionUnavailable { code: code.clone() });
        }
        if report.coordinates.unrecognized > 0 {
            warn!(
                code = %code,
                coordinates = report.coordinates.unrecognized,
                "Unrecognized coordinate system, some coordinates were left unchanged"
            );
            report.diagnostics.push(Diagnostic::UnrecognizedCoordinateSystem {
                code: code.clone(),
                coordinates: report.coordinates.unrecognized,
            });
        }
        report.transformed = true;

        info!(
            from = %code,
            source = ?report.crs_source,
            exact = report.coordinates.exact,
            approximate = report.coordinates.approximate,
            unrecognized = report.coordinates.unrecognized,
            "Reprojected collection"
        );

        let collection = FeatureCollection {
            bbox: None,
            features,
            foreign_members: Some(foreign_members),
        };
        (collection, report)
    }

    fn report_passthrough(
        &self,
        collection: &FeatureCollection,
        source: &CrsSource,
        sample: Option<Position>,
        report: &mut ReprojectionReport,
    ) {
        if *source == CrsSource::UnrecognizedTag {
            let tag = crs_member(collection.foreign_members.as_ref())
                .cloned()
                .unwrap_or(JsonValue::Null);
            warn!(tag = %tag, "Unrecognized CRS tag, passing data through unchanged");
            report.diagnostics.push(Diagnostic::UnrecognizedCrsTag { tag });
            return;
        }

        match sample {
            Some(sample) if self.warn_on_projected_passthrough && looks_projected(&sample) => {
                warn!(
                    x = sample[0],
                    y = sample.get(1).copied(),
                    "Coordinates appear projected but no CRS could be determined"
                );
                report.diagnostics.push(Diagnostic::ProjectedWithoutCrs { sample });
            }
            _ => info!("No CRS determined, passing data through unchanged"),
        }
    }
}

async fn transform_feature(
    mut feature: Feature,
    strategy: &Strategy,
    from_crs: &str,
) -> (Feature, TransformReport) {
    let Some(geometry) = feature.geometry.as_mut() else {
        return (feature, TransformReport::default());
    };

    let (value, report) = strategy.transform_value(&geometry.value, from_crs);
    geometry.value = value;
    geometry.bbox = None;
    feature.bbox = None;

    (feature, report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::tests::CountingLookup;
    use crate::resolver::Resolver;
    use crate::Offline;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use geojson::{Geometry, Value};
    use serde_json::json;

    fn reprojector() -> Reprojector<Offline> {
        Reprojector::new(Transformer::new(Resolver::offline()))
    }

    fn collection(values: Vec<Value>, crs: Option<JsonValue>) -> FeatureCollection {
        let features = values
            .into_iter()
            .map(|value| Feature {
                geometry: Some(Geometry::new(value)),
                ..Default::default()
            })
            .collect();
        FeatureCollection {
            bbox: None,
            features,
            foreign_members: crs.map(|crs| {
                let mut members = geojson::JsonObject::new();
                members.insert("crs".to_string(), crs);
                members
            }),
        }
    }

    fn named(name: &str) -> JsonValue {
        json!({"type": "name", "properties": {"name": name}})
    }

    fn first_point(collection: &FeatureCollection) -> Position {
        match &collection.features[0].geometry.as_ref().unwrap().value {
            Value::Point(position) => position.clone(),
            other => panic!("expected point, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_declared_utm_collection() {
        let input = collection(
            vec![Value::Point(vec![573_729.312_046_134_3, 4_957_893.406_163_912])],
            Some(named("urn:ogc:def:crs:EPSG::6346")),
        );

        let (output, report) = reprojector().reproject_collection(input).await;

        assert!(report.transformed);
        assert_eq!(report.crs_source, CrsSource::Declared);
        assert_eq!(report.source_crs.as_deref(), Some("6346"));
        assert!(report.is_clean());

        let point = first_point(&output);
        assert!((point[0] - -80.068_24).abs() < 1e-3);
        assert!((point[1] - 44.770_63).abs() < 1e-3);

        let crs = crs_member(output.foreign_members.as_ref()).unwrap();
        assert_eq!(crs["properties"]["name"], "urn:ogc:def:crs:EPSG::4326");
    }

    #[tokio::test]
    async fn test_inferred_collection_gains_crs_tag() {
        let input = collection(
            vec![
                Value::LineString(vec![vec![573_729.31, 4_957_893.41], vec![574_000.0, 4_958_000.0]]),
                Value::Point(vec![575_000.0, 4_959_000.0]),
            ],
            None,
        );

        let (output, report) = reprojector().reproject_collection(input).await;

        assert_eq!(report.crs_source, CrsSource::Inferred);
        assert_eq!(report.source_crs.as_deref(), Some("6346"));
        assert_eq!(report.features, 2);
        assert_eq!(report.coordinates.exact, 3);
        assert_eq!(
            extract_crs_code(crs_member(output.foreign_members.as_ref())).as_deref(),
            Some(WGS84)
        );
    }

    #[tokio::test]
    async fn test_wgs84_passes_through_unchanged() {
        let input = collection(vec![Value::Point(vec![-98.5795, 39.8283])], None);
        let (output, report) = reprojector().reproject_collection(input.clone()).await;

        assert!(!report.transformed);
        assert_eq!(report.crs_source, CrsSource::Inferred);
        assert_eq!(output, input);
    }

    #[tokio::test]
    async fn test_undetermined_projected_data_is_flagged() {
        let input = collection(vec![Value::Point(vec![20_050_000.0, 5_000_000.0])], None);
        let (output, report) = reprojector().reproject_collection(input.clone()).await;

        assert_eq!(output, input);
        assert_eq!(report.crs_source, CrsSource::Undetermined);
        assert_eq!(
            report.diagnostics,
            vec![Diagnostic::ProjectedWithoutCrs { sample: vec![20_050_000.0, 5_000_000.0] }]
        );

        let quiet = reprojector().with_projected_passthrough_warning(false);
        let (_, report) = quiet.reproject_collection(input).await;
        assert!(report.is_clean());
    }

    #[tokio::test]
    async fn test_unrecognized_tag_skips_inference() {
        let tag = named("urn:ogc:def:crs:OGC:1.3:CRS84");
        let input = collection(vec![Value::Point(vec![573_729.31, 4_957_893.41])], Some(tag.clone()));
        let (output, report) = reprojector().reproject_collection(input.clone()).await;

        assert_eq!(output, input);
        assert_eq!(report.crs_source, CrsSource::UnrecognizedTag);
        assert_eq!(report.diagnostics, vec![Diagnostic::UnrecognizedCrsTag { tag }]);
    }

    #[tokio::test]
    async fn test_unavailable_projection_is_reported() {
        let input = collection(
            vec![Value::Point(vec![600_000.0, 5_000_000.0])],
            Some(named("EPSG:9999")),
        );
        let (output, report) = reprojector().reproject_collection(input).await;

        assert!(report.transformed);
        assert_eq!(report.coordinates.approximate, 1);
        assert_eq!(
            report.diagnostics,
            vec![Diagnostic::ProjectionUnavailable { code: "9999".to_string() }]
        );
        let point = first_point(&output);
        assert!((point[0] - 4.270_21).abs() < 1e-4);
    }

    #[tokio::test]
    async fn test_unrecognized_coordinates_are_reported() {
        let input = collection(vec![Value::Point(vec![-5_000.0, 300.0])], Some(named("EPSG:9999")));
        let (output, report) = reprojector().reproject_collection(input).await;

        assert_eq!(first_point(&output), vec![-5_000.0, 300.0]);
        assert!(report.diagnostics.contains(&Diagnostic::UnrecognizedCoordinateSystem {
            code: "9999".to_string(),
            coordinates: 1,
        }));
    }

    #[tokio::test]
    async fn test_features_without_geometry_and_empty_collections() {
        let mut input = collection(vec![Value::Point(vec![575_000.0, 4_959_000.0])], Some(named("EPSG:6346")));
        input.features.push(Feature::default());
        let (output, report) = reprojector().reproject_collection(input).await;
        assert_eq!(output.features.len(), 2);
        assert!(output.features[1].geometry.is_none());
        assert_eq!(report.coordinates.exact, 1);

        let empty = collection(vec![], None);
        let (output, report) = reprojector().reproject_collection(empty.clone()).await;
        assert_eq!(output, empty);
        assert_eq!(report.crs_source, CrsSource::Undetermined);
        assert!(report.is_clean());
    }

    #[tokio::test]
    async fn test_feature_order_and_properties_kept() {
        let mut input = collection(
            vec![Value::Point(vec![573_729.31, 4_957_893.41]), Value::Point(vec![700_000.0, 5_000_000.0])],
            None,
        );
        for (index, feature) in input.features.iter_mut().enumerate() {
            feature.set_property("index", index);
        }

        let (output, _) = reprojector().reproject_collection(input).await;
        for (index, feature) in output.features.iter().enumerate() {
            assert_eq!(feature.property("index"), Some(&json!(index)));
        }
    }

    /// Lookup that suspends before answering, so concurrent callers overlap.
    #[derive(Debug, Default)]
    struct YieldingLookup {
        calls: AtomicUsize,
    }

    impl DefinitionLookup for YieldingLookup {
        async fn fetch(&self, code: &str) -> crate::Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            match code {
                "26918" => Ok("+proj=utm +zone=18 +datum=NAD83 +units=m +no_defs".to_string()),
                _ => Err(crate::GeoError::lookup(code, "404 Not Found")),
            }
        }
    }

    fn utm_points(count: usize) -> Vec<Value> {
        (0..count)
            .map(|i| Value::Point(vec![500_000.0 + i as f64 * 10.0, 5_000_000.0]))
            .collect()
    }

    #[tokio::test]
    async fn test_unresolved_code_is_looked_up_once_per_collection() {
        let reprojector = Reprojector::new(Transformer::new(Resolver::new(YieldingLookup::default())));
        let input = collection(utm_points(50), Some(named("EPSG:26918")));

        let (_, report) = reprojector.reproject_collection(input).await;

        assert_eq!(report.coordinates.exact, 50);
        let lookup = reprojector.transformer().resolver().lookup();
        assert_eq!(lookup.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_lookup_is_not_repeated_per_feature() {
        let reprojector = Reprojector::new(Transformer::new(Resolver::new(CountingLookup::default())));
        let input = collection(utm_points(50), Some(named("EPSG:9999")));

        let (_, report) = reprojector.reproject_collection(input).await;

        assert_eq!(report.coordinates.approximate, 50);
        assert_eq!(
            report.diagnostics,
            vec![Diagnostic::ProjectionUnavailable { code: "9999".to_string() }]
        );
        assert_eq!(reprojector.transformer().resolver().lookup().calls(), 1);
    }

    #[tokio::test]
    async fn test_versioned_urn_is_an_unrecognized_tag() {
        let tag = named("urn:ogc:def:crs:EPSG:6.6:4326");
        let input = collection(vec![Value::Point(vec![-98.5795, 39.8283])], Some(tag.clone()));
        let (output, report) = reprojector().reproject_collection(input.clone()).await;

        assert_eq!(output, input);
        assert_eq!(report.crs_source, CrsSource::UnrecognizedTag);
        assert_eq!(report.diagnostics, vec![Diagnostic::UnrecognizedCrsTag { tag }]);
    }

    #[test]
    fn test_identify_collection() {
        let declared = collection(vec![Value::Point(vec![1.0, 2.0])], Some(named("EPSG::26917")));
        let identification = identify_collection(&declared);
        assert_eq!(identification.source, CrsSource::Declared);
        assert_eq!(identification.code.as_deref(), Some("26917"));
        assert_eq!(identification.sample, Some(vec![1.0, 2.0]));
    }
}
