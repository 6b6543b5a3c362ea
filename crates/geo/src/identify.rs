//! CRS identification for feature collections.
//!
//! Two independent strategies:
//! - [`extract_crs_code`] reads an explicit `crs` member in one of the
//!   historical GeoJSON encodings;
//! - [`detect_crs_from_coordinates`] guesses from the magnitude of a sample
//!   coordinate.
//!
//! The guess is a **region-specific heuristic**. Its easting bands are hand
//! calibrated for the UTM zones covering Ontario, Canada (15N, 16N, 17N) and
//! will misclassify planar data from elsewhere. Do not widen the bands
//! without new calibration data.

use crate::definition::{WEB_MERCATOR, WGS84};
use geojson::{JsonObject, JsonValue, Position, Value};
use serde_json::json;

/// URN form used when rewriting the tag after a transform.
pub const URN_PREFIX: &str = "urn:ogc:def:crs:EPSG::";

/// Textual encodings of an EPSG code, most specific first.
const CRS_NAME_PREFIXES: &[&str] = &[URN_PREFIX, "EPSG::", "EPSG:"];

/// Regional UTM envelope as (min, max) northing.
const NORTHING_RANGE: (f64, f64) = (4_000_000.0, 6_500_000.0);

/// Regional UTM envelope as (min, max) easting.
const EASTING_RANGE: (f64, f64) = (160_000.0, 840_000.0);

/// Easting band of a candidate zone.
struct EastingBand {
    min: f64,
    max: f64,
    max_inclusive: bool,
    code: &'static str,
}

impl EastingBand {
    fn contains(&self, x: f64) -> bool {
        x >= self.min && if self.max_inclusive { x <= self.max } else { x < self.max }
    }
}

/// Candidate zones in priority order; the first band containing the easting wins.
const EASTING_BANDS: &[EastingBand] = &[
    // NAD83 / UTM 15N, western Ontario and Manitoba (central meridian -93)
    EastingBand { min: 200_000.0, max: 450_000.0, max_inclusive: false, code: "26915" },
    // NAD83 / UTM 16N, central Ontario (central meridian -87)
    EastingBand { min: 300_000.0, max: 550_000.0, max_inclusive: false, code: "26916" },
    // NAD83(2011) / UTM 17N, eastern Ontario (central meridian -81)
    EastingBand { min: 400_000.0, max: 800_000.0, max_inclusive: true, code: "6346" },
];

/// Half the equatorial circumference in Web Mercator metres.
const WEB_MERCATOR_EXTENT: f64 = 20_037_508.34;

/// Extract the EPSG code from a GeoJSON `crs` member.
///
/// Accepts `{"type": "name", "properties": {"name": ...}}` where the name is
/// `urn:ogc:def:crs:EPSG::<code>`, `EPSG::<code>` or `EPSG:<code>`. The code
/// must be all digits; anything else after the prefix yields `None`.
///
/// # Example
/// ```
/// use bfgeo_geo::extract_crs_code;
/// use serde_json::json;
///
/// let crs = json!({"type": "name", "properties": {"name": "urn:ogc:def:crs:EPSG::6346"}});
/// assert_eq!(extract_crs_code(Some(&crs)).as_deref(), Some("6346"));
/// assert_eq!(extract_crs_code(None), None);
/// ```
pub fn extract_crs_code(crs: Option<&JsonValue>) -> Option<String> {
    let crs = crs?;
    if crs.get("type").and_then(JsonValue::as_str) != Some("name") {
        return None;
    }

    let name = crs.get("properties")?.get("name")?.as_str()?;

    CRS_NAME_PREFIXES
        .iter()
        .find_map(|prefix| name.split(prefix).nth(1))
        .map(str::trim)
        .filter(|code| !code.is_empty() && code.bytes().all(|b| b.is_ascii_digit()))
        .map(String::from)
}

/// Read the `crs` member of a collection's foreign members.
pub fn crs_member(foreign_members: Option<&JsonObject>) -> Option<&JsonValue> {
    foreign_members?.get("crs").filter(|crs| !crs.is_null())
}

/// Build a named CRS member in URN form.
pub fn crs_tag(code: &str) -> JsonValue {
    json!({
        "type": "name",
        "properties": {
            "name": format!("{URN_PREFIX}{code}")
        }
    })
}

/// Guess a CRS from a sample coordinate sequence.
///
/// Only the first coordinate is inspected:
/// 1. geographic bounds give WGS84;
/// 2. the regional UTM envelope gives the zone whose easting band matches;
/// 3. anything else within the Web Mercator extent gives Web Mercator.
///
/// # Example
/// ```
/// use bfgeo_geo::detect_crs_from_coordinates;
///
/// assert_eq!(detect_crs_from_coordinates(&[vec![-98.5795, 39.8283]]).as_deref(), Some("4326"));
/// assert_eq!(detect_crs_from_coordinates(&[vec![573729.31, 4957893.41]]).as_deref(), Some("6346"));
/// assert_eq!(detect_crs_from_coordinates(&[vec![20050000.0, 5000000.0]]), None);
/// ```
pub fn detect_crs_from_coordinates(sample: &[Position]) -> Option<String> {
    let first = sample.first()?;
    let [x, y, ..] = first.as_slice() else {
        return None;
    };
    let (x, y) = (*x, *y);

    if x.abs() <= 180.0 && y.abs() <= 90.0 {
        return Some(WGS84.to_string());
    }

    let in_envelope = (NORTHING_RANGE.0..=NORTHING_RANGE.1).contains(&y)
        && (EASTING_RANGE.0..=EASTING_RANGE.1).contains(&x);
    if in_envelope {
        if let Some(band) = EASTING_BANDS.iter().find(|band| band.contains(x)) {
            return Some(band.code.to_string());
        }
    }

    if x.abs() > 180.0 && x.abs() <= WEB_MERCATOR_EXTENT && y.abs() <= WEB_MERCATOR_EXTENT {
        return Some(WEB_MERCATOR.to_string());
    }

    None
}

/// Pick the coordinate sequence used for inference from a geometry.
///
/// Point gives itself, LineString and MultiPoint their positions, Polygon
/// its outer ring, and the multi-variants and collections their first
/// member. Empty geometries give an empty sample.
pub fn sample_coordinates(value: &Value) -> Vec<Position> {
    match value {
        Value::Point(position) => vec![position.clone()],
        Value::MultiPoint(positions) | Value::LineString(positions) => positions.clone(),
        Value::Polygon(rings) => rings.first().cloned().unwrap_or_default(),
        Value::MultiLineString(lines) => lines.first().cloned().unwrap_or_default(),
        Value::MultiPolygon(polygons) => polygons
            .first()
            .and_then(|rings| rings.first())
            .cloned()
            .unwrap_or_default(),
        Value::GeometryCollection(geometries) => geometries
            .first()
            .map(|geometry| sample_coordinates(&geometry.value))
            .unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(name: &str) -> JsonValue {
        json!({"type": "name", "properties": {"name": name}})
    }

    #[test]
    fn test_extract_urn() {
        let crs = named("urn:ogc:def:crs:EPSG::6346");
        assert_eq!(extract_crs_code(Some(&crs)).as_deref(), Some("6346"));
    }

    #[test]
    fn test_extract_single_colon() {
        let crs = named("EPSG:4326");
        assert_eq!(extract_crs_code(Some(&crs)).as_deref(), Some("4326"));
    }

    #[test]
    fn test_extract_double_colon() {
        let crs = named("EPSG::26917");
        assert_eq!(extract_crs_code(Some(&crs)).as_deref(), Some("26917"));
    }

    #[test]
    fn test_extract_absent_or_null() {
        assert_eq!(extract_crs_code(None), None);
        assert_eq!(extract_crs_code(Some(&JsonValue::Null)), None);
    }

    #[test]
    fn test_extract_unrecognized() {
        assert_eq!(extract_crs_code(Some(&named("urn:ogc:def:crs:OGC:1.3:CRS84"))), None);
        assert_eq!(extract_crs_code(Some(&named("EPSG:"))), None);
        assert_eq!(extract_crs_code(Some(&named("urn:ogc:def:crs:EPSG:6.6:4326"))), None);
        assert_eq!(extract_crs_code(Some(&named("EPSG:4326 (WGS 84)"))), None);

        let linked = json!({"type": "link", "properties": {"href": "http://example.com/crs"}});
        assert_eq!(extract_crs_code(Some(&linked)), None);

        let missing_name = json!({"type": "name", "properties": {}});
        assert_eq!(extract_crs_code(Some(&missing_name)), None);
    }

    #[test]
    fn test_crs_tag_round_trips() {
        let tag = crs_tag(WGS84);
        assert_eq!(tag["properties"]["name"], "urn:ogc:def:crs:EPSG::4326");
        assert_eq!(extract_crs_code(Some(&tag)).as_deref(), Some(WGS84));
    }

    #[test]
    fn test_crs_member() {
        let mut members = JsonObject::new();
        assert!(crs_member(Some(&members)).is_none());

        members.insert("crs".into(), JsonValue::Null);
        assert!(crs_member(Some(&members)).is_none());

        members.insert("crs".into(), named("EPSG:4326"));
        assert!(crs_member(Some(&members)).is_some());
        assert!(crs_member(None).is_none());
    }

    #[test]
    fn test_detect_geographic() {
        assert_eq!(
            detect_crs_from_coordinates(&[vec![-98.5795, 39.8283]]).as_deref(),
            Some(WGS84)
        );
    }

    #[test]
    fn test_detect_regional_zones() {
        let detect = |x: f64| detect_crs_from_coordinates(&[vec![x, 5_000_000.0]]);

        assert_eq!(detect(573_729.31).as_deref(), Some("6346"));
        assert_eq!(detect(250_000.0).as_deref(), Some("26915"));
        // Overlapping bands resolve to the first listed zone
        assert_eq!(detect(420_000.0).as_deref(), Some("26915"));
        assert_eq!(detect(500_000.0).as_deref(), Some("26916"));
        assert_eq!(detect(800_000.0).as_deref(), Some("6346"));
    }

    #[test]
    fn test_detect_envelope_gaps_fall_through_to_web_mercator() {
        // Inside the envelope but outside every band
        let sample = [vec![170_000.0, 5_000_000.0]];
        assert_eq!(detect_crs_from_coordinates(&sample).as_deref(), Some(WEB_MERCATOR));
    }

    #[test]
    fn test_detect_web_mercator() {
        let sample = [vec![-8_835_000.0, 5_410_000.0]];
        assert_eq!(detect_crs_from_coordinates(&sample).as_deref(), Some(WEB_MERCATOR));
    }

    #[test]
    fn test_detect_unknown() {
        assert_eq!(detect_crs_from_coordinates(&[vec![20_050_000.0, 5_000_000.0]]), None);
        assert_eq!(detect_crs_from_coordinates(&[]), None);
        assert_eq!(detect_crs_from_coordinates(&[vec![1.0]]), None);
    }

    #[test]
    fn test_detect_uses_first_coordinate_only() {
        let sample = [vec![573_729.31, 4_957_893.41], vec![-80.0, 44.0]];
        assert_eq!(detect_crs_from_coordinates(&sample).as_deref(), Some("6346"));
    }

    #[test]
    fn test_sample_coordinates() {
        let ring = vec![vec![1.0, 2.0], vec![3.0, 4.0], vec![1.0, 2.0]];

        assert_eq!(sample_coordinates(&Value::Point(vec![1.0, 2.0])), vec![vec![1.0, 2.0]]);
        assert_eq!(sample_coordinates(&Value::LineString(ring.clone())), ring);
        assert_eq!(
            sample_coordinates(&Value::Polygon(vec![ring.clone(), vec![vec![9.0, 9.0]]])),
            ring
        );
        assert_eq!(
            sample_coordinates(&Value::MultiLineString(vec![ring.clone(), vec![]])),
            ring
        );
        assert_eq!(
            sample_coordinates(&Value::MultiPolygon(vec![vec![ring.clone()]])),
            ring
        );
        assert!(sample_coordinates(&Value::MultiPolygon(vec![])).is_empty());
    }
}
