//! Geometry-level transformation.
//!
//! Every coordinate of a geometry goes through the same strategy, so a
//! definition is resolved at most once per geometry. Shape is preserved:
//! ring, part and member counts never change, and only the first two values
//! of each position are replaced.

use crate::resolver::DefinitionLookup;
use crate::transform::{Coordinate, FallbackKind, Strategy, TransformOutcome, Transformer};
use geojson::{Geometry, Position, Value};
use serde::Serialize;
use std::ops::AddAssign;

/// Per-coordinate outcome counts for one or more geometries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TransformReport {
    /// Coordinates transformed with projection math (or unchanged because
    /// source and target were the same CRS)
    pub exact: usize,
    /// Coordinates moved by a fallback approximation
    pub approximate: usize,
    /// Coordinates already in geographic bounds, passed through by the fallback
    pub unchanged: usize,
    /// Coordinates the fallback did not recognize, returned as-is
    pub unrecognized: usize,
    /// Positions with fewer than two values, left untouched
    pub skipped: usize,
    /// True if a definition could not be resolved for this input
    pub projection_unavailable: bool,
}

impl TransformReport {
    /// Total number of positions visited.
    pub fn total(&self) -> usize {
        self.exact + self.approximate + self.unchanged + self.unrecognized + self.skipped
    }

    /// True if every coordinate went through projection math.
    pub fn is_exact(&self) -> bool {
        self.total() == self.exact + self.skipped
    }

    fn record(&mut self, outcome: TransformOutcome) {
        match outcome {
            TransformOutcome::Exact => self.exact += 1,
            TransformOutcome::Fallback(FallbackKind::AlreadyGeographic) => self.unchanged += 1,
            TransformOutcome::Fallback(FallbackKind::ApproximateUtm)
            | TransformOutcome::Fallback(FallbackKind::RegionalOffset) => self.approximate += 1,
            TransformOutcome::Fallback(FallbackKind::Unrecognized) => self.unrecognized += 1,
        }
    }
}

impl AddAssign for TransformReport {
    fn add_assign(&mut self, other: Self) {
        self.exact += other.exact;
        self.approximate += other.approximate;
        self.unchanged += other.unchanged;
        self.unrecognized += other.unrecognized;
        self.skipped += other.skipped;
        self.projection_unavailable |= other.projection_unavailable;
    }
}

impl<L: DefinitionLookup> Transformer<L> {
    /// Transform every coordinate of a geometry value.
    ///
    /// Never fails: unresolved definitions route all coordinates through the
    /// fallback, which the returned report reflects.
    pub async fn transform_geometry(
        &self,
        value: &Value,
        from_crs: &str,
        to_crs: &str,
    ) -> (Value, TransformReport) {
        self.strategy(from_crs, to_crs)
            .await
            .transform_value(value, from_crs)
    }
}

impl Strategy {
    /// Map every coordinate of a geometry value through this strategy.
    pub(crate) fn transform_value(&self, value: &Value, from_crs: &str) -> (Value, TransformReport) {
        let mut report = TransformReport {
            projection_unavailable: matches!(self, Strategy::Fallback),
            ..TransformReport::default()
        };

        let value = GeometryMapper {
            strategy: self,
            from_crs,
            report: &mut report,
        }
        .value(value);

        (value, report)
    }
}

/// Walks a geometry tree applying one strategy.
struct GeometryMapper<'a> {
    strategy: &'a Strategy,
    from_crs: &'a str,
    report: &'a mut TransformReport,
}

impl GeometryMapper<'_> {
    fn value(&mut self, value: &Value) -> Value {
        match value {
            Value::Point(position) => Value::Point(self.position(position)),
            Value::MultiPoint(positions) => Value::MultiPoint(self.line(positions)),
            Value::LineString(positions) => Value::LineString(self.line(positions)),
            Value::MultiLineString(lines) => Value::MultiLineString(self.lines(lines)),
            Value::Polygon(rings) => Value::Polygon(self.lines(rings)),
            Value::MultiPolygon(polygons) => Value::MultiPolygon(
                polygons.iter().map(|rings| self.lines(rings)).collect(),
            ),
            Value::GeometryCollection(geometries) => Value::GeometryCollection(
                geometries.iter().map(|geometry| self.geometry(geometry)).collect(),
            ),
        }
    }

    fn geometry(&mut self, geometry: &Geometry) -> Geometry {
        Geometry {
            value: self.value(&geometry.value),
            bbox: None,
            foreign_members: geometry.foreign_members.clone(),
        }
    }

    fn lines(&mut self, lines: &[Vec<Position>]) -> Vec<Vec<Position>> {
        lines.iter().map(|line| self.line(line)).collect()
    }

    fn line(&mut self, positions: &[Position]) -> Vec<Position> {
        positions.iter().map(|position| self.position(position)).collect()
    }

    fn position(&mut self, position: &Position) -> Position {
        let Some(coord) = Coordinate::from_position(position) else {
            self.report.skipped += 1;
            return position.clone();
        };

        let (projected, outcome) = self.strategy.apply(coord, self.from_crs);
        self.report.record(outcome);

        let mut out = position.clone();
        out[0] = projected.x;
        out[1] = projected.y;
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::WGS84;
    use crate::resolver::Resolver;
    use proptest::prelude::*;

    fn offline() -> Transformer<crate::Offline> {
        Transformer::new(Resolver::offline())
    }

    fn utm_ring() -> Vec<Position> {
        vec![
            vec![573_729.31, 4_957_893.41],
            vec![574_729.31, 4_957_893.41],
            vec![574_729.31, 4_958_893.41],
            vec![573_729.31, 4_957_893.41],
        ]
    }

    fn shape(value: &Value) -> Vec<usize> {
        match value {
            Value::Point(_) => vec![1],
            Value::MultiPoint(p) | Value::LineString(p) => vec![p.len()],
            Value::MultiLineString(l) | Value::Polygon(l) => l.iter().map(Vec::len).collect(),
            Value::MultiPolygon(p) => p.iter().flat_map(|r| r.iter().map(Vec::len)).collect(),
            Value::GeometryCollection(g) => g.iter().flat_map(|g| shape(&g.value)).collect(),
        }
    }

    #[tokio::test]
    async fn test_polygon_shape_preserved() {
        let input = Value::Polygon(vec![utm_ring(), utm_ring()]);
        let (output, report) = offline().transform_geometry(&input, "6346", WGS84).await;

        assert_eq!(shape(&output), shape(&input));
        assert_eq!(report.exact, 8);
        assert!(report.is_exact());
        assert!(!report.projection_unavailable);

        let Value::Polygon(rings) = output else { panic!("expected polygon") };
        for position in rings.iter().flatten() {
            assert!((-81.0..-79.0).contains(&position[0]));
            assert!((44.0..45.5).contains(&position[1]));
        }
    }

    #[tokio::test]
    async fn test_extra_ordinates_preserved() {
        let input = Value::LineString(vec![
            vec![573_729.31, 4_957_893.41, 212.5],
            vec![574_729.31, 4_957_893.41, 213.0, 7.0],
        ]);
        let (output, _) = offline().transform_geometry(&input, "6346", WGS84).await;

        let Value::LineString(positions) = output else { panic!("expected line") };
        assert_eq!(positions[0].len(), 3);
        assert_eq!(positions[0][2], 212.5);
        assert_eq!(positions[1][2..], [213.0, 7.0]);
    }

    #[tokio::test]
    async fn test_short_positions_are_skipped() {
        let input = Value::MultiPoint(vec![vec![1.0], vec![573_729.31, 4_957_893.41]]);
        let (output, report) = offline().transform_geometry(&input, "6346", WGS84).await;

        let Value::MultiPoint(positions) = output else { panic!("expected multipoint") };
        assert_eq!(positions[0], vec![1.0]);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.exact, 1);
    }

    #[tokio::test]
    async fn test_unresolved_uses_fallback_everywhere() {
        let input = Value::MultiPolygon(vec![vec![utm_ring()]]);
        let (output, report) = offline().transform_geometry(&input, "9999", WGS84).await;

        assert!(report.projection_unavailable);
        assert_eq!(report.approximate, 4);
        assert!(!report.is_exact());
        assert_eq!(shape(&output), shape(&input));
    }

    #[tokio::test]
    async fn test_geometry_collection_recurses() {
        let input = Value::GeometryCollection(vec![
            Geometry::new(Value::Point(vec![573_729.31, 4_957_893.41])),
            Geometry::new(Value::LineString(utm_ring())),
        ]);
        let (output, report) = offline().transform_geometry(&input, "6346", WGS84).await;

        assert_eq!(report.exact, 5);
        assert_eq!(shape(&output), shape(&input));
    }

    #[tokio::test]
    async fn test_identity_leaves_values_untouched() {
        let input = Value::Point(vec![-98.5795, 39.8283]);
        let (output, report) = offline().transform_geometry(&input, WGS84, WGS84).await;
        assert_eq!(output, input);
        assert_eq!(report.exact, 1);
    }

    #[test]
    fn test_report_merge() {
        let mut total = TransformReport { exact: 2, ..Default::default() };
        total += TransformReport {
            approximate: 1,
            unrecognized: 1,
            projection_unavailable: true,
            ..Default::default()
        };
        assert_eq!(total.total(), 4);
        assert!(total.projection_unavailable);
    }

    proptest! {
        #[test]
        fn prop_shape_preserved(
            rings in prop::collection::vec(
                prop::collection::vec(
                    prop::collection::vec(100_000.0f64..900_000.0, 2..4),
                    0..6,
                ),
                0..4,
            )
        ) {
            let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
            let input = Value::Polygon(rings);
            let (output, report) = runtime.block_on(offline().transform_geometry(&input, "9999", WGS84));

            prop_assert_eq!(shape(&output), shape(&input));
            prop_assert_eq!(report.total(), shape(&input).iter().sum::<usize>());
        }
    }
}
