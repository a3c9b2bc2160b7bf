mod intersect;
mod layer;
mod schema;
mod value;

pub use intersect::{IntersectionLayer, Piece};
pub use layer::{PolygonId, PolygonLayer};
pub use schema::{AttributeSchema, FieldDef};
pub use value::{AttrValue, FieldType, MISSING_DOUBLE, MISSING_INT, MISSING_STR};

#[cfg(test)]
pub(crate) mod fixtures {
    use geo::{polygon, MultiPolygon};

    use crate::geom::Geometries;

    use super::*;

    /// Axis-aligned rectangle as a MultiPolygon.
    pub(crate) fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> MultiPolygon<f64> {
        MultiPolygon(vec![polygon![
            (x: x0, y: y0),
            (x: x1, y: y0),
            (x: x1, y: y1),
            (x: x0, y: y1),
            (x: x0, y: y0),
        ]])
    }

    /// Layer with the given shapes and columns (name, type, values per polygon).
    pub(crate) fn layer(name: &str, shapes: Vec<MultiPolygon<f64>>, columns: Vec<(&str, FieldType, Vec<AttrValue>)>) -> PolygonLayer {
        let schema = AttributeSchema::new(columns.iter()
            .map(|(name, ty, _)| FieldDef::new(*name, *ty))
            .collect());
        let records = (0..shapes.len())
            .map(|i| columns.iter().map(|(_, _, values)| values[i].clone()).collect())
            .collect();
        PolygonLayer::new(name, schema, records, Geometries::new(shapes)).unwrap()
    }

    pub(crate) fn ints(values: &[i64]) -> Vec<AttrValue> {
        values.iter().map(|&v| AttrValue::Integer(v)).collect()
    }

    pub(crate) fn doubles(values: &[f64]) -> Vec<AttrValue> {
        values.iter().map(|&v| AttrValue::Double(v)).collect()
    }

    pub(crate) fn strings(values: &[&str]) -> Vec<AttrValue> {
        values.iter().map(|&v| AttrValue::String(v.to_string())).collect()
    }

    /// 2x2 grid of 10x10 cells, row-major from the bottom-left.
    pub(crate) fn grid_2x2() -> PolygonLayer {
        layer("grid", vec![
            rect(0.0, 0.0, 10.0, 10.0),
            rect(10.0, 0.0, 20.0, 10.0),
            rect(0.0, 10.0, 10.0, 20.0),
            rect(10.0, 10.0, 20.0, 20.0),
        ], vec![("CELL", FieldType::Integer, ints(&[1, 2, 3, 4]))])
    }
}

#[cfg(test)]
mod tests {
    use super::{fixtures::*, *};

    #[test]
    fn layer_rejects_mistyped_records() {
        let schema = AttributeSchema::new(vec![FieldDef::new("POP", FieldType::Double)]);
        let geoms = crate::geom::Geometries::new(vec![rect(0.0, 0.0, 1.0, 1.0)]);
        let err = PolygonLayer::new("w", schema, vec![vec![AttrValue::String("x".into())]], geoms).unwrap_err();
        assert!(err.to_string().contains("POP"));
    }

    #[test]
    fn layer_rejects_record_count_mismatch() {
        let schema = AttributeSchema::new(vec![FieldDef::new("POP", FieldType::Double)]);
        let geoms = crate::geom::Geometries::new(vec![rect(0.0, 0.0, 1.0, 1.0)]);
        assert!(PolygonLayer::new("w", schema, vec![], geoms).is_err());
    }

    #[test]
    fn overlay_orders_pieces_and_keeps_back_references() {
        let weights = layer("w", vec![
            rect(0.0, 0.0, 20.0, 10.0),  // covers the bottom row
            rect(5.0, 10.0, 15.0, 20.0), // straddles the top row
        ], vec![("POP", FieldType::Integer, ints(&[10, 20]))]);
        let grid = grid_2x2();

        let overlay = IntersectionLayer::overlay(&weights, &grid);
        let got = overlay.pieces().iter()
            .map(|p| (p.weight.0, p.data.0))
            .collect::<Vec<_>>();
        assert_eq!(got, vec![(0, 0), (0, 1), (1, 2), (1, 3)]);
        for (piece, expected) in overlay.pieces().iter().zip([100.0, 100.0, 50.0, 50.0]) {
            assert!((piece.area - expected).abs() < 1e-6, "{piece:?}");
        }
        assert_eq!(overlay.source_weight_index(2), PolygonId(1));
        assert_eq!(overlay.source_data_index(3), PolygonId(3));
    }

    #[test]
    fn overlay_drops_boundary_touches() {
        let weights = layer("w", vec![rect(20.0, 0.0, 30.0, 10.0)], vec![]);
        assert!(IntersectionLayer::overlay(&weights, &grid_2x2()).is_empty());
    }

    #[test]
    fn from_pieces_checks_bounds() {
        let weights = layer("w", vec![rect(0.0, 0.0, 1.0, 1.0)], vec![]);
        let grid = grid_2x2();
        assert!(IntersectionLayer::from_pieces(vec![Piece::new(0usize, 3usize, 1.0)], &weights, &grid).is_ok());
        let err = IntersectionLayer::from_pieces(vec![Piece::new(0usize, 4usize, 1.0)], &weights, &grid).unwrap_err();
        assert!(err.to_string().contains("data polygon 4"));
        assert!(IntersectionLayer::from_pieces(vec![Piece::new(1usize, 0usize, 1.0)], &weights, &grid).is_err());
    }
}
