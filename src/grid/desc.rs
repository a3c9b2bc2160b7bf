use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::{
    alloc::AllocationError,
    geom::Geometries,
    layer::{AttrValue, AttributeSchema, FieldDef, FieldType, PolygonLayer},
};

/// A regular grid of `ncols x nrows` rectangular cells. Row 1 sits at
/// `yorig`, column 1 at `xorig`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridSpec {
    pub name: String,
    pub ncols: usize,
    pub nrows: usize,
    pub xorig: f64, // x of the lower-left corner
    pub yorig: f64, // y of the lower-left corner
    pub xcell: f64, // cell width
    pub ycell: f64, // cell height
}

impl GridSpec {
    pub const COL_FIELD: &'static str = "COL";
    pub const ROW_FIELD: &'static str = "ROW";

    /// Load a grid description from a JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self, AllocationError> {
        let text = fs::read_to_string(path)
            .map_err(|source| AllocationError::Io { path: path.to_path_buf(), source })?;
        let grid: Self = serde_json::from_str(&text)
            .map_err(|err| AllocationError::config(format!("invalid grid description {}: {err}", path.display())))?;
        grid.validate()?;
        Ok(grid)
    }

    fn validate(&self) -> Result<(), AllocationError> {
        if self.ncols == 0 || self.nrows == 0 {
            return Err(AllocationError::config(format!(
                "grid {} must have at least one row and column (got {} x {})", self.name, self.nrows, self.ncols
            )));
        }
        if !(self.xcell > 0.0 && self.ycell > 0.0) {
            return Err(AllocationError::config(format!(
                "grid {} cell size must be positive (got {} x {})", self.name, self.xcell, self.ycell
            )));
        }
        Ok(())
    }

    /// (rows, cols), as expected by `AllocationOptions::grid_shape`.
    #[inline] pub fn shape(&self) -> (usize, usize) { (self.nrows, self.ncols) }

    #[inline] pub fn len(&self) -> usize { self.nrows * self.ncols }

    #[inline] pub fn is_empty(&self) -> bool { self.len() == 0 }

    /// 1-based (col, row) of the cell at row-major index `i`.
    #[inline] pub fn cell(&self, i: usize) -> (usize, usize) { (i % self.ncols + 1, i / self.ncols + 1) }

    /// The grid as a polygon layer, one cell per polygon in row-major order
    /// from the lower-left corner, carrying `COL` and `ROW`.
    pub fn to_layer(&self) -> Result<PolygonLayer, AllocationError> {
        self.validate()?;
        let schema = AttributeSchema::new(vec![
            FieldDef::new(Self::COL_FIELD, FieldType::Integer),
            FieldDef::new(Self::ROW_FIELD, FieldType::Integer),
        ]);

        let (shapes, records) = (0..self.len())
            .map(|i| {
                let (col, row) = self.cell(i);
                let x0 = self.xorig + (col - 1) as f64 * self.xcell;
                let y0 = self.yorig + (row - 1) as f64 * self.ycell;
                let rect = geo::Rect::new((x0, y0), (x0 + self.xcell, y0 + self.ycell));
                (
                    geo::MultiPolygon(vec![rect.to_polygon()]),
                    vec![AttrValue::Integer(col as i64), AttrValue::Integer(row as i64)],
                )
            })
            .unzip::<_, _, Vec<_>, Vec<_>>();

        PolygonLayer::new(self.name.clone(), schema, records, Geometries::new(shapes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn three_by_two() -> GridSpec {
        GridSpec { name: "G".into(), ncols: 3, nrows: 2, xorig: 100.0, yorig: -50.0, xcell: 10.0, ycell: 5.0 }
    }

    #[test]
    fn cells_are_row_major_from_lower_left() {
        let grid = three_by_two();
        let layer = grid.to_layer().unwrap();
        assert_eq!(layer.len(), 6);
        assert_eq!(grid.shape(), (2, 3));
        assert_eq!(grid.cell(0), (1, 1));
        assert_eq!(grid.cell(2), (3, 1));
        assert_eq!(grid.cell(3), (1, 2));

        assert_eq!(layer.record(4.into()), &[AttrValue::Integer(2), AttrValue::Integer(2)]);
        assert!((layer.area(4.into()) - 50.0).abs() < 1e-9);
        let c = layer.geoms().centroid(4).unwrap();
        assert!((c.x() - 115.0).abs() < 1e-9 && (c.y() - -42.5).abs() < 1e-9);
    }

    #[test]
    fn reads_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grid.json");
        fs::write(&path, serde_json::to_string(&three_by_two()).unwrap()).unwrap();
        assert_eq!(GridSpec::from_json_file(&path).unwrap(), three_by_two());

        fs::write(&path, r#"{"name":"G","ncols":0,"nrows":2,"xorig":0,"yorig":0,"xcell":1,"ycell":1}"#).unwrap();
        assert!(matches!(GridSpec::from_json_file(&path), Err(AllocationError::Configuration(_))));

        fs::write(&path, "{").unwrap();
        assert!(matches!(GridSpec::from_json_file(&path), Err(AllocationError::Configuration(_))));
    }
}
