use std::{fs, path::{Path, PathBuf}};

use anyhow::{bail, Context, Result};
use tempfile::TempDir;

use crate::{
    alloc::{AllocationResult, AllocationWarning},
    common,
    grid::GridSpec,
    layer::PolygonLayer,
};

use super::{csv, shp};

/// Destination for the records of a finished allocation run.
pub trait AllocationSink {
    fn write(&mut self, result: &AllocationResult, data: &PolygonLayer) -> Result<()>;

    /// Non-fatal problems met while writing.
    fn warnings(&self) -> &[AllocationWarning] { &[] }
}

/// Scratch directory next to the destination. Files are written here and
/// renamed into place once all of them exist; dropping it discards them.
struct Staging {
    dir: TempDir,
}

impl Staging {
    fn next_to(dest: &Path) -> Result<Self> {
        let parent = common::parent_dir(dest);
        common::ensure_dir_exists(&parent)?;
        let dir = tempfile::Builder::new()
            .prefix(".alloc-")
            .tempdir_in(&parent)
            .with_context(|| format!("[io::sink] Failed to create staging directory in {}", parent.display()))?;
        Ok(Self { dir })
    }

    /// Staged location of `dest`.
    fn path(&self, dest: &Path) -> Result<PathBuf> {
        match dest.file_name() {
            Some(name) => Ok(self.dir.path().join(name)),
            None => bail!("[io::sink] Output path has no file name: {}", dest.display()),
        }
    }

    /// Replace every destination with its staged file.
    fn commit(self, dests: &[PathBuf]) -> Result<()> {
        common::remove_existing(dests)?;
        for dest in dests {
            let staged = self.path(dest)?;
            fs::rename(&staged, dest)
                .with_context(|| format!("[io::sink] Failed to move {} into place", dest.display()))?;
        }
        Ok(())
    }
}

/// Writes the result as a polygon shapefile (`.shp`, `.shx`, `.dbf`) with
/// the data layer's geometry, plus a `.csv` copy of the attribute table.
/// The CSV keeps field names the DBF header is too short for.
pub struct ShapefileSink {
    path: PathBuf,
    verbose: u8,
    warnings: Vec<AllocationWarning>,
}

impl ShapefileSink {
    pub fn new(path: impl Into<PathBuf>, verbose: u8) -> Self {
        Self { path: path.into().with_extension("shp"), verbose, warnings: Vec::new() }
    }

    /// Every file this sink produces.
    pub fn outputs(&self) -> Vec<PathBuf> {
        common::sibling_paths(&self.path, &["shp", "shx", "dbf", "csv"])
    }
}

impl AllocationSink for ShapefileSink {
    fn write(&mut self, result: &AllocationResult, data: &PolygonLayer) -> Result<()> {
        let staging = Staging::next_to(&self.path)?;
        let shp_path = staging.path(&self.path)?;

        let renamed = shp::write_layer(&shp_path, result.schema(), result.records(), data.geoms())?;
        csv::write_csv(&mut csv::result_frame(result)?, &shp_path.with_extension("csv"))?;

        staging.commit(&self.outputs())?;
        self.warnings.extend(renamed);
        if self.verbose > 0 { eprintln!("[io::sink] wrote {} polygons -> {}", result.len(), self.path.display()); }
        Ok(())
    }

    fn warnings(&self) -> &[AllocationWarning] { &self.warnings }
}

/// Writes a grid-cell table keyed by `COL,ROW`.
pub struct GridTableSink {
    path: PathBuf,
    grid: GridSpec,
    verbose: u8,
    warnings: Vec<AllocationWarning>,
}

impl GridTableSink {
    pub fn new(path: impl Into<PathBuf>, grid: GridSpec, verbose: u8) -> Self {
        Self { path: path.into(), grid, verbose, warnings: Vec::new() }
    }
}

impl AllocationSink for GridTableSink {
    fn write(&mut self, result: &AllocationResult, _data: &PolygonLayer) -> Result<()> {
        if result.len() != self.grid.len() {
            bail!("[io::sink] {} output polygons cannot fill grid {} of {} cells",
                result.len(), self.grid.name, self.grid.len());
        }

        let (mut df, skipped) = csv::grid_frame(result, &self.grid)?;
        self.warnings.extend(skipped);

        let staging = Staging::next_to(&self.path)?;
        csv::write_csv(&mut df, &staging.path(&self.path)?)?;
        staging.commit(std::slice::from_ref(&self.path))?;

        if self.verbose > 0 { eprintln!("[io::sink] wrote {} cells -> {}", result.len(), self.path.display()); }
        Ok(())
    }

    fn warnings(&self) -> &[AllocationWarning] { &self.warnings }
}

#[cfg(test)]
mod tests {
    use crate::{
        alloc::{AllocationEngine, AllocationMode, AllocationModeTable, AllocationOptions},
        layer::{fixtures::*, AttrValue, FieldType, IntersectionLayer},
    };

    use super::*;

    fn run(modes: AllocationModeTable) -> (PolygonLayer, AllocationResult) {
        let grid = GridSpec { name: "g".into(), ncols: 2, nrows: 2, xorig: 0.0, yorig: 0.0, xcell: 10.0, ycell: 10.0 }
            .to_layer().unwrap();
        let w = layer("w", vec![rect(0.0, 0.0, 20.0, 20.0)], vec![
            ("POP", FieldType::Double, doubles(&[100.0])),
            ("NAME", FieldType::String, strings(&["all"])),
        ]);
        let pieces = IntersectionLayer::overlay(&w, &grid);
        let result = AllocationEngine::new(&w, &grid, &pieces, &modes, AllocationOptions::default()).run().unwrap();
        (grid, result)
    }

    #[test]
    fn shapefile_sink_replaces_existing_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("result.shp");
        fs::write(dir.path().join("result.dbf"), b"stale").unwrap();

        let (grid, result) = run(AllocationModeTable::All(AllocationMode::DiscreteOverlap));
        let mut sink = ShapefileSink::new(&out, 0);
        sink.write(&result, &grid).unwrap();

        for path in sink.outputs() {
            assert!(path.exists(), "{}", path.display());
        }
        let back = shp::read_layer(&out).unwrap();
        assert_eq!(back.len(), 4);
        assert_eq!(back.schema().position("NAME"), Some(3));
        assert_eq!(back.value(0usize.into(), 3), &AttrValue::String("all".into()));
        // Only the outputs remain; the staging directory is gone.
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 4);
    }

    #[test]
    fn shapefile_sink_shortens_long_field_names() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("landuse.shp");
        let grid = GridSpec { name: "g".into(), ncols: 2, nrows: 1, xorig: 0.0, yorig: 0.0, xcell: 10.0, ycell: 10.0 }
            .to_layer().unwrap();
        let w = layer("w", vec![rect(0.0, 0.0, 10.0, 10.0), rect(10.0, 0.0, 20.0, 10.0)], vec![
            ("LANDUSE", FieldType::String, strings(&["forest", "forage"])),
        ]);
        let pieces = IntersectionLayer::overlay(&w, &grid);
        let modes = AllocationModeTable::All(AllocationMode::AreaPercent);
        let result = AllocationEngine::new(&w, &grid, &pieces, &modes, AllocationOptions::default()).run().unwrap();

        let mut sink = ShapefileSink::new(&out, 0);
        sink.write(&result, &grid).unwrap();
        assert_eq!(sink.warnings(), &[
            AllocationWarning::RenamedField { attribute: "LANDUSE_forest".into(), stored_as: "LANDUSE_fo".into() },
            AllocationWarning::RenamedField { attribute: "LANDUSE_forage".into(), stored_as: "LANDUSE_f1".into() },
        ]);

        let back = shp::read_layer(&out).unwrap();
        let names = back.schema().fields().iter().map(|f| f.name.as_str()).collect::<Vec<_>>();
        assert_eq!(names, vec!["COL", "ROW", "LANDUSE_fo", "LANDUSE_f1"]);
        assert_eq!(back.value(0usize.into(), 2).as_f64(), Some(1.0));
        assert_eq!(back.value(1usize.into(), 3).as_f64(), Some(1.0));

        let table = csv::read_csv(&out.with_extension("csv")).unwrap();
        let names = table.get_column_names().iter().map(|n| n.to_string()).collect::<Vec<_>>();
        assert_eq!(names, vec!["COL", "ROW", "LANDUSE_forest", "LANDUSE_forage"]);
    }

    #[test]
    fn grid_sink_skips_string_fields() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("nested/grid.csv");
        let grid = GridSpec { name: "g".into(), ncols: 2, nrows: 2, xorig: 0.0, yorig: 0.0, xcell: 10.0, ycell: 10.0 };

        let (layer, result) = run(AllocationModeTable::All(AllocationMode::DiscreteCentroid));
        let mut sink = GridTableSink::new(&out, grid, 0);
        sink.write(&result, &layer).unwrap();

        assert_eq!(sink.warnings().len(), 1);
        assert!(matches!(&sink.warnings()[0], AllocationWarning::SkippedField { attribute, .. } if attribute == "NAME"));

        let df = csv::read_csv(&out).unwrap();
        let names = df.get_column_names().iter().map(|n| n.to_string()).collect::<Vec<_>>();
        assert_eq!(names, vec!["COL", "ROW", "POP"]);
        assert_eq!(df.height(), 4);
    }

    #[test]
    fn grid_sink_rejects_wrong_cell_count() {
        let dir = tempfile::tempdir().unwrap();
        let grid = GridSpec { name: "g".into(), ncols: 3, nrows: 2, xorig: 0.0, yorig: 0.0, xcell: 1.0, ycell: 1.0 };
        let (layer, result) = run(AllocationModeTable::All(AllocationMode::DiscreteOverlap));
        let mut sink = GridTableSink::new(dir.path().join("g.csv"), grid, 0);
        assert!(sink.write(&result, &layer).is_err());
    }
}
