//! Shapefile + DBF reading.

use std::path::Path;

use anyhow::{Context, Result};
use shapefile::{dbase::{self, FieldValue, Record}, Reader};

use crate::{
    common,
    geom::Geometries,
    layer::{AttrValue, AttributeSchema, FieldDef, FieldType, PolygonLayer},
};

/// Name dbase gives the record deletion marker when it lists it among the fields.
const DELETION_FLAG: &str = "DeletionFlag";

/// Reads a polygon layer (geometries and DBF attributes) from a `.shp` path.
/// The layer is named after the file stem.
pub fn read_layer(path: &Path) -> Result<PolygonLayer> {
    common::require_file_exists(path)?;

    // Column order comes from the DBF header; records are keyed by name.
    let dbf_path = path.with_extension("dbf");
    let columns = dbase::Reader::from_path(&dbf_path)
        .with_context(|| format!("[io::shp::read] Failed to open attribute table: {}", dbf_path.display()))?
        .fields().iter()
        .filter(|field| field.name() != DELETION_FLAG)
        .map(|field| (field.name().to_string(), field.field_type()))
        .collect::<Vec<_>>();

    let mut reader = Reader::from_path(path)
        .with_context(|| format!("[io::shp::read] Failed to open shapefile: {}", path.display()))?;
    let mut shapes = Vec::new();
    let mut rows = Vec::new();
    for (i, item) in reader.iter_shapes_and_records().enumerate() {
        let (shape, record) = item
            .with_context(|| format!("[io::shp::read] Error reading shape {i} of {}", path.display()))?;
        shapes.push(common::shape_to_multipolygon(shape)
            .with_context(|| format!("[io::shp::read] Shape {i} of {}", path.display()))?);
        rows.push(record);
    }

    let fields = columns.iter()
        .map(|(name, ty)| FieldDef::new(name.clone(), column_type(name, *ty, &rows)))
        .collect::<Vec<_>>();

    let records = rows.iter()
        .map(|row| fields.iter().map(|field| attr_value(row, field)).collect())
        .collect();

    let name = path.file_stem().map_or_else(|| path.display().to_string(), |s| s.to_string_lossy().into_owned());
    Ok(PolygonLayer::new(name, AttributeSchema::new(fields), records, Geometries::new(shapes))?)
}

/// Declared type of a DBF column. Numeric columns whose values are all
/// whole numbers are read as integers.
fn column_type(name: &str, ty: dbase::FieldType, rows: &[Record]) -> FieldType {
    match ty {
        dbase::FieldType::Character | dbase::FieldType::Memo => FieldType::String,
        dbase::FieldType::Integer => FieldType::Integer,
        dbase::FieldType::Float | dbase::FieldType::Double | dbase::FieldType::Currency => FieldType::Double,
        dbase::FieldType::Numeric => {
            let integral = rows.iter().all(|row| match row.get(name) {
                Some(FieldValue::Numeric(Some(v))) => v.fract() == 0.0 && v.abs() < i64::MAX as f64,
                _ => true,
            });
            if integral { FieldType::Integer } else { FieldType::Double }
        }
        _ => FieldType::Invalid,
    }
}

/// Typed value of `field` in one DBF record. Blank cells read as zero or an
/// empty string; MISSING is only ever written, never read.
fn attr_value(row: &Record, field: &FieldDef) -> AttrValue {
    let Some(value) = row.get(&field.name) else { return blank(field.ty) };
    match (field.ty, value) {
        (FieldType::String, FieldValue::Character(Some(s)) | FieldValue::Memo(s)) => AttrValue::String(s.trim().to_string()),
        (FieldType::Integer, FieldValue::Numeric(Some(v))) => AttrValue::Integer(*v as i64),
        (FieldType::Integer, FieldValue::Integer(v)) => AttrValue::Integer(i64::from(*v)),
        (FieldType::Double, FieldValue::Numeric(Some(v)) | FieldValue::Double(v) | FieldValue::Currency(v)) => AttrValue::Double(*v),
        (FieldType::Double, FieldValue::Float(Some(v))) => AttrValue::Double(f64::from(*v)),
        (FieldType::Invalid, FieldValue::Logical(Some(b))) => AttrValue::Invalid(if *b { "T" } else { "F" }.to_string()),
        (FieldType::Invalid, FieldValue::Date(Some(d))) => {
            AttrValue::Invalid(format!("{:04}{:02}{:02}", d.year(), d.month(), d.day()))
        }
        (FieldType::Invalid, other) => AttrValue::Invalid(format!("{other:?}")),
        (ty, _) => blank(ty),
    }
}

#[inline]
fn blank(ty: FieldType) -> AttrValue {
    match ty {
        FieldType::Integer => AttrValue::Integer(0),
        FieldType::Double => AttrValue::Double(0.0),
        FieldType::String => AttrValue::String(String::new()),
        FieldType::Invalid => AttrValue::Invalid(String::new()),
    }
}

#[cfg(test)]
mod tests {
    use shapefile::{
        dbase::{FieldName, TableWriterBuilder},
        Writer,
    };

    use crate::layer::fixtures::rect;

    use super::*;

    /// Two 10x10 squares with a POP, SHARE and NAME column, blank in the second row.
    fn write_with_blanks(path: &Path) {
        let table = TableWriterBuilder::new()
            .add_numeric_field(FieldName::try_from("POP").unwrap(), 20, 0)
            .add_numeric_field(FieldName::try_from("SHARE").unwrap(), 20, 5)
            .add_character_field(FieldName::try_from("NAME").unwrap(), 20);
        let mut writer = Writer::from_path(path, table).unwrap();

        let rows = [
            (Some(40.0), Some(0.25), Some("west".to_string())),
            (None, None, None),
        ];
        for (i, (pop, share, name)) in rows.into_iter().enumerate() {
            let x0 = 10.0 * i as f64;
            let shape = common::multipolygon_to_shape(&rect(x0, 0.0, x0 + 10.0, 10.0));
            let mut record = Record::default();
            record.insert("POP".to_string(), FieldValue::Numeric(pop));
            record.insert("SHARE".to_string(), FieldValue::Numeric(share));
            record.insert("NAME".to_string(), FieldValue::Character(name));
            writer.write_shape_and_record(&shape, &record).unwrap();
        }
    }

    #[test]
    fn blank_cells_read_as_zero_or_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("w.shp");
        write_with_blanks(&path);

        let layer = read_layer(&path).unwrap();
        let types = layer.schema().fields().iter().map(|f| f.ty).collect::<Vec<_>>();
        // A blank cell does not stop a whole-number column from reading as integers.
        assert_eq!(types, vec![FieldType::Integer, FieldType::Double, FieldType::String]);

        assert_eq!(layer.record(0usize.into()), &[
            AttrValue::Integer(40),
            AttrValue::Double(0.25),
            AttrValue::String("west".into()),
        ]);
        assert_eq!(layer.record(1usize.into()), &[
            AttrValue::Integer(0),
            AttrValue::Double(0.0),
            AttrValue::String(String::new()),
        ]);
    }
}
