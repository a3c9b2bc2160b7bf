//! Shapefile + DBF writing.

use std::path::Path;

use ahash::AHashSet;
use anyhow::{ensure, Context, Result};
use shapefile::{
    dbase::{FieldName, FieldValue, Record, TableWriterBuilder},
    Writer,
};

use crate::{
    alloc::AllocationWarning,
    common,
    geom::Geometries,
    layer::{AttrValue, AttributeSchema, FieldType},
};

/// Minimum width of every DBF column.
pub const FIELD_WIDTH: u8 = 20;

/// Decimal places kept for double-valued columns.
pub const DOUBLE_DECIMALS: u8 = 5;

/// Longest field name a DBF header can hold.
const MAX_FIELD_NAME: usize = 10;

/// First `max` bytes of `name`, cut on a character boundary.
fn truncate(name: &str, max: usize) -> &str {
    let end = name.char_indices().map(|(i, c)| i + c.len_utf8()).take_while(|&end| end <= max).last().unwrap_or(0);
    &name[..end]
}

/// DBF column names for `schema`. Names that fit are kept; longer ones are
/// cut to the limit, and a numeric suffix replaces their tail when the cut
/// name is already taken. Names are compared case-insensitively.
pub fn dbf_field_names(schema: &AttributeSchema) -> Vec<String> {
    let mut taken = schema.fields().iter()
        .filter(|f| f.name.len() <= MAX_FIELD_NAME)
        .map(|f| f.name.to_ascii_uppercase())
        .collect::<AHashSet<_>>();

    schema.fields().iter()
        .map(|field| {
            if field.name.len() <= MAX_FIELD_NAME { return field.name.clone(); }
            let mut name = truncate(&field.name, MAX_FIELD_NAME).to_string();
            let mut n = 1usize;
            while taken.contains(&name.to_ascii_uppercase()) {
                let suffix = n.to_string();
                name = format!("{}{suffix}", truncate(&field.name, MAX_FIELD_NAME - suffix.len()));
                n += 1;
            }
            taken.insert(name.to_ascii_uppercase());
            name
        })
        .collect()
}

/// Writes `records` (sharing `schema`) and their geometries to a `.shp`
/// path, along with its `.shx` and `.dbf`. Returns one warning per field
/// whose name had to be shortened to fit the DBF header.
pub fn write_layer(path: &Path, schema: &AttributeSchema, records: &[Vec<AttrValue>], geoms: &Geometries) -> Result<Vec<AllocationWarning>> {
    ensure!(records.len() == geoms.len(),
        "[io::shp::write] {} records but {} geometries", records.len(), geoms.len());

    let names = dbf_field_names(schema);
    let renamed = schema.fields().iter().zip(&names)
        .filter(|(field, name)| field.name != **name)
        .map(|(field, name)| AllocationWarning::RenamedField { attribute: field.name.clone(), stored_as: name.clone() })
        .collect::<Vec<_>>();

    let mut table = TableWriterBuilder::new();
    for (i, (field, dbf_name)) in schema.fields().iter().zip(&names).enumerate() {
        let name = FieldName::try_from(dbf_name.as_str())
            .map_err(|err| anyhow::anyhow!("[io::shp::write] invalid field name {dbf_name}: {err:?}"))?;
        table = match field.ty {
            FieldType::Integer => table.add_numeric_field(name, FIELD_WIDTH, 0),
            FieldType::Double => table.add_numeric_field(name, FIELD_WIDTH, DOUBLE_DECIMALS),
            FieldType::String | FieldType::Invalid => {
                let longest = records.iter().map(|r| r[i].canonical().len()).max().unwrap_or(0);
                table.add_character_field(name, longest.clamp(FIELD_WIDTH as usize, 254) as u8)
            }
        };
    }

    let mut writer = Writer::from_path(path, table)
        .with_context(|| format!("[io::shp::write] Failed to create shapefile: {}", path.display()))?;

    for (i, values) in records.iter().enumerate() {
        let mut record = Record::default();
        for (name, value) in names.iter().zip(values) {
            record.insert(name.clone(), field_value(value));
        }
        writer.write_shape_and_record(&common::multipolygon_to_shape(geoms.shape(i)), &record)
            .with_context(|| format!("[io::shp::write] Failed to write polygon {i} to {}", path.display()))?;
    }

    Ok(renamed)
}

#[inline]
fn field_value(value: &AttrValue) -> FieldValue {
    match value {
        AttrValue::Integer(v) => FieldValue::Numeric(Some(*v as f64)),
        AttrValue::Double(v) => FieldValue::Numeric(Some(*v)),
        AttrValue::String(s) | AttrValue::Invalid(s) => FieldValue::Character(Some(s.clone())),
    }
}

#[cfg(test)]
mod tests {
    use crate::layer::FieldDef;

    use super::*;

    fn schema(names: &[&str]) -> AttributeSchema {
        AttributeSchema::new(names.iter().map(|&n| FieldDef::new(n, FieldType::Double)).collect())
    }

    #[test]
    fn long_names_are_cut_to_unique_dbf_names() {
        let names = dbf_field_names(&schema(&["POP", "LANDUSE_forest", "LANDUSE_forage", "LANDUSE_fo", "LANDUSE_water"]));
        assert_eq!(names, vec!["POP", "LANDUSE_f1", "LANDUSE_f2", "LANDUSE_fo", "LANDUSE_wa"]);
    }

    #[test]
    fn suffixes_grow_past_nine() {
        let fields = (0..12).map(|i| format!("CATEGORY_{i:02}")).collect::<Vec<_>>();
        let names = dbf_field_names(&schema(&fields.iter().map(String::as_str).collect::<Vec<_>>()));
        assert_eq!(names[0], "CATEGORY_0");
        assert_eq!(names[1], "CATEGORY_1");
        assert_eq!(names[10], "CATEGORY10");
        assert!(names.iter().all(|n| n.len() <= MAX_FIELD_NAME));
        assert_eq!(names.iter().collect::<AHashSet<_>>().len(), names.len());
    }
}
