//! CSV writing operations.

use std::{fs::File, path::Path};

use anyhow::{Context, Result};
use polars::{frame::DataFrame, io::SerWriter, prelude::{Column, CsvWriter, NamedFrom}};

use crate::{
    alloc::{AllocationResult, AllocationWarning},
    grid::GridSpec,
    layer::{AttrValue, FieldDef, FieldType, MISSING_DOUBLE, MISSING_INT},
};

/// Write a DataFrame to a CSV file.
pub fn write_csv(df: &mut DataFrame, path: &Path) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("[io::csv::write] Failed to create CSV file: {}", path.display()))?;
    CsvWriter::new(file)
        .finish(df)
        .with_context(|| format!("[io::csv::write] Failed to write CSV to {:?}", path))
}

/// One typed column holding field `i` of every record.
fn column(field: &FieldDef, i: usize, records: &[Vec<AttrValue>]) -> Column {
    let values = records.iter().map(|r| &r[i]);
    let name = field.name.as_str().into();
    match field.ty {
        FieldType::Integer => Column::new(name, values.map(|v| match v {
            AttrValue::Integer(v) => *v,
            _ => MISSING_INT,
        }).collect::<Vec<i64>>()),
        FieldType::Double => Column::new(name, values.map(|v| v.as_f64().unwrap_or(MISSING_DOUBLE)).collect::<Vec<f64>>()),
        FieldType::String | FieldType::Invalid => Column::new(name, values.map(AttrValue::canonical).collect::<Vec<String>>()),
    }
}

/// The full result table: pass-through fields followed by derived fields.
pub fn result_frame(result: &AllocationResult) -> Result<DataFrame> {
    let columns = result.schema().fields().iter().enumerate()
        .map(|(i, field)| column(field, i, result.records()))
        .collect::<Vec<_>>();
    DataFrame::new(columns).context("[io::csv::write] Failed to build result table")
}

/// Grid-cell table keyed by `COL,ROW` with one column per numeric derived
/// field. String fields cannot be stored on a grid and are reported instead.
pub fn grid_frame(result: &AllocationResult, grid: &GridSpec) -> Result<(DataFrame, Vec<AllocationWarning>)> {
    let (cols, rows) = (0..result.len())
        .map(|i| {
            let (col, row) = grid.cell(i);
            (col as i64, row as i64)
        })
        .unzip::<_, _, Vec<_>, Vec<_>>();

    let mut columns = vec![
        Column::new(GridSpec::COL_FIELD.into(), cols),
        Column::new(GridSpec::ROW_FIELD.into(), rows),
    ];
    let mut skipped = Vec::new();

    let offset = result.pass_through_len();
    for (j, field) in result.derived_fields().iter().enumerate() {
        if !field.ty.is_numeric() {
            skipped.push(AllocationWarning::SkippedField {
                attribute: field.name.clone(),
                reason: format!("{} values cannot be stored on grid {}", field.ty.to_str(), grid.name),
            });
            continue;
        }
        columns.push(column(field, offset + j, result.records()));
    }

    let df = DataFrame::new(columns).context("[io::csv::write] Failed to build grid table")?;
    Ok((df, skipped))
}
