use anyhow::{bail, Context, Result};
use std::path::Path;

use crate::{
    alloc::{AllocationEngine, AllocationModeTable, AllocationOptions, AllocationWarning, SurfZoneRule},
    cli::{AllocateArgs, Cli, OutputType},
    grid::GridSpec,
    io::{shp, AllocationSink, GridTableSink, ShapefileSink},
    layer::IntersectionLayer,
};

/// Attribute convention that enables the surf-zone naming rule.
const SURF_ZONE: &str = "SURF_ZONE";

pub fn run(cli: &Cli, args: &AllocateArgs) -> Result<()> {
    // Assert output path is not stdout
    if args.output == Path::new("-") { bail!("stdout is not supported."); }

    let surf_zone = match args.attr_type.as_deref() {
        None => None,
        Some(t) if t.eq_ignore_ascii_case(SURF_ZONE) => Some(SurfZoneRule::default()),
        Some(other) => bail!("unknown attribute type {other:?} (only {SURF_ZONE} is supported)"),
    };

    let modes = AllocationModeTable::parse(&args.modes)?;
    if cli.verbose > 0 {
        eprintln!("[allocate] modes={} weights={} -> {}", args.modes, args.weights.display(), args.output.display());
    }

    let weights = shp::read_layer(&args.weights)
        .with_context(|| format!("Failed to read weight layer {}", args.weights.display()))?;

    let grid = args.grid.as_deref().map(GridSpec::from_json_file).transpose()?;
    let data = match (&grid, &args.data) {
        (Some(grid), _) => grid.to_layer()?,
        (None, Some(path)) => shp::read_layer(path)
            .with_context(|| format!("Failed to read data layer {}", path.display()))?,
        (None, None) => bail!("either a data layer (--data / DATA_SHAPE) or a grid (--grid / OUTPUT_GRID_FILE) is required"),
    };
    if cli.verbose > 0 {
        eprintln!("[allocate] weight layer {}: {} polygons, {} attributes", weights.name(), weights.len(), weights.schema().len());
        eprintln!("[allocate] data layer {}: {} polygons", data.name(), data.len());
    }

    if cli.verbose > 1 { eprintln!("[allocate] intersecting layers"); }
    let pieces = IntersectionLayer::overlay(&weights, &data);

    let options = AllocationOptions {
        basis: args.basis,
        grid_shape: grid.as_ref().map(GridSpec::shape),
        surf_zone,
        verbose: cli.verbose,
    };
    let result = AllocationEngine::new(&weights, &data, &pieces, &modes, options).run()?;

    let mut sink: Box<dyn AllocationSink> = match (args.output_type, grid) {
        (OutputType::Polygon, _) => Box::new(ShapefileSink::new(&args.output, cli.verbose)),
        (OutputType::RegularGrid, Some(grid)) => Box::new(GridTableSink::new(args.output.with_extension("csv"), grid, cli.verbose)),
        (OutputType::RegularGrid, None) => bail!("RegularGrid output requires a grid description (--grid / OUTPUT_GRID_FILE)"),
    };
    sink.write(&result, &data)?;

    for line in warning_lines(result.warnings().iter().chain(sink.warnings()), cli.verbose) {
        eprintln!("[warn] {line}");
    }
    println!("Allocated {} attributes onto {} polygons -> {}",
        weights.schema().len(), result.len(), args.output.display());
    Ok(())
}

/// Lines reported for `warnings`. Below verbosity 1, division-by-zero warnings
/// are folded into one count per attribute, in first-seen order.
fn warning_lines<'a>(warnings: impl IntoIterator<Item = &'a AllocationWarning>, verbose: u8) -> Vec<String> {
    let mut lines = Vec::new();
    let mut uncovered: Vec<(&str, usize)> = Vec::new();
    for warning in warnings {
        match warning {
            AllocationWarning::DivideByZero { attribute, .. } if verbose == 0 => {
                match uncovered.iter_mut().find(|(name, _)| *name == attribute.as_str()) {
                    Some((_, count)) => *count += 1,
                    None => uncovered.push((attribute.as_str(), 1)),
                }
            }
            other => lines.push(other.to_string()),
        }
    }
    lines.extend(uncovered.into_iter().map(|(attribute, count)| format!(
        "division by zero computing {attribute} for {count} output polygons; values set to MISSING (use -v to list them)"
    )));
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uncovered(attribute: &str, polygon: usize) -> AllocationWarning {
        AllocationWarning::DivideByZero { attribute: attribute.into(), polygon }
    }

    #[test]
    fn division_warnings_are_counted_per_attribute() {
        let warnings = vec![
            uncovered("DENS", 1),
            uncovered("LU_1", 1),
            uncovered("DENS", 2),
            AllocationWarning::SkippedField { attribute: "NAME".into(), reason: "string".into() },
            uncovered("DENS", 3),
        ];

        let quiet = warning_lines(&warnings, 0);
        assert_eq!(quiet.len(), 3);
        assert!(quiet[0].starts_with("field NAME not written"));
        assert!(quiet[1].contains("DENS for 3 output polygons"), "{}", quiet[1]);
        assert!(quiet[2].contains("LU_1 for 1 output polygons"), "{}", quiet[2]);

        let loud = warning_lines(&warnings, 1);
        assert_eq!(loud.len(), 5);
        assert!(loud[0].contains("output polygon 1"));
    }
}
