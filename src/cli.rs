use clap::{Args, Parser, Subcommand, ValueEnum, ValueHint};
use std::path::PathBuf;

use crate::alloc::WeightBasis;

/// Polygon allocation CLI
#[derive(Parser, Debug)]
#[command(name = "spatial-allocator", version, about, propagate_version = true)]
pub struct Cli {
    /// Increase output verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Apportion weight-layer attributes onto a data layer or regular grid
    Allocate(AllocateArgs),
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, ValueEnum)]
pub enum OutputType {
    /// Shapefile of the data polygons with a companion CSV
    #[value(name = "Polygon")]
    Polygon,
    /// CSV table of grid cells keyed by COL,ROW
    #[value(name = "RegularGrid", alias = "regular-grid")]
    RegularGrid,
}

#[derive(Args, Debug)]
pub struct AllocateArgs {
    /// Mode file path, or ALL_AGGREGATE / ALL_AVERAGE / ALL_DISCRETEOVERLAP /
    /// ALL_DISCRETECENTROID / ALL_AREAPERCENT
    #[arg(short, long, env = "ALLOC_MODE_FILE")]
    pub modes: String,

    /// Weight layer shapefile (attributes to apportion)
    #[arg(short, long, env = "WEIGHT_SHAPE", value_hint = ValueHint::FilePath)]
    pub weights: PathBuf,

    /// Data layer shapefile (output polygons)
    #[arg(short, long, env = "DATA_SHAPE", value_hint = ValueHint::FilePath, conflicts_with = "grid")]
    pub data: Option<PathBuf>,

    /// Regular grid description (JSON) used in place of a data layer
    #[arg(short, long, env = "OUTPUT_GRID_FILE", value_hint = ValueHint::FilePath)]
    pub grid: Option<PathBuf>,

    /// Output file; extensions are replaced as needed
    #[arg(short, long, env = "OUTPUT_FILE_NAME", value_hint = ValueHint::FilePath)]
    pub output: PathBuf,

    /// Output format
    #[arg(long = "type", env = "OUTPUT_FILE_TYPE", value_enum, ignore_case = true, default_value_t = OutputType::Polygon)]
    pub output_type: OutputType,

    /// Attribute convention; SURF_ZONE renames area percents of categories 2 and 3 to OPEN and SURF
    #[arg(long, env = "ALLOC_ATTR_TYPE")]
    pub attr_type: Option<String>,

    /// How Aggregate spreads a value: apportion, density or area
    #[arg(long, env = "WEIGHT_BASIS", default_value = "apportion")]
    pub basis: WeightBasis,
}
