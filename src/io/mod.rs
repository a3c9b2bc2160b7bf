//! Format-specific reading and writing, organized by format type.
//!
//! - `shp` - Shapefile + DBF layers (input layers, polygon output)
//! - `csv` - CSV tables for results and grid cells
//! - `sink` - Output destinations for a finished allocation run

pub mod csv;
pub mod shp;
mod sink;

pub use sink::{AllocationSink, GridTableSink, ShapefileSink};
