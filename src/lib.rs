#![doc = "Polygon allocation: apportion weight-layer attributes onto data polygons or grid cells"]
pub mod alloc;
pub mod cli;
pub mod commands;
mod common;
pub mod geom;
pub mod grid;
pub mod io;
pub mod layer;

#[doc(inline)]
pub use alloc::{
    AllocationEngine, AllocationError, AllocationMode, AllocationModeTable, AllocationOptions, AllocationResult,
    AllocationWarning, SurfZoneRule, TypeCatalog, WeightBasis,
};

#[doc(inline)]
pub use grid::GridSpec;

#[doc(inline)]
pub use layer::{AttrValue, FieldType, IntersectionLayer, Piece, PolygonId, PolygonLayer};
