mod catalog;
mod engine;
mod error;
mod mode;
pub mod reduce;

pub use catalog::{SurfZoneRule, TypeCatalog};
pub use engine::{AllocationEngine, AllocationOptions, AllocationResult, PieceIndex};
pub use error::{AllocationError, AllocationWarning};
pub use mode::{AllocationMode, AllocationModeTable};
pub use reduce::{PieceGroup, WeightBasis};
