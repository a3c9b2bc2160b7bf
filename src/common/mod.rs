mod fs;
mod polygon;

pub(crate) use fs::*;
pub(crate) use polygon::*;
