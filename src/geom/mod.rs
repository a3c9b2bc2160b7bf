mod geom;

pub use geom::Geometries;
