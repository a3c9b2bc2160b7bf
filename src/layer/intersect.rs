use geo::{Area, BooleanOps};

use crate::alloc::AllocationError;

use super::{PolygonId, PolygonLayer};

/// One polygon of a weight/data overlay, with back-references to the
/// weight polygon and the data polygon it was cut from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Piece {
    pub weight: PolygonId,
    pub data: PolygonId,
    pub area: f64,
}

impl Piece {
    pub fn new(weight: impl Into<PolygonId>, data: impl Into<PolygonId>, area: f64) -> Self {
        Self { weight: weight.into(), data: data.into(), area }
    }
}

/// The geometric intersection of a weight layer with a data layer.
/// Owns its pieces; the parent layers are only referenced by index.
#[derive(Debug, Clone, Default)]
pub struct IntersectionLayer {
    pieces: Vec<Piece>,
}

impl IntersectionLayer {
    /// Accept pieces computed elsewhere, checking that every back-reference
    /// points inside its parent layer.
    pub fn from_pieces(pieces: Vec<Piece>, weights: &PolygonLayer, data: &PolygonLayer) -> Result<Self, AllocationError> {
        let layer = Self { pieces };
        layer.check_parents(weights, data)?;
        Ok(layer)
    }

    /// Check that every piece points inside `weights` and `data`.
    pub fn check_parents(&self, weights: &PolygonLayer, data: &PolygonLayer) -> Result<(), AllocationError> {
        if u32::try_from(self.pieces.len()).is_err() {
            return Err(AllocationError::schema(format!(
                "intersection has {} pieces, more than can be indexed", self.pieces.len()
            )));
        }
        for (i, piece) in self.pieces.iter().enumerate() {
            if !weights.contains(piece.weight) {
                return Err(AllocationError::schema(format!(
                    "intersection piece {i} references weight polygon {} but layer {} has {} polygons",
                    piece.weight, weights.name(), weights.len()
                )));
            }
            if !data.contains(piece.data) {
                return Err(AllocationError::schema(format!(
                    "intersection piece {i} references data polygon {} but layer {} has {} polygons",
                    piece.data, data.name(), data.len()
                )));
            }
        }
        Ok(())
    }

    /// Overlay `weights` on `data`. Pieces are ordered by weight polygon,
    /// then by data polygon; intersections with no area are dropped.
    pub fn overlay(weights: &PolygonLayer, data: &PolygonLayer) -> Self {
        let mut pieces = Vec::new();
        for (w, shape) in weights.geoms().shapes().iter().enumerate() {
            for d in data.geoms().candidates(shape) {
                let area = shape.intersection(data.geoms().shape(d)).unsigned_area();
                if area > 0.0 {
                    pieces.push(Piece::new(w, d, area));
                }
            }
        }
        Self { pieces }
    }

    #[inline] pub fn len(&self) -> usize { self.pieces.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.pieces.is_empty() }

    #[inline] pub fn pieces(&self) -> &[Piece] { &self.pieces }

    #[inline] pub fn piece(&self, i: usize) -> &Piece { &self.pieces[i] }

    #[inline] pub fn source_weight_index(&self, i: usize) -> PolygonId { self.pieces[i].weight }

    #[inline] pub fn source_data_index(&self, i: usize) -> PolygonId { self.pieces[i].data }
}
