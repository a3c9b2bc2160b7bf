//! Reductions over the intersection pieces that feed one output polygon.
//!
//! Every reducer walks its group in input order, so sums accumulate in the
//! order the overlay produced the pieces and ties resolve to the first piece.

use std::{fmt, str::FromStr};

use geo::Point;

use crate::layer::{Piece, PolygonId, PolygonLayer};

use super::{AllocationError, TypeCatalog};

/// How a weight attribute is spread over the pieces cut from its polygon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WeightBasis {
    /// The value is a total over the weight polygon, apportioned by area fraction.
    #[default]
    Apportion,
    /// The value is already a density; each piece contributes value times its area.
    Density,
    /// The value is ignored; each piece contributes its own area.
    Area,
}

impl WeightBasis {
    pub fn to_str(&self) -> &'static str {
        match self {
            WeightBasis::Apportion => "apportion",
            WeightBasis::Density => "density",
            WeightBasis::Area => "area",
        }
    }
}

impl fmt::Display for WeightBasis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.to_str()) }
}

impl FromStr for WeightBasis {
    type Err = AllocationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "apportion" | "total" => Ok(WeightBasis::Apportion),
            "density" => Ok(WeightBasis::Density),
            "area" => Ok(WeightBasis::Area),
            other => Err(AllocationError::config(format!(
                "unknown weight basis {other:?} (expected apportion, density or area)"
            ))),
        }
    }
}

/// The pieces of one output polygon, as indices into the full piece list.
#[derive(Debug, Clone, Copy)]
pub struct PieceGroup<'a> {
    pieces: &'a [Piece],
    members: &'a [u32],
}

impl<'a> PieceGroup<'a> {
    pub fn new(pieces: &'a [Piece], members: &'a [u32]) -> Self { Self { pieces, members } }

    #[inline] pub fn len(&self) -> usize { self.members.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.members.is_empty() }

    /// Pieces in input order.
    pub fn iter(&self) -> impl Iterator<Item = &'a Piece> + 'a {
        let pieces = self.pieces;
        self.members.iter().map(move |&i| &pieces[i as usize])
    }

    /// Total area of the group.
    pub fn area(&self) -> f64 { self.iter().map(|p| p.area).sum() }
}

/// Contribution of one piece to a Sum.
#[inline]
fn contribution(piece: &Piece, weights: &PolygonLayer, attr: usize, basis: WeightBasis) -> f64 {
    let value = || weights.value(piece.weight, attr).as_f64().unwrap_or(0.0);
    match basis {
        WeightBasis::Apportion => {
            let whole = weights.area(piece.weight);
            if whole > 0.0 { value() * piece.area / whole } else { 0.0 }
        }
        WeightBasis::Density => value() * piece.area,
        WeightBasis::Area => piece.area,
    }
}

/// Area-weighted total of numeric attribute `attr`.
pub fn sum(group: PieceGroup, weights: &PolygonLayer, attr: usize, basis: WeightBasis) -> f64 {
    group.iter().map(|p| contribution(p, weights, attr, basis)).sum()
}

/// Area-weighted mean of numeric attribute `attr`, or `None` when the group
/// covers no area.
pub fn average(group: PieceGroup, weights: &PolygonLayer, attr: usize) -> Option<f64> {
    let (weighted, area) = group.iter().fold((0.0, 0.0), |(weighted, area), p| {
        let value = weights.value(p.weight, attr).as_f64().unwrap_or(0.0);
        (weighted + value * p.area, area + p.area)
    });
    (area != 0.0).then(|| weighted / area)
}

/// Weight polygon of the piece with the largest area. Ties go to the first
/// such piece; pieces without area never win.
pub fn discrete_overlap(group: PieceGroup) -> Option<PolygonId> {
    let mut winner = None;
    let mut best = 0.0;
    for piece in group.iter() {
        if piece.area > best {
            best = piece.area;
            winner = Some(piece.weight);
        }
    }
    winner
}

/// Weight polygon of the first piece whose source polygon covers `centroid`.
pub fn discrete_centroid(group: PieceGroup, weights: &PolygonLayer, centroid: Option<Point<f64>>) -> Option<PolygonId> {
    let centroid = centroid?;
    group.iter()
        .find(|p| weights.geoms().covers_point(p.weight.index(), &centroid))
        .map(|p| p.weight)
}

/// Fraction of `output_area` covered by each category of `catalog`, with the
/// surf-zone complement applied. `None` when the output polygon has no area.
pub fn area_percent(group: PieceGroup, weights: &PolygonLayer, attr: usize, catalog: &TypeCatalog, output_area: f64) -> Option<Vec<f64>> {
    if output_area == 0.0 { return None }

    let mut fractions = vec![0.0; catalog.type_count()];
    for piece in group.iter() {
        if let Some(c) = catalog.category_of(weights.value(piece.weight, attr)) {
            fractions[c] += piece.area;
        }
    }
    fractions.iter_mut().for_each(|f| *f /= output_area);
    catalog.resolve(&mut fractions);
    Some(fractions)
}

#[cfg(test)]
mod tests {
    use crate::layer::{fixtures::*, FieldType};

    use super::*;

    fn close(a: f64, b: f64) -> bool { (a - b).abs() < 1e-9 }

    /// Two weight polygons of area 100 and 50 with POP = 40, 10.
    fn weights() -> PolygonLayer {
        layer("w", vec![rect(0.0, 0.0, 10.0, 10.0), rect(10.0, 0.0, 15.0, 10.0)], vec![
            ("POP", FieldType::Integer, ints(&[40, 10])),
            ("LU", FieldType::String, strings(&["forest", "water"])),
        ])
    }

    #[test]
    fn sum_by_basis() {
        let w = weights();
        let pieces = [Piece::new(0usize, 0usize, 50.0), Piece::new(1usize, 0usize, 25.0)];
        let group = PieceGroup::new(&pieces, &[0, 1]);
        assert!(close(sum(group, &w, 0, WeightBasis::Apportion), 20.0 + 5.0));
        assert!(close(sum(group, &w, 0, WeightBasis::Density), 40.0 * 50.0 + 10.0 * 25.0));
        assert!(close(sum(group, &w, 0, WeightBasis::Area), 75.0));
    }

    #[test]
    fn sum_over_nothing_is_zero() {
        let w = weights();
        assert_eq!(sum(PieceGroup::new(&[], &[]), &w, 0, WeightBasis::Apportion), 0.0);
    }

    #[test]
    fn average_is_area_weighted() {
        let w = weights();
        let pieces = [Piece::new(0usize, 0usize, 30.0), Piece::new(1usize, 0usize, 10.0)];
        let got = average(PieceGroup::new(&pieces, &[0, 1]), &w, 0).unwrap();
        assert!(close(got, (40.0 * 30.0 + 10.0 * 10.0) / 40.0));
        assert_eq!(average(PieceGroup::new(&pieces, &[]), &w, 0), None);
    }

    #[test]
    fn overlap_tie_goes_to_first_piece() {
        let pieces = [
            Piece::new(1usize, 0usize, 10.0),
            Piece::new(0usize, 0usize, 10.0),
            Piece::new(1usize, 0usize, 5.0),
        ];
        let group = PieceGroup::new(&pieces, &[0, 1, 2]);
        for _ in 0..3 {
            assert_eq!(discrete_overlap(group), Some(PolygonId(1)));
        }
        assert_eq!(discrete_overlap(PieceGroup::new(&pieces, &[1, 0])), Some(PolygonId(0)));
    }

    #[test]
    fn overlap_ignores_zero_area_pieces() {
        let pieces = [Piece::new(0usize, 0usize, 0.0)];
        assert_eq!(discrete_overlap(PieceGroup::new(&pieces, &[0])), None);
        assert_eq!(discrete_overlap(PieceGroup::new(&pieces, &[])), None);
    }

    #[test]
    fn centroid_selects_covering_weight_polygon() {
        let w = weights();
        let pieces = [Piece::new(0usize, 0usize, 1.0), Piece::new(1usize, 0usize, 1.0)];
        let group = PieceGroup::new(&pieces, &[0, 1]);
        assert_eq!(discrete_centroid(group, &w, Some(Point::new(12.0, 5.0))), Some(PolygonId(1)));
        // On the shared edge both cover the point; the first piece wins.
        assert_eq!(discrete_centroid(group, &w, Some(Point::new(10.0, 5.0))), Some(PolygonId(0)));
        assert_eq!(discrete_centroid(group, &w, Some(Point::new(50.0, 5.0))), None);
        assert_eq!(discrete_centroid(group, &w, None), None);
    }

    #[test]
    fn area_percent_by_category() {
        let w = weights();
        let catalog = TypeCatalog::build(&w, 1).unwrap();
        let pieces = [Piece::new(0usize, 0usize, 60.0), Piece::new(1usize, 0usize, 20.0)];
        let got = area_percent(PieceGroup::new(&pieces, &[0, 1]), &w, 1, &catalog, 100.0).unwrap();
        assert!(close(got[0], 0.6) && close(got[1], 0.2));
        assert_eq!(area_percent(PieceGroup::new(&pieces, &[]), &w, 1, &catalog, 0.0), None);
    }

    #[test]
    fn weight_basis_from_str() {
        assert_eq!("Density".parse::<WeightBasis>().unwrap(), WeightBasis::Density);
        assert_eq!("APPORTION".parse::<WeightBasis>().unwrap(), WeightBasis::Apportion);
        assert!("volume".parse::<WeightBasis>().is_err());
        assert_eq!(WeightBasis::default(), WeightBasis::Apportion);
    }
}
