use geo::{Area, BoundingRect, Centroid, Intersects, MultiPolygon, Point};
use rstar::{primitives::{GeomWithData, Rectangle}, RTree, AABB};

/// A bounding rectangle in the R-tree, tagged with the index of its MultiPolygon.
type BoundingBox = GeomWithData<Rectangle<[f64; 2]>, usize>;

/// Geometries represents an ordered collection of MultiPolygons with cached
/// areas and an R-tree over their bounding boxes.
#[derive(Debug, Clone)]
pub struct Geometries {
    shapes: Vec<MultiPolygon<f64>>,
    areas: Vec<f64>,
    rtree: RTree<BoundingBox>,
}

impl Geometries {
    /// Construct a Geometries object from a vector of MultiPolygons.
    /// Empty shapes get an area of zero and are left out of the R-tree.
    pub fn new(shapes: Vec<MultiPolygon<f64>>) -> Self {
        Self {
            rtree: RTree::bulk_load(
                shapes.iter().enumerate()
                    .filter_map(|(i, shape)| shape.bounding_rect()
                        .map(|rect| BoundingBox::new(Rectangle::from_corners(rect.min().into(), rect.max().into()), i)))
                    .collect()
            ),
            areas: shapes.iter().map(|shape| shape.unsigned_area()).collect(),
            shapes,
        }
    }

    /// Get the number of MultiPolygons.
    #[inline] pub fn len(&self) -> usize { self.shapes.len() }

    /// Check if there are no MultiPolygons.
    #[inline] pub fn is_empty(&self) -> bool { self.shapes.is_empty() }

    /// Get a reference to the list of MultiPolygons.
    #[inline] pub fn shapes(&self) -> &[MultiPolygon<f64>] { &self.shapes }

    #[inline] pub fn shape(&self, i: usize) -> &MultiPolygon<f64> { &self.shapes[i] }

    /// Planar (unsigned) area of the i-th MultiPolygon.
    #[inline] pub fn area(&self, i: usize) -> f64 { self.areas[i] }

    /// Centroid of the i-th MultiPolygon, or None if it is empty.
    #[inline] pub fn centroid(&self, i: usize) -> Option<Point<f64>> { self.shapes[i].centroid() }

    /// Boundary-inclusive point test against the i-th MultiPolygon.
    #[inline] pub fn covers_point(&self, i: usize, point: &Point<f64>) -> bool { self.shapes[i].intersects(point) }

    /// Indices of shapes whose bounding boxes intersect the given shape's bounding box,
    /// in ascending order.
    pub fn candidates(&self, shape: &MultiPolygon<f64>) -> Vec<usize> {
        let Some(rect) = shape.bounding_rect() else { return Vec::new() };
        let envelope = AABB::from_corners(rect.min().into(), rect.max().into());
        let mut found = self.rtree
            .locate_in_envelope_intersecting(&envelope)
            .map(|bbox| bbox.data)
            .collect::<Vec<_>>();
        found.sort_unstable();
        found
    }
}
