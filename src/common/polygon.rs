use anyhow::{bail, Result};
use geo::{Coord, LineString, MultiPolygon, Polygon};
use shapefile::{self as shp, PolygonRing, Shape};

/// Coerce a shapefile shape into an owned multipolygon, dropping M/Z ordinates.
pub(crate) fn shape_to_multipolygon(shape: Shape) -> Result<MultiPolygon<f64>> {
    match shape {
        Shape::Polygon(polygon) => Ok(rings_to_geo(polygon.rings(), |p: &shp::Point| Coord { x: p.x, y: p.y })),
        Shape::PolygonM(polygon) => Ok(rings_to_geo(polygon.rings(), |p: &shp::PointM| Coord { x: p.x, y: p.y })),
        Shape::PolygonZ(polygon) => Ok(rings_to_geo(polygon.rings(), |p: &shp::PointZ| Coord { x: p.x, y: p.y })),
        other => bail!("found non-polygon shape in layer: {:?}", other.shapetype()),
    }
}

/// Group shapefile rings into polygons: each outer ring owns the inner rings
/// that follow it.
fn rings_to_geo<P>(rings: &[PolygonRing<P>], xy: impl Fn(&P) -> Coord<f64>) -> MultiPolygon<f64> {
    let mut polys = Vec::new();
    let mut exterior: Option<LineString<f64>> = None;
    let mut holes = Vec::new();

    for ring in rings {
        // LineString::new does not close the ring; geo polygons close it on construction.
        let line = LineString::new(ring.points().iter().map(&xy).collect());
        match ring {
            PolygonRing::Outer(_) => {
                if let Some(ext) = exterior.replace(line) {
                    polys.push(Polygon::new(ext, std::mem::take(&mut holes)));
                }
            }
            PolygonRing::Inner(_) => holes.push(line),
        }
    }
    if let Some(ext) = exterior {
        polys.push(Polygon::new(ext, holes));
    }

    MultiPolygon(polys)
}

/// Convert a multipolygon into a shapefile polygon (outer rings clockwise, holes counter-clockwise).
pub(crate) fn multipolygon_to_shape(mp: &MultiPolygon<f64>) -> shp::Polygon {
    let ring = |line: &LineString<f64>| line.coords().map(|c| shp::Point { x: c.x, y: c.y }).collect::<Vec<_>>();

    let mut rings = Vec::new();
    for poly in &mp.0 {
        rings.push(PolygonRing::Outer(ring(poly.exterior())));
        rings.extend(poly.interiors().iter().map(|hole| PolygonRing::Inner(ring(hole))));
    }

    // with_rings closes each ring and fixes its winding order.
    shp::Polygon::with_rings(rings)
}
