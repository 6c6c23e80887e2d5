//! The 2D planar polygon primitive the rest of the crate is built on.
//!
//! This wraps the `geo` crate's boolean-ops, predicate, and metric traits
//! behind a small set of free functions so the rest of the codebase never
//! has to import `geo`'s trait soup directly. `geo_buffer` supplies
//! buffer-by-radius with round joins, which `geo` itself does not provide.

use geo::{
    Area as _, BooleanOps, BoundingRect, Centroid as _, Contains as _, EuclideanDistance as _,
};
use geo_types::{Coord, LineString, Rect};

/// A simple planar polygon, possibly with holes. All higher-level code
/// (zones, units, corridors) is expressed in terms of this and
/// [`MultiPolygon`].
pub type Polygon = geo::Polygon<f64>;
pub type MultiPolygon = geo::MultiPolygon<f64>;

/// A point in the DXF document's native coordinate frame, treated as meters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Point { x, y }
    }
}

impl From<Point> for Coord<f64> {
    fn from(p: Point) -> Self {
        Coord { x: p.x, y: p.y }
    }
}

impl From<Coord<f64>> for Point {
    fn from(c: Coord<f64>) -> Self {
        Point { x: c.x, y: c.y }
    }
}

impl From<geo::Point<f64>> for Point {
    fn from(p: geo::Point<f64>) -> Self {
        Point { x: p.x(), y: p.y() }
    }
}

/// Builds a closed polygon from an ordered ring of points.
///
/// Returns `None` if fewer than 3 distinct points are supplied. The ring is
/// closed automatically if the caller didn't repeat the first point at the
/// end.
pub fn polygon_from_points(points: &[Point]) -> Option<Polygon> {
    let mut distinct: Vec<Point> = Vec::with_capacity(points.len());
    for &p in points {
        if distinct.last().map_or(true, |last: &Point| {
            (last.x - p.x).abs() > f64::EPSILON || (last.y - p.y).abs() > f64::EPSILON
        }) {
            distinct.push(p);
        }
    }
    if distinct.len() >= 2 && distinct.first() == distinct.last() {
        distinct.pop();
    }
    if distinct.len() < 3 {
        return None;
    }

    let coords: Vec<Coord<f64>> = distinct.into_iter().map(Into::into).collect();
    Some(Polygon::new(LineString::new(coords), vec![]))
}

/// Axis-aligned rectangle `[min, min + (w, h)]` as a closed polygon.
pub fn rect_polygon(min: Point, width: f64, height: f64) -> Polygon {
    let coords = vec![
        Coord { x: min.x, y: min.y },
        Coord { x: min.x + width, y: min.y },
        Coord { x: min.x + width, y: min.y + height },
        Coord { x: min.x, y: min.y + height },
    ];
    Polygon::new(LineString::new(coords), vec![])
}

pub fn area(poly: &Polygon) -> f64 {
    poly.unsigned_area()
}

pub fn multi_area(mp: &MultiPolygon) -> f64 {
    mp.unsigned_area()
}

pub fn bounds(poly: &Polygon) -> Option<Rect<f64>> {
    poly.bounding_rect()
}

pub fn centroid(poly: &Polygon) -> Option<Point> {
    poly.centroid().map(Into::into)
}

/// Strict containment: every point of `inner`, including its boundary, lies
/// within `container` (no part of `inner` crosses outside).
pub fn contains(container: &Polygon, inner: &Polygon) -> bool {
    container.contains(inner)
}

pub fn multi_contains(container: &MultiPolygon, inner: &Polygon) -> bool {
    container.contains(inner)
}

/// Euclidean distance between the nearest points of two polygons. Zero if
/// they touch or overlap.
pub fn distance(a: &Polygon, b: &Polygon) -> f64 {
    a.euclidean_distance(b)
}

pub fn union_all(polys: &[Polygon]) -> MultiPolygon {
    let mut acc = MultiPolygon::new(vec![]);
    for poly in polys {
        acc = acc.union(poly);
    }
    acc
}

pub fn union_multi(a: &MultiPolygon, b: &MultiPolygon) -> MultiPolygon {
    a.union(b)
}

pub fn difference(minuend: &MultiPolygon, subtrahend: &MultiPolygon) -> MultiPolygon {
    minuend.difference(subtrahend)
}

pub fn intersection(a: &MultiPolygon, b: &MultiPolygon) -> MultiPolygon {
    a.intersection(b)
}

pub fn intersects_area(a: &Polygon, b: &Polygon) -> f64 {
    let a_multi = MultiPolygon::new(vec![a.clone()]);
    let b_multi = MultiPolygon::new(vec![b.clone()]);
    multi_area(&a_multi.intersection(&b_multi))
}

/// Buffers a single polygon outward by `radius`, producing round joins.
/// A non-positive radius returns the polygon unchanged (as a one-element set).
pub fn buffer(poly: &Polygon, radius: f64) -> MultiPolygon {
    if radius <= 0.0 {
        return MultiPolygon::new(vec![poly.clone()]);
    }
    geo_buffer::buffer_polygon(poly, radius)
}

/// Buffers every polygon in `polys` by `radius` and unions the results.
pub fn buffer_all(polys: &[Polygon], radius: f64) -> MultiPolygon {
    let mut acc = MultiPolygon::new(vec![]);
    for poly in polys {
        acc = acc.union(&buffer(poly, radius));
    }
    acc
}

/// Splits a (possibly multi-ringed) boolean-op result into a flat list of
/// single polygons, dropping pieces below `min_area`.
pub fn into_polygons(mp: MultiPolygon, min_area: f64) -> Vec<Polygon> {
    mp.into_iter().filter(|p| area(p) >= min_area).collect()
}
