//! Open-space computation: envelope minus obstacles (spec §4.2).

use geo_types::Rect;

use crate::geometry::{self, area, multi_area, union_all, MultiPolygon, Point, Polygon};
use crate::types::{ZoneSet, MIN_ZONE_AREA, PLACEMENT_ENTRANCE_BUFFER};

/// Buffer applied to restricted polygons before subtraction (spec §4.2
/// step 3). Smaller than `ENTRANCE_CLEARANCE` because restricted areas are
/// usually already fully enclosed (stairs, elevator shafts).
const RESTRICTED_BUFFER: f64 = 0.1;

/// Computes the open-space polygons for `zones`, replacing whatever the
/// parser may have produced for `open_spaces` (spec §4.2: "authoritative").
///
/// `entrance_clearance` is the configurable forbidden ring buffered around
/// entrance polygons before subtraction (spec §6 `Config::entrance_clearance`,
/// defaulting to [`crate::types::ENTRANCE_CLEARANCE`]). This is a distinct
/// knob from the placement engine's own, fixed entrance buffer (spec
/// §4.3.2), see [`forbidden_zone`].
///
/// Returns `None` if every zone list is empty — the caller maps this to
/// `LayoutError::NoGeometry` (spec §4.2 step 1).
pub fn compute_open_spaces(zones: &ZoneSet, entrance_clearance: f64) -> Option<Vec<Polygon>> {
    if zones.is_empty() {
        return None;
    }

    let envelope = envelope_of(zones)?;
    let envelope_poly = rect_to_polygon(envelope);

    let mut obstacles = union_all(&zones.walls);
    obstacles = geometry::union_multi(&obstacles, &geometry::buffer_all(&zones.restricted, RESTRICTED_BUFFER));
    obstacles = geometry::union_multi(
        &obstacles,
        &geometry::buffer_all(&zones.entrances, entrance_clearance),
    );

    let remaining: MultiPolygon =
        geometry::difference(&MultiPolygon::new(vec![envelope_poly]), &obstacles);

    Some(geometry::into_polygons(remaining, MIN_ZONE_AREA))
}

/// Axis-aligned bounding rectangle of the union of every zone's bounds
/// (spec §4.2 step 2).
fn envelope_of(zones: &ZoneSet) -> Option<Rect<f64>> {
    let mut bounds: Option<Rect<f64>> = None;
    let all_polys = zones
        .walls
        .iter()
        .chain(zones.restricted.iter())
        .chain(zones.entrances.iter())
        .chain(zones.open_spaces.iter());

    for poly in all_polys {
        if let Some(b) = geometry::bounds(poly) {
            bounds = Some(match bounds {
                Some(acc) => merge_rects(acc, b),
                None => b,
            });
        }
    }
    bounds
}

fn merge_rects(a: Rect<f64>, b: Rect<f64>) -> Rect<f64> {
    Rect::new(
        geo_types::coord! { x: a.min().x.min(b.min().x), y: a.min().y.min(b.min().y) },
        geo_types::coord! { x: a.max().x.max(b.max().x), y: a.max().y.max(b.max().y) },
    )
}

fn rect_to_polygon(rect: Rect<f64>) -> Polygon {
    geometry::rect_polygon(
        Point::new(rect.min().x, rect.min().y),
        rect.max().x - rect.min().x,
        rect.max().y - rect.min().y,
    )
}

/// Total area of an open-space list, used for coverage-percent metrics
/// (spec §4.5).
pub fn total_area(open_spaces: &[Polygon]) -> f64 {
    open_spaces.iter().map(area).sum()
}

/// The forbidden zone units may never intersect (spec §4.3.2): restricted
/// polygons plus a fixed, wider buffer around entrances than the space
/// computer uses (`PLACEMENT_ENTRANCE_BUFFER`, not configurable — spec §9
/// keeps this hard-coded), cached as a single multi-polygon for repeated
/// containment queries.
pub fn forbidden_zone(zones: &ZoneSet) -> MultiPolygon {
    let restricted = union_all(&zones.restricted);
    let buffered_entrances = geometry::buffer_all(&zones.entrances, PLACEMENT_ENTRANCE_BUFFER);
    geometry::union_multi(&restricted, &buffered_entrances)
}

pub fn multi_area_of(mp: &MultiPolygon) -> f64 {
    multi_area(mp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::rect_polygon;
    use crate::types::ENTRANCE_CLEARANCE;

    #[test]
    fn empty_zones_yield_no_open_space() {
        let zones = ZoneSet::default();
        assert!(compute_open_spaces(&zones, ENTRANCE_CLEARANCE).is_none());
    }

    #[test]
    fn zone_set_whose_only_polygon_has_no_bounds_is_degenerate() {
        // A polygon with an empty ring has no bounding rect, so the envelope
        // can't be computed even though the zone set isn't empty — this is
        // the case the orchestrator maps to `LayoutError::GeometryDegenerate`
        // rather than `NoOpenSpace`.
        let mut zones = ZoneSet::default();
        zones
            .walls
            .push(Polygon::new(geo_types::LineString::new(vec![]), vec![]));
        assert!(compute_open_spaces(&zones, ENTRANCE_CLEARANCE).is_none());
    }

    #[test]
    fn wall_covering_the_whole_envelope_leaves_no_open_space() {
        let mut zones = ZoneSet::default();
        zones.walls.push(rect_polygon(Point::new(0.0, 0.0), 10.0, 10.0));
        let open = compute_open_spaces(&zones, ENTRANCE_CLEARANCE).unwrap();
        assert!(total_area(&open) < MIN_ZONE_AREA);
    }

    #[test]
    fn entrance_buffer_removes_clearance_ring() {
        let mut zones = ZoneSet::default();
        zones
            .open_spaces
            .push(rect_polygon(Point::new(0.0, 0.0), 20.0, 20.0));
        zones
            .entrances
            .push(rect_polygon(Point::new(9.0, 0.0), 2.0, 2.0));
        let open = compute_open_spaces(&zones, ENTRANCE_CLEARANCE).unwrap();
        let total = total_area(&open);
        assert!(total < 400.0);
        assert!(total > 390.0);
    }
}
