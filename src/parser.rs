//! DXF ingestion and zone classification (spec §4.1).
//!
//! Reads a DXF document with the `dxf` crate, turns each entity into zero or
//! more [`RawZone`]s, then folds the raw zones into a [`ZoneSet`]. The
//! open-space list on the returned `ZoneSet` is a placeholder only — the
//! authoritative open-space computation happens in [`crate::space`].

use std::path::Path;

use dxf::entities::{Entity, EntityType};
use dxf::Drawing;

use crate::error::ParseError;
use crate::geometry::{self, area, polygon_from_points, Point, Polygon};
use crate::types::{RawZone, ZoneKind, ZoneSet, MIN_ZONE_AREA};

/// Default half-width applied when buffering linear entities (LINE, ARC,
/// healed 2-point polylines, flattened SPLINE) into a polygon (spec §4.1
/// table). Overridable via [`crate::Config::wall_buffer`].
pub const DEFAULT_WALL_BUFFER: f64 = 0.15;

/// Chord tolerance (native units) used to flatten SPLINE entities.
const SPLINE_CHORD_TOLERANCE: f64 = 0.01;
/// Maximum chord count per radian of arc sweep (spec §4.1 ARC row).
const ARC_CHORDS_PER_RADIAN: f64 = 20.0;
/// Ellipse polygonization step, in degrees (spec §4.1 ELLIPSE row).
const ELLIPSE_STEP_DEGREES: f64 = 10.0;

/// Reads `path` and returns the classified [`ZoneSet`]. The `open_spaces`
/// field is always empty here; it is filled in authoritatively by
/// [`crate::space::compute_open_spaces`].
pub fn parse(path: &Path, wall_buffer: f64) -> Result<ZoneSet, ParseError> {
    let drawing = Drawing::load_file(path).map_err(|source| match source {
        dxf::DxfError::IoError(io) => ParseError::UnreadableFile {
            path: path.display().to_string(),
            source: io,
        },
        other => ParseError::MalformedDxf {
            path: path.display().to_string(),
            source: other,
        },
    })?;

    parse_drawing(&drawing, wall_buffer)
}

/// Classifies every entity of an already-loaded [`Drawing`] into a
/// [`ZoneSet`]. Split out from [`parse`] so the classification cascade can
/// be exercised directly against a drawing built in-process, without
/// round-tripping through the filesystem.
pub fn parse_drawing(drawing: &Drawing, wall_buffer: f64) -> Result<ZoneSet, ParseError> {
    let mut raw_zones = Vec::new();
    for entity in drawing.entities() {
        extract_entity_zones(entity, wall_buffer, &mut raw_zones);
    }

    if raw_zones.is_empty() {
        return Err(ParseError::NoEntities);
    }

    tracing::info!(count = raw_zones.len(), "extracted raw zones from DXF");

    Ok(fold_into_zone_set(raw_zones))
}

fn fold_into_zone_set(raw_zones: Vec<RawZone>) -> ZoneSet {
    let mut zones = ZoneSet::default();
    for zone in raw_zones {
        match zone.kind {
            ZoneKind::Wall => zones.walls.push(zone.polygon),
            ZoneKind::Restricted => zones.restricted.push(zone.polygon),
            ZoneKind::Entrance => zones.entrances.push(zone.polygon),
            // Unclassified-as-open polygons are not trusted; the space
            // computer derives `open_spaces` authoritatively from the
            // envelope and the obstacle union (spec §4.2).
            ZoneKind::OpenSpace => {}
        }
    }
    zones
}

fn extract_entity_zones(entity: &Entity, wall_buffer: f64, out: &mut Vec<RawZone>) {
    let layer_name = entity.common.layer.clone();
    let aci_color = entity_aci(entity);
    let true_color = entity_true_color(entity);

    let polygons = match &entity.specific {
        EntityType::LwPolyline(p) => {
            let pts: Vec<Point> = p.vertices.iter().map(|v| Point::new(v.x, v.y)).collect();
            polyline_like(&pts, wall_buffer)
        }
        EntityType::Polyline(p) => {
            let pts: Vec<Point> = p
                .vertices()
                .map(|v| Point::new(v.location.x, v.location.y))
                .collect();
            polyline_like(&pts, wall_buffer)
        }
        EntityType::Line(l) => {
            let start = Point::new(l.p1.x, l.p1.y);
            let end = Point::new(l.p2.x, l.p2.y);
            vec![buffer_segment(start, end, wall_buffer)]
        }
        EntityType::Arc(a) => {
            let pts = flatten_arc(
                Point::new(a.center.x, a.center.y),
                a.radius,
                a.start_angle.to_radians(),
                a.end_angle.to_radians(),
            );
            buffer_chain(&pts, wall_buffer)
        }
        EntityType::Circle(c) => {
            let pts = flatten_arc(
                Point::new(c.center.x, c.center.y),
                c.radius,
                0.0,
                std::f64::consts::TAU,
            );
            polygon_from_points(&pts).into_iter().collect()
        }
        EntityType::Ellipse(e) => {
            let pts = flatten_ellipse(e);
            polygon_from_points(&pts).into_iter().collect()
        }
        EntityType::Spline(s) => {
            let pts = flatten_spline(s);
            buffer_chain(&pts, wall_buffer)
        }
        EntityType::Hatch(h) => hatch_boundaries(h),
        EntityType::Solid(s) => {
            let pts = vec![
                Point::new(s.first_corner.x, s.first_corner.y),
                Point::new(s.second_corner.x, s.second_corner.y),
                Point::new(s.fourth_corner.x, s.fourth_corner.y),
                Point::new(s.third_corner.x, s.third_corner.y),
            ];
            polygon_from_points(&pts).into_iter().collect()
        }
        EntityType::Face3D(f) => {
            let pts = vec![
                Point::new(f.first_corner.x, f.first_corner.y),
                Point::new(f.second_corner.x, f.second_corner.y),
                Point::new(f.third_corner.x, f.third_corner.y),
                Point::new(f.fourth_corner.x, f.fourth_corner.y),
            ];
            polygon_from_points(&pts).into_iter().collect()
        }
        _ => Vec::new(),
    };

    for polygon in polygons {
        let poly_area = area(&polygon);
        if poly_area < MIN_ZONE_AREA {
            tracing::debug!(handle = ?entity.common.handle, area = poly_area, "dropping sub-threshold entity");
            continue;
        }
        let kind = classify(aci_color, true_color, &layer_name, poly_area);

        #[cfg(feature = "trace")]
        let reason = {
            let reason = classification_reason(aci_color, true_color, &layer_name, poly_area, kind);
            tracing::trace!(handle = ?entity.common.handle, %reason, "classified entity");
            reason
        };

        out.push(RawZone {
            kind,
            polygon,
            layer_name: layer_name.clone(),
            aci_color,
            true_color,
            #[cfg(feature = "trace")]
            classification_reason: Some(reason),
        });
    }
}

/// A polyline with >= 3 distinct vertices becomes a ring (healed with a
/// zero-width buffer if self-intersecting); exactly 2 vertices is treated
/// as a line (spec §4.1 LWPOLYLINE/POLYLINE row).
fn polyline_like(pts: &[Point], wall_buffer: f64) -> Vec<Polygon> {
    if pts.len() >= 3 {
        match polygon_from_points(pts) {
            Some(poly) => vec![heal(poly)],
            None => Vec::new(),
        }
    } else if pts.len() == 2 {
        vec![buffer_segment(pts[0], pts[1], wall_buffer)]
    } else {
        Vec::new()
    }
}

/// Heals a possibly self-intersecting ring with a zero-width buffer, the
/// standard "buffer(0)" trick (spec §4.1: "if invalid, apply a zero-width
/// buffer to heal").
fn heal(poly: Polygon) -> Polygon {
    let buffered = geometry::buffer(&poly, 0.0);
    buffered.into_iter().next().unwrap_or(poly)
}

fn buffer_segment(a: Point, b: Point, half_width: f64) -> Polygon {
    let line = polygon_from_points(&[a, b, a]);
    match line {
        Some(degenerate) => geometry::buffer(&degenerate, half_width)
            .into_iter()
            .next()
            .unwrap_or(degenerate),
        None => geometry::rect_polygon(a, (b.x - a.x).max(1e-6), (b.y - a.y).max(1e-6)),
    }
}

/// Buffers a polyline chain (used for ARC, SPLINE) into a rounded ribbon by
/// buffering each consecutive segment and unioning the result.
fn buffer_chain(pts: &[Point], half_width: f64) -> Vec<Polygon> {
    if pts.len() < 2 {
        return Vec::new();
    }
    let mut acc = crate::geometry::MultiPolygon::new(vec![]);
    for window in pts.windows(2) {
        let seg = buffer_segment(window[0], window[1], half_width);
        acc = geometry::union_multi(&acc, &crate::geometry::MultiPolygon::new(vec![seg]));
    }
    acc.into_iter().collect()
}

/// Flattens an arc of the given sweep into at most
/// `ceil(sweep_radians * ARC_CHORDS_PER_RADIAN)` vertices (spec §4.1 ARC row).
fn flatten_arc(center: Point, radius: f64, start_rad: f64, end_rad: f64) -> Vec<Point> {
    let mut sweep = end_rad - start_rad;
    if sweep <= 0.0 {
        sweep += std::f64::consts::TAU;
    }
    let n = ((sweep * ARC_CHORDS_PER_RADIAN).ceil() as usize).max(2);
    (0..=n)
        .map(|i| {
            let t = start_rad + sweep * (i as f64 / n as f64);
            Point::new(center.x + radius * t.cos(), center.y + radius * t.sin())
        })
        .collect()
}

fn flatten_ellipse(e: &dxf::entities::Ellipse) -> Vec<Point> {
    let center = Point::new(e.center.x, e.center.y);
    let major = Point::new(e.major_axis.x, e.major_axis.y);
    let major_len = (major.x * major.x + major.y * major.y).sqrt();
    let rotation = major.y.atan2(major.x);
    let ratio = e.minor_axis_ratio;

    let steps = (360.0 / ELLIPSE_STEP_DEGREES).round() as usize;
    (0..steps)
        .map(|i| {
            let t = (i as f64) * ELLIPSE_STEP_DEGREES.to_radians();
            let local_x = major_len * t.cos();
            let local_y = major_len * ratio * t.sin();
            Point::new(
                center.x + local_x * rotation.cos() - local_y * rotation.sin(),
                center.y + local_x * rotation.sin() + local_y * rotation.cos(),
            )
        })
        .collect()
}

/// Flattens a SPLINE at a fixed chord tolerance by subdividing the control
/// polygon until consecutive chord midpoints deviate by less than
/// `SPLINE_CHORD_TOLERANCE` from the straight segment (a simplified
/// De Casteljau-style refinement sufficient for buffering purposes; no
/// curvature-aware adaptive subdivision is attempted).
fn flatten_spline(s: &dxf::entities::Spline) -> Vec<Point> {
    let control: Vec<Point> = s
        .control_points
        .iter()
        .map(|p| Point::new(p.x, p.y))
        .collect();
    if control.len() < 2 {
        return control;
    }

    let mut out = Vec::with_capacity(control.len() * 4);
    out.push(control[0]);
    for window in control.windows(2) {
        subdivide_segment(window[0], window[1], SPLINE_CHORD_TOLERANCE, &mut out);
    }
    out
}

fn subdivide_segment(a: Point, b: Point, tolerance: f64, out: &mut Vec<Point>) {
    let len = ((b.x - a.x).powi(2) + (b.y - a.y).powi(2)).sqrt();
    let steps = ((len / tolerance.max(1e-6)).sqrt().ceil() as usize)
        .clamp(1, 64);
    for i in 1..=steps {
        let t = i as f64 / steps as f64;
        out.push(Point::new(a.x + (b.x - a.x) * t, a.y + (b.y - a.y) * t));
    }
}

/// Extracts each boundary path of a HATCH as its own polygon, healing
/// invalid paths with a zero-width buffer (spec §4.1 HATCH/SOLID/3DFACE row).
fn hatch_boundaries(h: &dxf::entities::Hatch) -> Vec<Polygon> {
    let mut polys = Vec::new();
    for path in &h.boundary_paths {
        let pts: Vec<Point> = path
            .polyline_vertices
            .iter()
            .map(|v| Point::new(v.0, v.1))
            .collect();
        if let Some(poly) = polygon_from_points(&pts) {
            polys.push(heal(poly));
        }
    }
    polys
}

fn entity_aci(entity: &Entity) -> u16 {
    let raw = entity.common.color.raw_value();
    match raw {
        // BYBLOCK: spec §9 open question — defaults to Wall like the
        // cascade's ACI-color rule 2; not resolved further here.
        0 => 0,
        256 => 256,
        n if n > 0 => n as u16,
        _ => 7,
    }
}

fn entity_true_color(entity: &Entity) -> Option<u32> {
    let packed = entity.common.color_24_bit;
    if packed < 0 {
        None
    } else {
        Some(packed as u32)
    }
}

/// The priority-ordered classification cascade (spec §4.1 "Classification").
/// The first matching rule decides; falls through to `Wall` if nothing else
/// matches (rule 5, "Default").
fn classify(aci: u16, true_color: Option<u32>, layer_name: &str, poly_area: f64) -> ZoneKind {
    if let Some(packed) = true_color {
        let r = ((packed >> 16) & 0xFF) as i32;
        let g = ((packed >> 8) & 0xFF) as i32;
        let b = (packed & 0xFF) as i32;
        if r > 180 && g < 100 && b < 100 {
            return ZoneKind::Entrance;
        }
        if b > 180 && r < 100 && g < 150 {
            return ZoneKind::Restricted;
        }
        if (r < 100 && g < 100 && b < 100) || (r > 200 && g > 200 && b > 200) {
            return ZoneKind::Wall;
        }
    }

    match aci {
        1 => return ZoneKind::Entrance,
        5 => return ZoneKind::Restricted,
        0 | 7 | 8 | 256 => return ZoneKind::Wall,
        _ => {}
    }

    let upper = layer_name.to_uppercase();
    if ["WALL", "MUR", "STRUCTURE", "OUTLINE"]
        .iter()
        .any(|s| upper.contains(s))
    {
        return ZoneKind::Wall;
    }
    if ["STAIR", "ELEVATOR", "LIFT", "RESTRICTED", "EQUIPMENT"]
        .iter()
        .any(|s| upper.contains(s))
    {
        return ZoneKind::Restricted;
    }
    if ["DOOR", "ENTRANCE", "OPENING", "PORTE", "EXIT"]
        .iter()
        .any(|s| upper.contains(s))
    {
        return ZoneKind::Entrance;
    }

    if poly_area < 2.0 {
        return ZoneKind::Entrance;
    }
    if poly_area > 100.0 {
        return ZoneKind::Wall;
    }

    ZoneKind::Wall
}

#[cfg(feature = "trace")]
fn classification_reason(
    aci: u16,
    true_color: Option<u32>,
    layer_name: &str,
    poly_area: f64,
    kind: ZoneKind,
) -> String {
    format!(
        "aci={aci} true_color={true_color:?} layer={layer_name:?} area={poly_area:.3} -> {kind:?}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_red_true_color_as_entrance() {
        assert_eq!(
            classify(7, Some(0xFF0000), "0", 4.0),
            ZoneKind::Entrance
        );
    }

    #[test]
    fn classifies_aci_five_as_restricted() {
        assert_eq!(classify(5, None, "0", 4.0), ZoneKind::Restricted);
    }

    #[test]
    fn classifies_layer_name_substring() {
        assert_eq!(classify(3, None, "INT-STAIRS-01", 4.0), ZoneKind::Restricted);
        assert_eq!(classify(3, None, "MAIN-ENTRANCE", 4.0), ZoneKind::Entrance);
        assert_eq!(classify(3, None, "EXT-WALL", 4.0), ZoneKind::Wall);
    }

    #[test]
    fn area_fallback_small_is_entrance_large_is_wall() {
        assert_eq!(classify(3, None, "MISC", 1.0), ZoneKind::Entrance);
        assert_eq!(classify(3, None, "MISC", 150.0), ZoneKind::Wall);
    }

    #[test]
    fn default_is_wall() {
        assert_eq!(classify(3, None, "MISC", 10.0), ZoneKind::Wall);
    }

    #[test]
    fn flattens_full_circle_into_polygon() {
        let pts = flatten_arc(Point::new(0.0, 0.0), 5.0, 0.0, std::f64::consts::TAU);
        let poly = polygon_from_points(&pts).expect("circle should form valid ring");
        assert!((area(&poly) - std::f64::consts::PI * 25.0).abs() < 0.5);
    }
}
