//! Black-box scenarios from spec §8 (S1-S6), exercised against the public
//! API. S1-S3 drive the placement/corridor stages directly against
//! synthetic zone sets (no DXF needed to express "a 10x10 open square").
//! S4-S6 build a small DXF document in-process with the `dxf` crate and
//! round-trip it through [`ilot_layout_core::process`].

use std::time::Duration;

use approx::assert_relative_eq;
use dxf::entities::{Circle, Entity, EntityType, Line};
use dxf::{Color, Drawing, Point as DxfPoint};

use ilot_layout_core::corridors::generate as generate_corridors;
use ilot_layout_core::geometry::{rect_polygon, Point};
use ilot_layout_core::placement::{place, GaConfig};
use ilot_layout_core::{process, CancellationToken, Config, PlacementOutcome, SizeBand, SizeMix, ZoneSet};

fn open_square(side: f64) -> ZoneSet {
    let mut zones = ZoneSet::default();
    zones
        .open_spaces
        .push(rect_polygon(Point::new(0.0, 0.0), side, side));
    zones
}

fn fast_ga() -> GaConfig {
    GaConfig {
        population_size: 40,
        max_generations: 40,
        deadline: Duration::from_secs(10),
        ..Default::default()
    }
}

/// S1: 10x10 open square, no obstacles, mix=(0,0,0,1), target=4.
#[test]
fn s1_single_row_square_places_large_units_with_no_corridors() {
    let zones = open_square(10.0);
    let mix = SizeMix {
        f0_1: 0.0,
        f1_3: 0.0,
        f3_5: 0.0,
        f5_10: 1.0,
    };
    let outcome = place(&zones, mix, 4, 0.3, fast_ga(), &CancellationToken::new());
    let units = match outcome {
        PlacementOutcome::Placed { units, .. } => units,
        PlacementOutcome::Empty { .. } => panic!("expected S1 to place units"),
    };
    assert!(units.len() >= 3, "expected >=3 units, got {}", units.len());
    for u in &units {
        assert!(u.area >= 5.0 - 1e-6 && u.area <= 10.0 + 1e-6);
    }
    for (i, a) in units.iter().enumerate() {
        for b in units.iter().skip(i + 1) {
            let overlap = ilot_layout_core::geometry::intersects_area(&a.polygon, &b.polygon);
            assert!(overlap < 1e-6, "units {} and {} overlap", a.id, b.id);
        }
    }

    let corridors = generate_corridors(&units, &zones.open_spaces, 1.5);
    assert!(corridors.is_empty(), "a single row should emit no corridors");
}

/// S2: two open bands separated by a gap that belongs to no open space.
#[test]
fn s2_gap_not_open_space_yields_no_corridor() {
    let units = vec![
        unit(0, 0.0, 0.0, 2.0, 2.0),
        unit(1, 3.0, 0.0, 2.0, 2.0),
        unit(2, 0.0, 6.0, 2.0, 2.0),
        unit(3, 3.0, 6.0, 2.0, 2.0),
    ];
    let open = vec![
        rect_polygon(Point::new(-1.0, -1.0), 12.0, 4.0),
        rect_polygon(Point::new(-1.0, 5.0), 12.0, 4.0),
    ];
    let corridors = generate_corridors(&units, &open, 1.5);
    assert!(corridors.is_empty());
}

/// S3: same as S2 but the gap IS open space.
#[test]
fn s3_gap_is_open_space_yields_a_corridor() {
    let units = vec![
        unit(0, 0.0, 0.0, 2.0, 2.0),
        unit(1, 3.0, 0.0, 2.0, 2.0),
        unit(2, 0.0, 6.0, 2.0, 2.0),
        unit(3, 3.0, 6.0, 2.0, 2.0),
    ];
    let open = vec![rect_polygon(Point::new(-1.0, -1.0), 12.0, 12.0)];
    let corridors = generate_corridors(&units, &open, 1.5);
    assert_eq!(corridors.len(), 1);
    assert!(corridors[0].length >= 2.0);
    assert_relative_eq!(corridors[0].width, 1.5, epsilon = 1e-9);
}

fn unit(id: u32, x: f64, y: f64, w: f64, h: f64) -> ilot_layout_core::PlacedUnit {
    use ilot_layout_core::{Rotation, SizeBand};
    ilot_layout_core::PlacedUnit {
        id,
        polygon: rect_polygon(Point::new(x, y), w, h),
        area: w * h,
        category: SizeBand::B3_5,
        center: Point::new(x + w / 2.0, y + h / 2.0),
        width: w,
        height: h,
        rotation: Rotation::Deg0,
    }
}

/// S4: a restricted (ACI-5) polygon inside a 20x20 open region — no unit
/// may overlap it, and coverage is computed relative to (envelope minus
/// obstacles), not the raw 400 m² envelope.
#[test]
fn s4_restricted_polygon_is_never_overlapped() {
    let mut drawing = Drawing::new();

    // Four walls bounding a 20x20 envelope, so the space computer has an
    // explicit boundary to subtract the restricted zone from rather than
    // relying on the restricted zone alone to define the envelope.
    add_wall_square(&mut drawing, 0.0, 0.0, 20.0);
    // A restricted (ACI-5) square of area 20 m^2, entirely interior.
    add_restricted_square(&mut drawing, 8.0, 8.0, 20f64.sqrt());

    let path = write_temp_dxf(&drawing, "s4_restricted.dxf");
    let config = Config::default()
        .with_size_mix(SizeMix {
            f0_1: 0.25,
            f1_3: 0.25,
            f3_5: 0.25,
            f5_10: 0.25,
        })
        .with_target_count(10)
        .with_rng_seed(42)
        .with_ga_deadline_ms(10_000);
    let result = process(&path, &config);

    assert!(
        result.success,
        "expected pipeline to succeed, got: {:?}",
        result.error_message
    );
    assert!(
        result.metrics.total_open_area < 400.0,
        "coverage must be computed relative to envelope minus obstacles, not the raw envelope"
    );
    let restricted = &result.zones.restricted[0];
    for u in &result.units {
        let overlap = ilot_layout_core::geometry::intersects_area(&u.polygon, restricted);
        assert!(overlap < 1e-6, "unit {} overlaps the restricted zone", u.id);
    }
}

/// S5: a red (ACI-1, entrance) 2x2 rectangle on the south edge of a 20x20
/// envelope — no unit may come within `entrance_clearance` of it.
#[test]
fn s5_no_unit_within_clearance_of_entrance() {
    let mut drawing = Drawing::new();
    add_wall_square(&mut drawing, 0.0, 0.0, 20.0);
    add_entrance_square(&mut drawing, 9.0, 0.0, 2.0);

    let path = write_temp_dxf(&drawing, "s5_entrance.dxf");
    let config = Config::default()
        .with_size_mix(SizeMix {
            f0_1: 0.25,
            f1_3: 0.25,
            f3_5: 0.25,
            f5_10: 0.25,
        })
        .with_target_count(20)
        .with_rng_seed(7)
        .with_ga_deadline_ms(10_000);
    let result = process(&path, &config);

    assert!(
        result.success,
        "expected pipeline to succeed, got: {:?}",
        result.error_message
    );
    let entrance = &result.zones.entrances[0];
    for u in &result.units {
        let dist = ilot_layout_core::geometry::distance(&u.polygon, entrance);
        assert!(
            dist >= config.entrance_clearance - 1e-6,
            "unit {} is within clearance of the entrance (dist={dist})",
            u.id
        );
    }
}

fn add_wall_square(drawing: &mut Drawing, x: f64, y: f64, side: f64) {
    let corners = [
        (x, y),
        (x + side, y),
        (x + side, y + side),
        (x, y + side),
        (x, y),
    ];
    for pair in corners.windows(2) {
        let (x1, y1) = pair[0];
        let (x2, y2) = pair[1];
        let mut entity = Entity::new(EntityType::Line(Line::new(
            DxfPoint::new(x1, y1, 0.0),
            DxfPoint::new(x2, y2, 0.0),
        )));
        entity.common.layer = "WALL-PERIMETER".to_string();
        entity.common.color = Color::from_raw_value(7);
        drawing.add_entity(entity);
    }
}

fn add_restricted_square(drawing: &mut Drawing, x: f64, y: f64, side: f64) {
    let corners = [
        (x, y),
        (x + side, y),
        (x + side, y + side),
        (x, y + side),
        (x, y),
    ];
    for pair in corners.windows(2) {
        let (x1, y1) = pair[0];
        let (x2, y2) = pair[1];
        let mut entity = Entity::new(EntityType::Line(Line::new(
            DxfPoint::new(x1, y1, 0.0),
            DxfPoint::new(x2, y2, 0.0),
        )));
        entity.common.layer = "RESTRICTED-STAIRS".to_string();
        entity.common.color = Color::from_raw_value(5);
        drawing.add_entity(entity);
    }
}

fn add_entrance_square(drawing: &mut Drawing, x: f64, y: f64, side: f64) {
    let corners = [
        (x, y),
        (x + side, y),
        (x + side, y + side),
        (x, y + side),
        (x, y),
    ];
    for pair in corners.windows(2) {
        let (x1, y1) = pair[0];
        let (x2, y2) = pair[1];
        let mut entity = Entity::new(EntityType::Line(Line::new(
            DxfPoint::new(x1, y1, 0.0),
            DxfPoint::new(x2, y2, 0.0),
        )));
        entity.common.layer = "MAIN-ENTRANCE".to_string();
        entity.common.color = Color::from_raw_value(1);
        drawing.add_entity(entity);
    }
}

/// S6: an empty DXF (zero entities) fails with NoEntities/NoGeometry.
#[test]
fn s6_empty_dxf_fails_cleanly() {
    let drawing = Drawing::new();
    let path = write_temp_dxf(&drawing, "s6_empty.dxf");
    let result = process(&path, &Config::default());
    assert!(!result.success);
    let msg = result.error_message.unwrap_or_default();
    assert!(
        msg.to_lowercase().contains("entit") || msg.to_lowercase().contains("geometry"),
        "unexpected error message: {msg}"
    );
}

/// A lone full circle entity is usable, non-panicking input (defensive
/// coverage for the CIRCLE extraction rule, spec §4.1).
#[test]
fn circle_entity_round_trips_through_the_parser() {
    let mut drawing = Drawing::new();
    let mut entity = Entity::new(EntityType::Circle(Circle::new(DxfPoint::new(5.0, 5.0, 0.0), 5.0)));
    entity.common.layer = "0".to_string();
    entity.common.color = Color::from_raw_value(7);
    drawing.add_entity(entity);

    let path = write_temp_dxf(&drawing, "circle_only.dxf");
    let result = process(&path, &Config::default().with_target_count(0));
    // A single wall-classified circle (area fallback) has no open space,
    // so this should fail gracefully rather than panic.
    assert!(!result.success || result.units.is_empty());
}

/// Spec §8 boundary #11: `size_mix=(1,0,0,0)` must produce units drawn
/// exclusively from `B0_1`, never a size the mix assigns zero weight.
#[test]
fn s8_11_all_weight_on_smallest_band_yields_only_that_band() {
    let mut drawing = Drawing::new();
    add_wall_square(&mut drawing, 0.0, 0.0, 20.0);
    let path = write_temp_dxf(&drawing, "s8_11_size_mix_single_band.dxf");

    let config = Config::default()
        .with_size_mix(SizeMix {
            f0_1: 1.0,
            f1_3: 0.0,
            f3_5: 0.0,
            f5_10: 0.0,
        })
        .with_target_count(10)
        .with_rng_seed(1)
        .with_ga_deadline_ms(10_000);
    let result = process(&path, &config);

    assert!(
        result.success,
        "expected pipeline to succeed, got: {:?}",
        result.error_message
    );
    assert!(!result.units.is_empty(), "expected at least one unit to be placed");
    for u in &result.units {
        assert_eq!(u.category, SizeBand::B0_1, "unit {} has an off-mix category", u.id);
    }
}

/// Spec §8 boundary #12: `target_count=0` must yield empty units and
/// corridors with `success == true` — zero requested units is not an error.
#[test]
fn s8_12_zero_target_count_yields_empty_result_but_still_succeeds() {
    let mut drawing = Drawing::new();
    add_wall_square(&mut drawing, 0.0, 0.0, 20.0);
    let path = write_temp_dxf(&drawing, "s8_12_zero_target_count.dxf");

    let config = Config::default().with_target_count(0);
    let result = process(&path, &config);

    assert!(
        result.success,
        "target_count=0 is a valid boundary, not an error: {:?}",
        result.error_message
    );
    assert!(result.units.is_empty(), "expected no units for target_count=0");
    assert!(result.corridors.is_empty(), "expected no corridors for target_count=0");
}

fn write_temp_dxf(drawing: &Drawing, name: &str) -> std::path::PathBuf {
    let mut path = std::env::temp_dir();
    path.push(format!("ilot_layout_core_test_{name}"));
    drawing
        .save_file(path.to_str().expect("temp path should be valid UTF-8"))
        .expect("failed to write temporary DXF fixture");
    path
}
