//! Corridor construction throughput over a synthetic multi-row layout.

use criterion::{criterion_group, criterion_main, Criterion};
use ilot_layout_core::corridors::generate;
use ilot_layout_core::geometry::{rect_polygon, Point};
use ilot_layout_core::{PlacedUnit, Rotation, SizeBand};

fn synthetic_rows(rows: usize, per_row: usize) -> Vec<PlacedUnit> {
    let mut units = Vec::with_capacity(rows * per_row);
    let mut id = 0;
    for row in 0..rows {
        let y = row as f64 * 6.0;
        for col in 0..per_row {
            let x = col as f64 * 3.0;
            units.push(PlacedUnit {
                id,
                polygon: rect_polygon(Point::new(x, y), 2.0, 2.0),
                area: 4.0,
                category: SizeBand::B3_5,
                center: Point::new(x + 1.0, y + 1.0),
                width: 2.0,
                height: 2.0,
                rotation: Rotation::Deg0,
            });
            id += 1;
        }
    }
    units
}

fn bench_corridors(c: &mut Criterion) {
    let units = synthetic_rows(10, 8);
    let open = vec![rect_polygon(Point::new(-1.0, -1.0), 30.0, 65.0)];

    c.bench_function("corridors_10_rows_8_per_row", |b| {
        b.iter(|| generate(&units, &open, 1.5))
    });
}

criterion_group!(benches, bench_corridors);
criterion_main!(benches);
