//! Corridor synthesis: row clustering + rectangle routing between adjacent
//! rows (spec §4.4).

use crate::geometry::{self, intersects_area, multi_contains, rect_polygon, MultiPolygon, Point, Polygon};
use crate::types::{Corridor, PlacedUnit, MAX_ROW_GAP, MIN_CORRIDOR_LENGTH, ROW_TOLERANCE};

struct RowBounds {
    xmin: f64,
    xmax: f64,
    ymin: f64,
    ymax: f64,
    mean_y: f64,
}

/// Generates the corridor network between adjacent rows of placed units
/// (spec §4.4.1-4.4.2). Ids are assigned sequentially by the caller
/// (the orchestrator), matching spec §4.4's note that row generation itself
/// is unnumbered.
pub fn generate(units: &[PlacedUnit], open_spaces: &[Polygon], corridor_width: f64) -> Vec<Corridor> {
    if units.len() < 4 {
        return Vec::new();
    }

    let rows = group_into_rows(units);
    let mut rows: Vec<RowBounds> = rows
        .into_iter()
        .filter(|row| row.len() >= 2)
        .map(row_bounds)
        .collect();
    rows.sort_by(|a, b| a.mean_y.partial_cmp(&b.mean_y).unwrap_or(std::cmp::Ordering::Equal));

    let open_union = geometry::union_all(open_spaces);

    let mut corridors = Vec::new();
    for (i, window) in rows.windows(2).enumerate() {
        let (r0, r1) = (&window[0], &window[1]);
        if let Some(corridor) = build_corridor(r0, r1, (i, i + 1), units, &open_union, corridor_width) {
            corridors.push(corridor);
        }
    }
    corridors
}

/// Groups unit indices into rows. When the `clustering` feature is enabled
/// this uses Ward-linkage hierarchical clustering over the y-centers via
/// `kodama`, cut at [`ROW_TOLERANCE`]; otherwise (or if clustering
/// degenerates to a single useless cluster) falls back to a 1D sweep:
/// sort by y, greedily group while the consecutive gap stays under
/// tolerance (spec §4.4.1).
fn group_into_rows(units: &[PlacedUnit]) -> Vec<Vec<&PlacedUnit>> {
    #[cfg(feature = "clustering")]
    {
        if let Some(rows) = ward_linkage_rows(units) {
            return rows;
        }
    }
    sweep_rows(units)
}

#[cfg(feature = "clustering")]
fn ward_linkage_rows(units: &[PlacedUnit]) -> Option<Vec<Vec<&PlacedUnit>>> {
    use kodama::{linkage, Method};

    let n = units.len();
    if n < 2 {
        return None;
    }
    // kodama wants a condensed distance matrix over 1D y-centers.
    let mut condensed = Vec::with_capacity(n * (n - 1) / 2);
    for i in 0..n {
        for j in (i + 1)..n {
            condensed.push((units[i].center.y - units[j].center.y).abs());
        }
    }

    let dendrogram = linkage(&mut condensed, n, Method::Ward);
    let labels = cut_tree(&dendrogram, n, ROW_TOLERANCE);

    let max_label = *labels.iter().max()?;
    if max_label == 0 {
        tracing::debug!("ward linkage collapsed to a single cluster, falling back to 1D sweep");
        return None;
    }

    let mut groups: Vec<Vec<&PlacedUnit>> = vec![Vec::new(); max_label + 1];
    for (idx, &label) in labels.iter().enumerate() {
        groups[label].push(&units[idx]);
    }
    Some(groups)
}

/// Cuts a `kodama` dendrogram at the given distance threshold, returning a
/// per-leaf cluster label in `0..k`.
/// Cuts the dendrogram at `threshold` by walking its merge steps in order
/// (increasing dissimilarity) and union-finding every merge up to and
/// including the first one that exceeds the threshold, using kodama's
/// cluster-id convention (`n + step_index` for the cluster a step produces).
#[cfg(feature = "clustering")]
fn cut_tree(dendrogram: &kodama::Dendrogram<f64>, n: usize, threshold: f64) -> Vec<usize> {
    let total = n + dendrogram.steps().len();
    let mut parent: Vec<usize> = (0..total).collect();
    fn find(parent: &mut [usize], x: usize) -> usize {
        if parent[x] != x {
            parent[x] = find(parent, parent[x]);
        }
        parent[x]
    }

    for (i, step) in dendrogram.steps().iter().enumerate() {
        if step.dissimilarity > threshold {
            break;
        }
        let cluster_id = n + i;
        let a = find(&mut parent, step.cluster1);
        let b = find(&mut parent, step.cluster2);
        parent[a] = cluster_id;
        parent[b] = cluster_id;
    }

    let mut labels = vec![0usize; n];
    let mut next_label = 0usize;
    let mut seen = std::collections::HashMap::new();
    for i in 0..n {
        let root = find(&mut parent, i);
        let label = *seen.entry(root).or_insert_with(|| {
            let l = next_label;
            next_label += 1;
            l
        });
        labels[i] = label;
    }
    labels
}

fn sweep_rows(units: &[PlacedUnit]) -> Vec<Vec<&PlacedUnit>> {
    let mut sorted: Vec<&PlacedUnit> = units.iter().collect();
    sorted.sort_by(|a, b| a.center.y.partial_cmp(&b.center.y).unwrap_or(std::cmp::Ordering::Equal));

    let mut rows: Vec<Vec<&PlacedUnit>> = Vec::new();
    let mut current: Vec<&PlacedUnit> = Vec::new();
    let mut current_y: Option<f64> = None;

    for unit in sorted {
        match current_y {
            Some(y) if (unit.center.y - y).abs() < ROW_TOLERANCE => {
                current.push(unit);
            }
            _ => {
                if !current.is_empty() {
                    rows.push(std::mem::take(&mut current));
                }
                current.push(unit);
            }
        }
        current_y = Some(unit.center.y);
    }
    if !current.is_empty() {
        rows.push(current);
    }
    rows
}

fn row_bounds(row: Vec<&PlacedUnit>) -> RowBounds {
    let mut xmin = f64::MAX;
    let mut xmax = f64::MIN;
    let mut ymin = f64::MAX;
    let mut ymax = f64::MIN;
    let mut y_sum = 0.0;

    for unit in &row {
        if let Some(b) = geometry::bounds(&unit.polygon) {
            xmin = xmin.min(b.min().x);
            xmax = xmax.max(b.max().x);
            ymin = ymin.min(b.min().y);
            ymax = ymax.max(b.max().y);
        }
        y_sum += unit.center.y;
    }

    RowBounds {
        xmin,
        xmax,
        ymin,
        ymax,
        mean_y: y_sum / row.len() as f64,
    }
}

/// Builds the corridor rectangle between two adjacent rows, following the
/// six-step construction in spec §4.4.2. Returns `None` if any abort
/// condition fires (gap too large/non-positive, insufficient x-overlap,
/// interior overlap with a unit, and no open-space region can be recovered
/// by clipping).
fn build_corridor(
    r0: &RowBounds,
    r1: &RowBounds,
    connects: (usize, usize),
    units: &[PlacedUnit],
    open_union: &MultiPolygon,
    width: f64,
) -> Option<Corridor> {
    let gap = r1.ymin - r0.ymax;
    if gap > MAX_ROW_GAP || gap <= 0.0 {
        tracing::debug!(gap, "row gap out of range, skipping corridor");
        return None;
    }

    let cx_min = r0.xmin.max(r1.xmin);
    let cx_max = r0.xmax.min(r1.xmax);
    if cx_max - cx_min < MIN_CORRIDOR_LENGTH {
        tracing::debug!(overlap = cx_max - cx_min, "insufficient x-overlap, skipping corridor");
        return None;
    }

    let cy = (r0.ymax + r1.ymin) / 2.0;
    let rect = rect_polygon(Point::new(cx_min, cy - width / 2.0), cx_max - cx_min, width);

    if units.iter().any(|u| intersects_area(&rect, &u.polygon) > 0.01) {
        tracing::debug!("corridor rectangle overlaps a unit interior, skipping");
        return None;
    }

    let final_rect = if multi_contains(open_union, &rect) {
        rect
    } else {
        match clip_to_open_space(&rect, open_union, width) {
            Some(clipped) => clipped,
            None => {
                tracing::debug!("corridor clipping to open space failed area threshold");
                return None;
            }
        }
    };

    let length = cx_max - cx_min;
    Some(Corridor {
        id: 0,
        polygon: final_rect,
        width,
        length,
        connects,
        endpoints: (Point::new(cx_min, cy), Point::new(cx_max, cy)),
    })
}

/// Clips `rect` against the union of open spaces, keeping the result only
/// if it is a single polygon with area >= `MIN_CORRIDOR_LENGTH * width * 0.5`
/// (spec §4.4.2 step 6), taking the largest component if multi-polygon.
fn clip_to_open_space(rect: &Polygon, open_union: &MultiPolygon, width: f64) -> Option<Polygon> {
    let rect_multi = MultiPolygon::new(vec![rect.clone()]);
    let clipped = geometry::intersection(&rect_multi, open_union);
    let threshold = MIN_CORRIDOR_LENGTH * width * 0.5;

    clipped
        .into_iter()
        .map(|p| (geometry::area(&p), p))
        .filter(|(a, _)| *a >= threshold)
        .max_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(_, p)| p)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Rotation, SizeBand};

    fn unit_at(id: u32, x: f64, y: f64, w: f64, h: f64) -> PlacedUnit {
        PlacedUnit {
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

    #[test]
    fn fewer_than_four_units_yields_no_corridors() {
        let units = vec![unit_at(0, 0.0, 0.0, 2.0, 2.0), unit_at(1, 3.0, 0.0, 2.0, 2.0)];
        assert!(generate(&units, &[], 1.5).is_empty());
    }

    #[test]
    fn two_open_rows_get_a_corridor() {
        let units = vec![
            unit_at(0, 0.0, 0.0, 2.0, 2.0),
            unit_at(1, 3.0, 0.0, 2.0, 2.0),
            unit_at(2, 0.0, 6.0, 2.0, 2.0),
            unit_at(3, 3.0, 6.0, 2.0, 2.0),
        ];
        let open = vec![rect_polygon(Point::new(-1.0, -1.0), 12.0, 12.0)];
        let corridors = generate(&units, &open, 1.5);
        assert_eq!(corridors.len(), 1);
        assert!(corridors[0].length >= MIN_CORRIDOR_LENGTH);
        assert!((corridors[0].width - 1.5).abs() < 1e-9);
    }

    #[test]
    fn gap_not_open_space_yields_no_corridor() {
        let units = vec![
            unit_at(0, 0.0, 0.0, 2.0, 2.0),
            unit_at(1, 3.0, 0.0, 2.0, 2.0),
            unit_at(2, 0.0, 6.0, 2.0, 2.0),
            unit_at(3, 3.0, 6.0, 2.0, 2.0),
        ];
        // Two open bands, but the 2m gap between them belongs to neither.
        let open = vec![
            rect_polygon(Point::new(-1.0, -1.0), 12.0, 4.0),
            rect_polygon(Point::new(-1.0, 5.0), 12.0, 4.0),
        ];
        let corridors = generate(&units, &open, 1.5);
        assert!(corridors.is_empty());
    }
}
