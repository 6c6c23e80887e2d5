//! Core value types shared by every stage of the pipeline (spec §3).
//!
//! Nothing in this module depends on `dxf`, `rand`, or `kodama` — it is the
//! vocabulary the parser, space computer, placement engine and corridor
//! generator all speak, independent of how each stage is implemented.

use crate::geometry::Polygon;

/// Minimum area (m²) a polygon must have to survive into any zone list.
pub const MIN_ZONE_AREA: f64 = 0.1;
/// Default forbidden ring applied around entrance polygons before
/// subtracting them from the envelope (spec §4.2). Overridable via
/// [`crate::Config::entrance_clearance`].
pub const ENTRANCE_CLEARANCE: f64 = 0.2;
/// Fixed buffer applied around entrance polygons when building the
/// placement engine's forbidden zone (spec §4.3.2). Distinct from, and
/// wider than, [`ENTRANCE_CLEARANCE`]; not exposed as a config knob.
pub const PLACEMENT_ENTRANCE_BUFFER: f64 = 0.3;
/// Minimum corridor rectangle length (spec §4.4.2 step 3).
pub const MIN_CORRIDOR_LENGTH: f64 = 2.0;
/// Maximum gap between two rows for a corridor to be attempted.
pub const MAX_ROW_GAP: f64 = 10.0;
/// y-distance tolerance used to cluster îlots into rows (spec §4.4.1).
pub const ROW_TOLERANCE: f64 = 3.0;

/// The four disjoint semantic layers a raw CAD polygon is classified into
/// (spec §4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ZoneKind {
    Wall,
    Restricted,
    Entrance,
    OpenSpace,
}

/// A single polygon extracted from one DXF entity, tagged with the raw
/// color/layer signals the classifier consumes, before classification has
/// been folded into a [`ZoneSet`].
#[derive(Debug, Clone)]
pub struct RawZone {
    pub kind: ZoneKind,
    pub polygon: Polygon,
    pub layer_name: String,
    pub aci_color: u16,
    pub true_color: Option<u32>,
    /// Human-readable classification reason, e.g. `"aci=1 -> Entrance"`.
    /// Populated only with the `trace` feature enabled; the hot path pays
    /// nothing for it otherwise.
    #[cfg(feature = "trace")]
    pub classification_reason: Option<String>,
}

/// The four disjoint zone layers produced by the parser and refined by the
/// space computer (spec §3 `ZoneSet`).
#[derive(Debug, Clone, Default)]
pub struct ZoneSet {
    pub walls: Vec<Polygon>,
    pub restricted: Vec<Polygon>,
    pub entrances: Vec<Polygon>,
    pub open_spaces: Vec<Polygon>,
}

impl ZoneSet {
    pub fn is_empty(&self) -> bool {
        self.walls.is_empty()
            && self.restricted.is_empty()
            && self.entrances.is_empty()
            && self.open_spaces.is_empty()
    }
}

/// Half-open area band in m² a unit's `target_area` is sampled from (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SizeBand {
    B0_1,
    B1_3,
    B3_5,
    B5_10,
}

impl SizeBand {
    pub const ALL: [SizeBand; 4] = [
        SizeBand::B0_1,
        SizeBand::B1_3,
        SizeBand::B3_5,
        SizeBand::B5_10,
    ];

    /// Half-open `[low, high)` area range, except `B5_10` which is closed
    /// (spec §3: "the lower bound of B0_1 is 0.5, not 0").
    pub fn range(self) -> (f64, f64) {
        match self {
            SizeBand::B0_1 => (0.5, 1.0),
            SizeBand::B1_3 => (1.0, 3.0),
            SizeBand::B3_5 => (3.0, 5.0),
            SizeBand::B5_10 => (5.0, 10.0),
        }
    }
}

/// Per-band count fractions, must sum to 1.0 +/- 0.01 (spec §3 `SizeMix`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SizeMix {
    pub f0_1: f64,
    pub f1_3: f64,
    pub f3_5: f64,
    pub f5_10: f64,
}

impl SizeMix {
    pub fn fraction(&self, band: SizeBand) -> f64 {
        match band {
            SizeBand::B0_1 => self.f0_1,
            SizeBand::B1_3 => self.f1_3,
            SizeBand::B3_5 => self.f3_5,
            SizeBand::B5_10 => self.f5_10,
        }
    }

    pub fn sum(&self) -> f64 {
        self.f0_1 + self.f1_3 + self.f3_5 + self.f5_10
    }

    /// Validates the non-negativity and sum-to-one-within-tolerance
    /// invariant (spec §7 `InvalidSizeMix`).
    pub fn is_valid(&self) -> bool {
        [self.f0_1, self.f1_3, self.f3_5, self.f5_10]
            .iter()
            .all(|f| *f >= 0.0)
            && (self.sum() - 1.0).abs() <= 0.01
    }

    pub fn as_array(&self) -> [f64; 4] {
        [self.f0_1, self.f1_3, self.f3_5, self.f5_10]
    }
}

impl Default for SizeMix {
    fn default() -> Self {
        SizeMix {
            f0_1: 0.10,
            f1_3: 0.25,
            f3_5: 0.30,
            f5_10: 0.35,
        }
    }
}

/// A unit to be placed, generated before the search begins (spec §3
/// `UnitSpec`). Dimensions are pre-rotation.
#[derive(Debug, Clone, Copy)]
pub struct UnitSpec {
    pub target_area: f64,
    pub width: f64,
    pub height: f64,
    pub category: SizeBand,
}

/// Rotation a gene/unit may take. Only axis-aligned placements are modeled
/// (spec §1 non-goals: no curved routing, no arbitrary rotation).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rotation {
    Deg0,
    Deg90,
}

impl Rotation {
    pub fn as_degrees(self) -> u16 {
        match self {
            Rotation::Deg0 => 0,
            Rotation::Deg90 => 90,
        }
    }
}

/// One gene in a [`Chromosome`]: a proposed placement for the spec at the
/// same index (spec §3).
#[derive(Debug, Clone, Copy)]
pub struct Gene {
    pub x: f64,
    pub y: f64,
    pub rotation: Rotation,
}

/// An ordered vector of genes, one per [`UnitSpec`], indexed positionally.
pub type Chromosome = Vec<Gene>;

/// A unit that survived validation during realization of a chromosome
/// (spec §3 `PlacedUnit`). `polygon` reflects the post-rotation footprint.
#[derive(Debug, Clone)]
pub struct PlacedUnit {
    pub id: u32,
    pub polygon: Polygon,
    pub area: f64,
    pub category: SizeBand,
    pub center: crate::geometry::Point,
    pub width: f64,
    pub height: f64,
    pub rotation: Rotation,
}

/// Per-generation telemetry recorded by the search for diagnostics
/// (SPEC_FULL §4.3 supplement). Purely additive — it plays no role in
/// selection or acceptance.
#[derive(Debug, Clone, Copy)]
pub struct GenerationStats {
    pub generation: u32,
    pub best_fitness: f64,
    pub mean_fitness: f64,
    pub realized_unit_count: u32,
}

/// Why the generational search stopped iterating (SPEC_FULL §4.3/§5
/// supplement). Purely diagnostic except `Cancelled`, which the orchestrator
/// uses to distinguish a genuine cancellation (`success = false`, spec §5)
/// from every other stop condition (`success = true`, best-so-far returned).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Fitness stalled for `stall_limit` consecutive generations.
    Converged,
    /// `max_generations` was reached before convergence or the deadline.
    MaxGenerations,
    /// `ga.deadline` elapsed before convergence (spec §7 `DeadlineExceeded`).
    Deadline,
    /// The cancellation token was observed between generations (spec §5).
    Cancelled,
}

/// Outcome of a placement run (spec §4.3.6).
#[derive(Debug, Clone)]
pub enum PlacementOutcome {
    Placed {
        units: Vec<PlacedUnit>,
        fitness: f64,
        elapsed: std::time::Duration,
        coverage_pct: f64,
        generation_history: Vec<GenerationStats>,
        stop_reason: StopReason,
    },
    /// No chromosome produced a single placed unit across the whole run.
    Empty {
        elapsed: std::time::Duration,
        generation_history: Vec<GenerationStats>,
        stop_reason: StopReason,
    },
}

/// An axis-aligned corridor rectangle routed between two adjacent rows
/// (spec §3 `Corridor`).
#[derive(Debug, Clone)]
pub struct Corridor {
    pub id: u32,
    pub polygon: Polygon,
    pub width: f64,
    pub length: f64,
    pub connects: (usize, usize),
    pub endpoints: (crate::geometry::Point, crate::geometry::Point),
}

/// Aggregate metrics attached to the final [`crate::LayoutResult`].
#[derive(Debug, Clone, Default)]
pub struct LayoutMetrics {
    pub total_open_area: f64,
    pub unit_coverage_pct: f64,
    pub corridor_coverage_pct: f64,
    pub total_coverage_pct: f64,
    pub placement_fitness: f64,
    pub elapsed: std::time::Duration,
    /// Per-generation diagnostics from the evolutionary search (SPEC_FULL
    /// §4.3 supplement); empty if the placement stage never ran.
    pub generation_history: Vec<GenerationStats>,
}
