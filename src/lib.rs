//! Floor-plan zone classification, open-space computation, îlot placement
//! and corridor synthesis over a DXF floor plan.
//!
//! Takes in a DXF file path and a [`Config`] and runs the four-stage
//! pipeline described by the crate's design document end to end:
//! **CAD parsing** ([`parser`]) classifies every vector entity into one of
//! four semantic zones, **space computation** ([`space`]) subtracts
//! obstacles from the envelope to find placeable area, the **placement
//! engine** ([`placement`]) packs a target count of rectangular units into
//! that area with a bounded-time evolutionary search, and the **corridor
//! generator** ([`corridors`]) threads a corridor network between opposing
//! rows of placed units.
//!
//! ## Quick-start:
//! 1. Build a [`Config`] (or use [`Config::default`]) with your desired
//!    `size_mix`, `target_count`, and spacing/width parameters.
//! 2. Call [`process`] with the path to a DXF document.
//! 3. Inspect the returned [`LayoutResult`] — `success` tells you whether
//!    the pipeline completed; `zones`, `units`, `corridors` and `metrics`
//!    carry the structured output.
//!
//! The crate is a pure library: no upload endpoints, no session storage, no
//! export/rendering, no CLI or logging configuration — those are the
//! caller's concern. Wire in a `tracing` subscriber to see the per-stage
//! spans and events this crate emits.

use std::path::Path;
use std::time::{Duration, Instant};

pub mod corridors;
pub mod error;
pub mod geometry;
pub mod parser;
pub mod placement;
pub mod space;
pub mod types;

pub use error::{LayoutError, ParseError};
pub use geometry::{Point, Polygon};
pub use placement::GaConfig;
pub use types::{
    Chromosome, Corridor, Gene, GenerationStats, LayoutMetrics, PlacedUnit, PlacementOutcome,
    Rotation, SizeBand, SizeMix, StopReason, UnitSpec, ZoneKind, ZoneSet,
};

/// Cooperative cancellation signal, checked at the same granularity as the
/// placement deadline: between GA generations (spec §5).
///
/// Cheap to clone; typically backed by an `Arc<AtomicBool>` the caller
/// flips from another thread, mirroring how the teacher's tile generation
/// tasks are cooperatively cancelled rather than forcibly aborted.
#[derive(Clone, Default)]
pub struct CancellationToken(std::sync::Arc<std::sync::atomic::AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, std::sync::atomic::Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(std::sync::atomic::Ordering::Relaxed)
    }
}

/// Pipeline configuration (spec §6). One field per documented option, a
/// `Default` matching the documented defaults, and `with_*` setters in the
/// teacher's `NavMeshSettings` style rather than an external builder crate.
#[derive(Debug, Clone)]
pub struct Config {
    /// Per-band unit count fraction. Must sum to 1.0 +/- 0.01.
    pub size_mix: SizeMix,
    /// Total units the placement engine attempts to place.
    pub target_count: u32,
    /// Corridor rectangle width, in meters.
    pub corridor_width: f64,
    /// Minimum gap enforced between any two placed units, in meters.
    pub min_spacing: f64,
    /// Half-width applied when buffering linear wall entities, in meters.
    pub wall_buffer: f64,
    /// Forbidden ring around entrance polygons, in meters.
    pub entrance_clearance: f64,
    /// GA population size.
    pub ga_population: u32,
    /// GA generation cap.
    pub ga_generations: u32,
    /// Per-chromosome mutation probability.
    pub ga_mutation_rate: f64,
    /// Per-chromosome crossover probability.
    pub ga_crossover_rate: f64,
    /// Number of top chromosomes preserved unchanged each generation.
    pub ga_elite_size: u32,
    /// Wall-clock budget for the evolutionary search.
    pub ga_deadline_ms: u64,
    /// RNG seed; same seed + same input + same config reproduces the same
    /// chromosome sequence (modulo the geometry backend's float
    /// determinism).
    pub rng_seed: u64,
}

impl Default for Config {
    fn default() -> Self {
        let ga = GaConfig::default();
        Config {
            size_mix: SizeMix::default(),
            target_count: 100,
            corridor_width: 1.5,
            min_spacing: 0.3,
            wall_buffer: parser::DEFAULT_WALL_BUFFER,
            entrance_clearance: types::ENTRANCE_CLEARANCE,
            ga_population: ga.population_size,
            ga_generations: ga.max_generations,
            ga_mutation_rate: ga.mutation_rate,
            ga_crossover_rate: ga.crossover_rate,
            ga_elite_size: ga.elite_size,
            ga_deadline_ms: ga.deadline.as_millis() as u64,
            rng_seed: 0,
        }
    }
}

impl Config {
    /// Setter for [`Config::size_mix`].
    pub fn with_size_mix(mut self, size_mix: SizeMix) -> Self {
        self.size_mix = size_mix;
        self
    }

    /// Setter for [`Config::target_count`].
    pub fn with_target_count(mut self, target_count: u32) -> Self {
        self.target_count = target_count;
        self
    }

    /// Setter for [`Config::min_spacing`] and [`Config::corridor_width`].
    pub fn with_spacing(mut self, min_spacing: f64, corridor_width: f64) -> Self {
        self.min_spacing = min_spacing;
        self.corridor_width = corridor_width;
        self
    }

    /// Setter for [`Config::rng_seed`].
    pub fn with_rng_seed(mut self, rng_seed: u64) -> Self {
        self.rng_seed = rng_seed;
        self
    }

    /// Setter for [`Config::ga_deadline_ms`].
    pub fn with_ga_deadline_ms(mut self, ga_deadline_ms: u64) -> Self {
        self.ga_deadline_ms = ga_deadline_ms;
        self
    }

    fn ga_config(&self) -> GaConfig {
        GaConfig {
            population_size: self.ga_population,
            max_generations: self.ga_generations,
            mutation_rate: self.ga_mutation_rate,
            crossover_rate: self.ga_crossover_rate,
            elite_size: self.ga_elite_size,
            tournament_size: GaConfig::default().tournament_size,
            stall_limit: GaConfig::default().stall_limit,
            deadline: Duration::from_millis(self.ga_deadline_ms),
            rng_seed: self.rng_seed,
        }
    }
}

/// Final structured output of the pipeline (spec §3 `LayoutResult`).
#[derive(Debug, Clone, Default)]
pub struct LayoutResult {
    pub zones: ZoneSet,
    pub units: Vec<PlacedUnit>,
    pub corridors: Vec<Corridor>,
    pub metrics: LayoutMetrics,
    pub success: bool,
    pub error_message: Option<String>,
}

impl LayoutResult {
    fn failed(error_message: impl Into<String>) -> Self {
        LayoutResult {
            success: false,
            error_message: Some(error_message.into()),
            ..Default::default()
        }
    }
}

/// Drives the four-stage pipeline end to end (spec §4.5 Orchestrator).
///
/// Control flow is strictly linear: a stage failure terminates the pipeline
/// and returns a `LayoutResult` with `success = false` and a descriptive
/// `error_message`, per §7's error taxonomy. Never panics on malformed
/// input or configuration.
pub fn process(path: &Path, config: &Config) -> LayoutResult {
    process_cancellable(path, config, &CancellationToken::new())
}

/// As [`process`], but honors a [`CancellationToken`] checked at the same
/// granularity as the GA deadline: between generations (spec §5).
pub fn process_cancellable(path: &Path, config: &Config, cancel: &CancellationToken) -> LayoutResult {
    let start = Instant::now();

    if !config.size_mix.is_valid() {
        return LayoutResult::failed(format!(
            "{}",
            LayoutError::InvalidSizeMix(config.size_mix.as_array())
        ));
    }

    if config.ga_population == 0 {
        return LayoutResult::failed(format!(
            "{}",
            LayoutError::InvalidGaPopulation(config.ga_population)
        ));
    }

    let parse_span = tracing::info_span!("parse");
    let zones = {
        let _enter = parse_span.enter();
        match parser::parse(path, config.wall_buffer) {
            Ok(zones) => zones,
            Err(err) => return LayoutResult::failed(format!("{}", LayoutError::from(err))),
        }
    };

    if zones.is_empty() {
        return LayoutResult::failed(format!("{}", LayoutError::NoGeometry));
    }

    let space_span = tracing::info_span!("space");
    let open_spaces = {
        let _enter = space_span.enter();
        space::compute_open_spaces(&zones, config.entrance_clearance)
    };
    let open_spaces = match open_spaces {
        // `zones` is non-empty (checked above), so `None` here means the
        // envelope itself couldn't be derived from any zone's bounds, not
        // that the envelope was fully obstacle-covered (spec §7
        // `GeometryDegenerate`: "if the envelope can't be computed").
        None => {
            return LayoutResult {
                zones,
                success: false,
                error_message: Some(format!(
                    "{}",
                    LayoutError::GeometryDegenerate("envelope could not be computed from any zone".into())
                )),
                ..Default::default()
            };
        }
        Some(open_spaces) if open_spaces.is_empty() => {
            return LayoutResult {
                zones,
                success: false,
                error_message: Some(format!("{}", LayoutError::NoOpenSpace)),
                ..Default::default()
            };
        }
        Some(open_spaces) => open_spaces,
    };

    let mut zones = zones;
    zones.open_spaces = open_spaces;
    let total_open_area = space::total_area(&zones.open_spaces);

    let placement_span = tracing::info_span!("placement");
    let outcome = {
        let _enter = placement_span.enter();
        placement::place(
            &zones,
            config.size_mix,
            config.target_count,
            config.min_spacing,
            config.ga_config(),
            cancel,
        )
    };

    let (units, placement_fitness, generation_history, stop_reason) = match outcome {
        PlacementOutcome::Placed {
            units,
            fitness,
            generation_history,
            stop_reason,
            ..
        } => (units, fitness, generation_history, stop_reason),
        PlacementOutcome::Empty {
            generation_history,
            stop_reason,
            ..
        } => {
            let cancelled = stop_reason == StopReason::Cancelled;
            return LayoutResult {
                zones,
                units: Vec::new(),
                corridors: Vec::new(),
                metrics: LayoutMetrics {
                    total_open_area,
                    elapsed: start.elapsed(),
                    generation_history,
                    ..Default::default()
                },
                success: !cancelled,
                error_message: Some(format!(
                    "{}",
                    if cancelled { LayoutError::Cancelled } else { LayoutError::PlacementEmpty }
                )),
            };
        }
    };

    // A genuine mid-search cancellation is reported as a failure per spec
    // §5; a deadline or stall-limit stop still returns the best-so-far units
    // as a successful result, tagged with an informational error_message
    // (mirroring `PlacementEmpty`'s non-fatal shape) for `DeadlineExceeded`.
    if stop_reason == StopReason::Cancelled {
        return LayoutResult {
            zones,
            units,
            corridors: Vec::new(),
            metrics: LayoutMetrics {
                total_open_area,
                elapsed: start.elapsed(),
                generation_history,
                ..Default::default()
            },
            success: false,
            error_message: Some(format!("{}", LayoutError::Cancelled)),
        };
    }

    let corridor_span = tracing::info_span!("corridors");
    let mut corridors = {
        let _enter = corridor_span.enter();
        corridors::generate(&units, &zones.open_spaces, config.corridor_width)
    };
    for (id, corridor) in corridors.iter_mut().enumerate() {
        corridor.id = id as u32;
    }

    let unit_area: f64 = units.iter().map(|u| u.area).sum();
    let corridor_area: f64 = corridors.iter().map(|c| geometry::area(&c.polygon)).sum();
    let unit_coverage_pct = pct(unit_area, total_open_area);
    let corridor_coverage_pct = pct(corridor_area, total_open_area);

    let error_message = if stop_reason == StopReason::Deadline {
        Some(format!("{}", LayoutError::DeadlineExceeded))
    } else {
        None
    };

    LayoutResult {
        zones,
        units,
        corridors,
        metrics: LayoutMetrics {
            total_open_area,
            unit_coverage_pct,
            corridor_coverage_pct,
            total_coverage_pct: unit_coverage_pct + corridor_coverage_pct,
            placement_fitness,
            elapsed: start.elapsed(),
            generation_history,
        },
        success: true,
        error_message,
    }
}

fn pct(part: f64, whole: f64) -> f64 {
    if whole > 0.0 {
        part / whole * 100.0
    } else {
        0.0
    }
}
