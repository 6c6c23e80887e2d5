//! Evolutionary îlot placement (spec §4.3).
//!
//! Parameters here mirror the teacher's `NavMeshSettings`-style plain
//! configuration struct: fixed defaults, overridable fields, no external
//! builder-pattern crate. The search itself is a standard generational GA —
//! tournament selection, single-point crossover, subset-resample mutation —
//! realized against the validator in §4.3.4 and scored by the fitness in
//! §4.3.5.

use std::time::{Duration, Instant};

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::geometry::{self, contains, distance, intersects_area, rect_polygon, MultiPolygon, Point, Polygon};
use crate::space;
use crate::types::{
    Chromosome, Gene, GenerationStats, PlacedUnit, PlacementOutcome, Rotation, SizeBand, SizeMix,
    StopReason, UnitSpec, ZoneSet,
};
use crate::CancellationToken;

/// Fixed GA defaults (spec §4.3.3), all overridable via [`crate::Config`].
#[derive(Debug, Clone, Copy)]
pub struct GaConfig {
    pub population_size: u32,
    pub max_generations: u32,
    pub mutation_rate: f64,
    pub crossover_rate: f64,
    pub elite_size: u32,
    pub tournament_size: u32,
    pub stall_limit: u32,
    pub deadline: Duration,
    pub rng_seed: u64,
}

impl Default for GaConfig {
    fn default() -> Self {
        GaConfig {
            population_size: 50,
            max_generations: 100,
            mutation_rate: 0.10,
            crossover_rate: 0.70,
            elite_size: 10,
            tournament_size: 3,
            stall_limit: 20,
            deadline: Duration::from_millis(60_000),
            rng_seed: 0,
        }
    }
}

/// Fraction of the initial population seeded from a greedy shelf placement
/// rather than pure-random genes (SPEC_FULL §4.3 supplement). Not exposed
/// as config, matching §9's note about not exposing every tunable.
const SEED_FRACTION_GREEDY: f64 = 0.2;

/// Aspect-ratio bounds a unit's width/height are derived from (spec §3
/// `UnitSpec`).
const ASPECT_MIN: f64 = 1.2;
const ASPECT_MAX: f64 = 1.8;

struct Envelope {
    min_x: f64,
    min_y: f64,
    max_x: f64,
    max_y: f64,
}

impl Envelope {
    fn from_open_spaces(open_spaces: &[Polygon]) -> Option<Self> {
        let mut acc: Option<geo_types::Rect<f64>> = None;
        for poly in open_spaces {
            if let Some(b) = geometry::bounds(poly) {
                acc = Some(match acc {
                    Some(a) => geo_types::Rect::new(
                        geo_types::coord! { x: a.min().x.min(b.min().x), y: a.min().y.min(b.min().y) },
                        geo_types::coord! { x: a.max().x.max(b.max().x), y: a.max().y.max(b.max().y) },
                    ),
                    None => b,
                });
            }
        }
        acc.map(|r| Envelope {
            min_x: r.min().x,
            min_y: r.min().y,
            max_x: r.max().x,
            max_y: r.max().y,
        })
    }
}

/// Generates the unit specs for a target count under a size mix (spec
/// §4.3.1). Spec order is randomized afterwards to avoid positional bias.
pub fn generate_specs(mix: SizeMix, target_count: u32, rng: &mut ChaCha8Rng) -> Vec<UnitSpec> {
    let mut specs = Vec::with_capacity(target_count as usize);
    for band in SizeBand::ALL {
        let count = (target_count as f64 * mix.fraction(band)).round() as u32;
        for _ in 0..count {
            let (low, high) = band.range();
            let target_area = rng.gen_range(low..high);
            let aspect = rng.gen_range(ASPECT_MIN..ASPECT_MAX);
            let width = (target_area * aspect).sqrt();
            let height = target_area / width;
            specs.push(UnitSpec {
                target_area,
                width,
                height,
                category: band,
            });
        }
    }
    specs.shuffle(rng);
    specs
}

/// Runs the evolutionary search and returns the best outcome seen across
/// the whole run (spec §4.3.6).
///
/// `cancel` is checked at the same granularity as `ga.deadline`: once per
/// generation, right before that generation's fitness evaluation (spec §5).
pub fn place(
    zones: &ZoneSet,
    mix: SizeMix,
    target_count: u32,
    min_spacing: f64,
    ga: GaConfig,
    cancel: &CancellationToken,
) -> PlacementOutcome {
    let start = Instant::now();
    let mut history = Vec::new();

    let Some(envelope) = Envelope::from_open_spaces(&zones.open_spaces) else {
        return PlacementOutcome::Empty {
            elapsed: start.elapsed(),
            generation_history: history,
            stop_reason: StopReason::MaxGenerations,
        };
    };

    let mut rng = ChaCha8Rng::seed_from_u64(ga.rng_seed);
    let specs = generate_specs(mix, target_count, &mut rng);
    if specs.is_empty() {
        return PlacementOutcome::Empty {
            elapsed: start.elapsed(),
            generation_history: history,
            stop_reason: StopReason::MaxGenerations,
        };
    }

    // A zero-sized population has no chromosome to evaluate or index into;
    // treat it the same as "nothing realized" rather than panicking on the
    // first generation's `evaluated[0]` (spec §7: never panics on malformed
    // configuration).
    if ga.population_size == 0 {
        return PlacementOutcome::Empty {
            elapsed: start.elapsed(),
            generation_history: history,
            stop_reason: StopReason::MaxGenerations,
        };
    }

    let forbidden = space::forbidden_zone(zones);

    let mut population: Vec<Chromosome> = (0..ga.population_size as usize)
        .map(|i| {
            if (i as f64) < ga.population_size as f64 * SEED_FRACTION_GREEDY {
                greedy_shelf_chromosome(&specs, &envelope)
            } else {
                random_chromosome(&specs, &envelope, &mut rng)
            }
        })
        .collect();

    let mut best_fitness = f64::MIN;
    let mut best_units: Vec<PlacedUnit> = Vec::new();
    let mut stall = 0u32;
    let mut stop_reason = StopReason::MaxGenerations;

    for generation in 0..ga.max_generations {
        if cancel.is_cancelled() {
            tracing::debug!(generation, "placement cancelled, returning best-so-far");
            stop_reason = StopReason::Cancelled;
            break;
        }
        if start.elapsed() >= ga.deadline {
            tracing::debug!(generation, "placement deadline reached, returning best-so-far");
            stop_reason = StopReason::Deadline;
            break;
        }

        // Evaluating a generation's fitness is embarrassingly parallel
        // (spec §5 "legal future extension"). With the `parallel` feature,
        // `rayon` fans the population out across threads; reduction still
        // happens via the deterministic `sort_by` below, so
        // determinism-under-seed is preserved regardless of evaluation
        // order.
        let mut evaluated: Vec<(f64, Vec<PlacedUnit>, usize)> = {
            cfg_if::cfg_if! {
                if #[cfg(feature = "parallel")] {
                    population.par_iter()
                } else {
                    population.iter()
                }
            }
        }
        .enumerate()
        .map(|(idx, chromosome)| {
            let units = realize(chromosome, &specs, &zones.open_spaces, &forbidden, min_spacing);
            let fitness = fitness_of(&units);
            (fitness, units, idx)
        })
        .collect();
        evaluated.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

        let mean_fitness = evaluated.iter().map(|(f, _, _)| *f).sum::<f64>() / evaluated.len() as f64;
        history.push(GenerationStats {
            generation,
            best_fitness: evaluated[0].0,
            mean_fitness,
            realized_unit_count: evaluated[0].1.len() as u32,
        });

        if evaluated[0].0 > best_fitness {
            best_fitness = evaluated[0].0;
            best_units = evaluated[0].1.clone();
            stall = 0;
        } else {
            stall += 1;
            if stall >= ga.stall_limit {
                tracing::debug!(generation, stall, "stall limit reached, stopping early");
                stop_reason = StopReason::Converged;
                break;
            }
        }

        let elite: Vec<Chromosome> = evaluated
            .iter()
            .take(ga.elite_size as usize)
            .map(|(_, _, idx)| population[*idx].clone())
            .collect();

        let mut next_gen = elite.clone();
        while next_gen.len() < ga.population_size as usize {
            let parent1 = tournament_select(&evaluated, &population, ga.tournament_size, &mut rng);
            let parent2 = tournament_select(&evaluated, &population, ga.tournament_size, &mut rng);

            let mut child = if rng.gen::<f64>() < ga.crossover_rate {
                crossover(parent1, parent2, &mut rng)
            } else {
                parent1.clone()
            };

            if rng.gen::<f64>() < ga.mutation_rate {
                mutate(&mut child, &specs, &envelope, &mut rng);
            }

            next_gen.push(child);
        }
        next_gen.truncate(ga.population_size as usize);
        population = next_gen;
    }

    if best_units.is_empty() {
        return PlacementOutcome::Empty {
            elapsed: start.elapsed(),
            generation_history: history,
            stop_reason,
        };
    }

    let coverage_pct = if space::total_area(&zones.open_spaces) > 0.0 {
        best_units.iter().map(|u| u.area).sum::<f64>() / space::total_area(&zones.open_spaces) * 100.0
    } else {
        0.0
    };

    PlacementOutcome::Placed {
        units: best_units,
        fitness: best_fitness,
        elapsed: start.elapsed(),
        coverage_pct,
        generation_history: history,
        stop_reason,
    }
}

fn random_gene(envelope: &Envelope, w: f64, h: f64, rng: &mut ChaCha8Rng) -> Gene {
    let max_x = (envelope.max_x - w).max(envelope.min_x);
    let max_y = (envelope.max_y - h).max(envelope.min_y);
    let x = if max_x > envelope.min_x {
        rng.gen_range(envelope.min_x..max_x)
    } else {
        envelope.min_x
    };
    let y = if max_y > envelope.min_y {
        rng.gen_range(envelope.min_y..max_y)
    } else {
        envelope.min_y
    };
    let rotation = if rng.gen_bool(0.5) {
        Rotation::Deg0
    } else {
        Rotation::Deg90
    };
    Gene { x, y, rotation }
}

fn random_chromosome(specs: &[UnitSpec], envelope: &Envelope, rng: &mut ChaCha8Rng) -> Chromosome {
    specs
        .iter()
        .map(|spec| random_gene(envelope, spec.width, spec.height, rng))
        .collect()
}

/// Greedy left-to-right, bottom-to-top shelf placement used to seed a
/// fraction of the initial population (SPEC_FULL §4.3 supplement), so a
/// tight floor plan doesn't start from an all-random population that
/// realizes to zero units.
fn greedy_shelf_chromosome(specs: &[UnitSpec], envelope: &Envelope) -> Chromosome {
    let mut cursor_x = envelope.min_x;
    let mut cursor_y = envelope.min_y;
    let mut shelf_height = 0.0_f64;
    let mut genes = Vec::with_capacity(specs.len());

    for spec in specs {
        let (w, h) = (spec.width, spec.height);
        if cursor_x + w > envelope.max_x {
            cursor_x = envelope.min_x;
            cursor_y += shelf_height;
            shelf_height = 0.0;
        }
        genes.push(Gene {
            x: cursor_x,
            y: cursor_y,
            rotation: Rotation::Deg0,
        });
        cursor_x += w;
        shelf_height = shelf_height.max(h);
    }
    genes
}

/// Realizes a chromosome into accepted [`PlacedUnit`]s per the validator
/// (spec §4.3.4). Genes that fail validation are silently dropped.
fn realize(
    chromosome: &Chromosome,
    specs: &[UnitSpec],
    open_spaces: &[Polygon],
    forbidden: &MultiPolygon,
    min_spacing: f64,
) -> Vec<PlacedUnit> {
    let mut accepted: Vec<PlacedUnit> = Vec::new();
    let mut next_id = 0u32;

    for (gene, spec) in chromosome.iter().zip(specs.iter()) {
        let (w, h) = match gene.rotation {
            Rotation::Deg0 => (spec.width, spec.height),
            Rotation::Deg90 => (spec.height, spec.width),
        };
        let rect = rect_polygon(Point::new(gene.x, gene.y), w, h);

        let inside_some_open_space = open_spaces.iter().any(|s| contains(s, &rect));
        if !inside_some_open_space {
            continue;
        }
        if forbidden_intersects(forbidden, &rect) {
            continue;
        }
        if accepted
            .iter()
            .any(|u| distance(&rect, &u.polygon) < min_spacing)
        {
            continue;
        }

        let center = geometry::centroid(&rect).unwrap_or(Point::new(gene.x + w / 2.0, gene.y + h / 2.0));
        accepted.push(PlacedUnit {
            id: next_id,
            polygon: rect,
            area: w * h,
            category: spec.category,
            center,
            width: w,
            height: h,
            rotation: gene.rotation,
        });
        next_id += 1;
    }

    accepted
}

fn forbidden_intersects(forbidden: &MultiPolygon, rect: &Polygon) -> bool {
    if forbidden.0.is_empty() {
        return false;
    }
    forbidden
        .0
        .iter()
        .any(|f| intersects_area(f, rect) > 0.0)
}

/// Composite fitness (spec §4.3.5): unit count dominates, area is a
/// tie-breaker, category diversity and spacing are refinements.
fn fitness_of(units: &[PlacedUnit]) -> f64 {
    let n = units.len();
    if n == 0 {
        return 0.0;
    }
    let total_area: f64 = units.iter().map(|u| u.area).sum();
    let distinct_categories = {
        let mut seen = [false; 4];
        for u in units {
            seen[band_index(u.category)] = true;
        }
        seen.iter().filter(|s| **s).count()
    };
    let category_diversity = distinct_categories as f64 / 4.0;

    let spacing_score = if n <= 1 {
        1.0
    } else {
        let mean_min_dist: f64 = units
            .iter()
            .map(|u| {
                units
                    .iter()
                    .filter(|other| !std::ptr::eq(*other, u))
                    .map(|other| center_distance(u.center, other.center))
                    .fold(f64::MAX, f64::min)
            })
            .sum::<f64>()
            / n as f64;
        if (0.5..=2.0).contains(&mean_min_dist) {
            1.0
        } else {
            0.5
        }
    };

    10.0 * n as f64 + 0.1 * total_area + 5.0 * category_diversity + 2.0 * spacing_score
}

fn band_index(band: SizeBand) -> usize {
    match band {
        SizeBand::B0_1 => 0,
        SizeBand::B1_3 => 1,
        SizeBand::B3_5 => 2,
        SizeBand::B5_10 => 3,
    }
}

fn center_distance(a: Point, b: Point) -> f64 {
    ((a.x - b.x).powi(2) + (a.y - b.y).powi(2)).sqrt()
}

fn tournament_select<'a>(
    evaluated: &[(f64, Vec<PlacedUnit>, usize)],
    population: &'a [Chromosome],
    tournament_size: u32,
    rng: &mut ChaCha8Rng,
) -> &'a Chromosome {
    let mut best: Option<(f64, usize)> = None;
    let candidates: Vec<usize> = (0..evaluated.len()).collect();
    for &i in candidates
        .choose_multiple(rng, (tournament_size as usize).min(evaluated.len()))
    {
        let (fitness, _, pop_idx) = &evaluated[i];
        if best.map_or(true, |(f, _)| *fitness > f) {
            best = Some((*fitness, *pop_idx));
        }
    }
    let (_, pop_idx) = best.expect("tournament draws at least one candidate");
    &population[pop_idx]
}

/// Single-point crossover: `child = parent1[:k] ++ parent2[k:]` (spec
/// §4.3.3).
fn crossover(parent1: &Chromosome, parent2: &Chromosome, rng: &mut ChaCha8Rng) -> Chromosome {
    let len = parent1.len();
    if len < 2 {
        return parent1.clone();
    }
    let k = rng.gen_range(1..len);
    let mut child = Vec::with_capacity(len);
    child.extend_from_slice(&parent1[..k]);
    child.extend_from_slice(&parent2[k..]);
    child
}

/// Resamples `U(0.1, 0.2) * len` genes to a fresh random placement (spec
/// §4.3.3 Mutation).
fn mutate(chromosome: &mut Chromosome, specs: &[UnitSpec], envelope: &Envelope, rng: &mut ChaCha8Rng) {
    let len = chromosome.len();
    if len == 0 {
        return;
    }
    let fraction = rng.gen_range(0.1..0.2);
    let num_mutations = ((len as f64 * fraction) as usize).max(1);

    let mut indices: Vec<usize> = (0..len).collect();
    indices.shuffle(rng);
    for &idx in indices.iter().take(num_mutations) {
        let spec = &specs[idx];
        chromosome[idx] = random_gene(envelope, spec.width, spec.height, rng);
    }
}
