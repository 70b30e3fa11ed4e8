//! Genetic search loop.
//!
//! [`GeneticRunner`] orchestrates the complete process:
//! seeding → (crossover → mutation → merge → truncation) per round →
//! stop after `stagnation_limit` rounds without a new best, or earlier once
//! the population has converged (see [`GeneticConfig::filter_stop_rounds`]).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{debug, info};
use rand::Rng;
#[cfg(feature = "parallel")]
use rayon::prelude::*;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::config::{GeneticConfig, SeedPlan};
use super::operators::{
    block_crossover, exhaustive_crossover, exhaustive_window_search, scramble_block,
};
use super::population::Population;
use crate::field::{Field, Workspace};
#[cfg(feature = "parallel")]
use crate::random::create_rng;
use crate::random::rng_from_seed;
use crate::sa::AnnealRunner;

/// Statistics of one crossover/selection round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RoundStats {
    /// 1-based round number.
    pub round: usize,

    /// Best score in the population after truncation.
    pub best_score: u64,

    /// Worst score in the population after truncation.
    pub worst_score: u64,

    pub population_size: usize,

    /// Candidate children produced this round (best `K` per left parent).
    pub candidates: usize,

    /// Candidates accepted into the population before truncation.
    pub inserted: usize,
}

/// Result of a genetic search run.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GeneticResult {
    /// The best field found during the entire run.
    pub best: Field,

    /// Same as `best.score()`.
    pub best_score: u64,

    /// Rounds executed.
    pub rounds: usize,

    /// Whether the run stopped on the stagnation limit.
    pub stagnated: bool,

    /// Whether the run stopped on the convergence test.
    pub converged: bool,

    /// Whether the run was cancelled externally.
    pub cancelled: bool,

    /// Best score before the first round and after each round.
    pub score_history: Vec<u64>,

    pub round_stats: Vec<RoundStats>,

    /// Final population, for callers that want more than the winner.
    pub population: Population,
}

/// Executes the genetic search.
///
/// # Usage
///
/// ```
/// use u_bugfield::field::{Dimensions, RepairStrategy, Workspace};
/// use u_bugfield::ga::{GeneticConfig, GeneticRunner};
///
/// let dims = Dimensions::new(7, 9).unwrap();
/// let mut ws = Workspace::new(dims, RepairStrategy::Carve);
/// let config = GeneticConfig::fast().with_stagnation_limit(2).with_seed(42);
///
/// let result = GeneticRunner::run(&mut ws, &[], &config);
/// assert!(result.best_score >= ws.empty_field().score());
/// ```
pub struct GeneticRunner;

impl GeneticRunner {
    /// Runs the search with a generator built from `config.seed`.
    ///
    /// # Panics
    /// Panics if the configuration is invalid or a start field has a
    /// different extent than the workspace.
    pub fn run(workspace: &mut Workspace, starts: &[Field], config: &GeneticConfig) -> GeneticResult {
        Self::run_with_cancel(workspace, starts, config, None)
    }

    /// Runs the search with an optional cancellation token, checked between
    /// rounds and between seeding steps.
    pub fn run_with_cancel(
        workspace: &mut Workspace,
        starts: &[Field],
        config: &GeneticConfig,
        cancel: Option<Arc<AtomicBool>>,
    ) -> GeneticResult {
        let mut rng = rng_from_seed(config.seed);
        Self::run_with_rng(workspace, starts, config, &mut rng, cancel.as_deref())
    }

    /// Runs the search drawing from a caller-owned generator.
    pub fn run_with_rng<R: Rng>(
        workspace: &mut Workspace,
        starts: &[Field],
        config: &GeneticConfig,
        rng: &mut R,
        cancel: Option<&AtomicBool>,
    ) -> GeneticResult {
        config.validate().expect("invalid GeneticConfig");
        for start in starts {
            assert_eq!(
                start.dims(),
                workspace.dims(),
                "start field extent does not match the workspace"
            );
        }

        // Stored scores are never trusted.
        let mut best = starts
            .iter()
            .cloned()
            .map(|mut field| {
                workspace.evaluate(&mut field);
                field
            })
            .max_by_key(Field::score)
            .unwrap_or_else(|| workspace.empty_field());

        info!(
            "genetic search: {} starts, {:?} repair, initial best {}",
            starts.len(),
            workspace.strategy(),
            best.score()
        );

        let mut population = Self::seed_population(workspace, starts, config, rng, cancel);
        let capacity = population.len() + config.extra_capacity;

        let mut score_history = vec![best.score()];
        let mut round_stats = Vec::new();
        let mut stagnation_counter = 0usize;
        let mut stagnated = false;
        let mut converged = false;
        let mut cancelled = false;

        loop {
            if config.max_rounds > 0 && round_stats.len() >= config.max_rounds {
                break;
            }
            if cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
                cancelled = true;
                break;
            }

            let mut stats = Self::round(workspace, &mut population, capacity, config, rng);
            stats.round = round_stats.len() + 1;

            match population.best() {
                Some(top) if top.is_better_than(&best) => {
                    best = top.clone();
                    stagnation_counter = 0;
                    info!("round {}: new best {}", stats.round, best.score());
                }
                _ => stagnation_counter += 1,
            }

            debug!(
                "round {}: population {} ({}..={}), {} of {} candidates inserted",
                stats.round,
                stats.population_size,
                stats.worst_score,
                stats.best_score,
                stats.inserted,
                stats.candidates
            );

            round_stats.push(stats);
            score_history.push(best.score());

            if config.stagnation_limit > 0 && stagnation_counter >= config.stagnation_limit {
                stagnated = true;
                break;
            }

            if config.filter_stop_rounds > 0 && stagnation_counter >= config.filter_stop_rounds {
                let spread = population.spread(config.filter_stop_percentage);
                if spread <= config.filter_stop_delta {
                    info!("round {}: converged (spread {spread})", round_stats.len());
                    converged = true;
                    break;
                }
            }
        }

        info!(
            "genetic search finished after {} rounds: best {}",
            round_stats.len(),
            best.score()
        );

        GeneticResult {
            best_score: best.score(),
            best,
            rounds: round_stats.len(),
            stagnated,
            converged,
            cancelled,
            score_history,
            round_stats,
            population,
        }
    }

    /// Builds the initial population described by `config.seed_plan`.
    ///
    /// Start fields are re-evaluated. If the plan yields nothing, the
    /// population holds one empty field.
    pub fn seed_population<R: Rng>(
        workspace: &mut Workspace,
        starts: &[Field],
        config: &GeneticConfig,
        rng: &mut R,
        cancel: Option<&AtomicBool>,
    ) -> Population {
        let plan = &config.seed_plan;
        let mut fields = Vec::new();

        for start in starts {
            let mut field = start.clone();
            workspace.evaluate(&mut field);
            fields.push(field);
        }

        if plan.anneal_starts {
            for (i, start) in starts.iter().enumerate() {
                let mut field = start.clone();
                let result =
                    AnnealRunner::run_with_rng(&mut field, workspace, &config.anneal, rng, cancel);
                debug!("annealed start {i}: best {}, final {}", result.best_score, result.final_score);
                fields.push(field);
            }
        }

        if plan.window_search_area > 0 {
            for start in starts {
                let found = exhaustive_window_search(
                    start,
                    workspace,
                    plan.window_search_area,
                    plan.window_search_keep,
                    cancel,
                );
                fields.extend(found.into_vec());
            }
        }

        if plan.crossover_search_blocks > 0 {
            for (i, first) in starts.iter().enumerate() {
                for second in &starts[i + 1..] {
                    let found = exhaustive_crossover(
                        first,
                        second,
                        workspace,
                        plan.crossover_search_blocks,
                        plan.crossover_search_keep,
                        cancel,
                    );
                    fields.extend(found.into_vec());
                }
            }
        }

        for i in 0..plan.random_count {
            let mut field = workspace.random_field(SeedPlan::density(i), rng);
            if i < plan.random_annealed {
                AnnealRunner::run_with_rng(&mut field, workspace, &config.anneal, rng, cancel);
            }
            fields.push(field);
        }

        for i in 0..plan.empty_count {
            let mut field = workspace.empty_field();
            if i < plan.empty_annealed {
                AnnealRunner::run_with_rng(&mut field, workspace, &config.anneal, rng, cancel);
            }
            fields.push(field);
        }

        let mut population: Population = fields.into_iter().collect();
        if population.is_empty() {
            population.insert(workspace.empty_field());
        }

        debug!("seeded population of {} fields", population.len());
        population
    }

    /// Runs one crossover/selection round.
    ///
    /// Every member, as the left parent, is crossed with every member
    /// (itself included) and each child is mutated once; the best
    /// `children_per_parent` children of each left parent become
    /// candidates. All candidates are merged into the population, which is
    /// then truncated to `capacity`. The returned stats carry round 0; the
    /// caller numbers rounds.
    pub fn round<R: Rng>(
        workspace: &mut Workspace,
        population: &mut Population,
        capacity: usize,
        config: &GeneticConfig,
        rng: &mut R,
    ) -> RoundStats {
        let members: Vec<Field> = population.iter().cloned().collect();
        let candidates = breed_all(workspace, &members, config, rng);

        let candidate_count = candidates.len();
        let inserted = population.extend(candidates);
        population.truncate(capacity);

        RoundStats {
            round: 0,
            best_score: population.best().map_or(0, Field::score),
            worst_score: population.worst().map_or(0, Field::score),
            population_size: population.len(),
            candidates: candidate_count,
            inserted,
        }
    }
}

/// Children of every left parent, concatenated.
fn breed_all<R: Rng>(
    workspace: &mut Workspace,
    members: &[Field],
    config: &GeneticConfig,
    rng: &mut R,
) -> Vec<Field> {
    #[cfg(feature = "parallel")]
    {
        if config.parallel {
            let seeds: Vec<u64> = members.iter().map(|_| rng.random()).collect();
            let (dims, strategy) = (workspace.dims(), workspace.strategy());
            return members
                .par_iter()
                .zip(seeds)
                .flat_map_iter(|(left, seed)| {
                    let mut local = Workspace::new(dims, strategy);
                    let mut local_rng = create_rng(seed);
                    breed_left(&mut local, left, members, config, &mut local_rng)
                })
                .collect();
        }
    }

    let mut children = Vec::with_capacity(members.len() * config.children_per_parent);
    for left in members {
        children.extend(breed_left(workspace, left, members, config, rng));
    }
    children
}

/// Crosses `left` with every member and keeps its best children.
fn breed_left<R: Rng>(
    workspace: &mut Workspace,
    left: &Field,
    members: &[Field],
    config: &GeneticConfig,
    rng: &mut R,
) -> Vec<Field> {
    let mut children = Population::new();
    for right in members {
        let mut child = block_crossover(left, right, config.block_size, workspace, rng);
        if config.scramble_rate > 0.0 && rng.random_bool(config.scramble_rate) {
            scramble_block(&mut child, workspace, rng);
        }
        workspace.mutate(&mut child, rng);
        children.insert(child);
    }
    children.into_best(config.children_per_parent)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{Dimensions, RepairStrategy};
    use crate::random::create_rng;
    use crate::sa::AnnealConfig;

    fn small() -> Dimensions {
        Dimensions::new(7, 9).unwrap()
    }

    fn quick_config() -> GeneticConfig {
        GeneticConfig::fast()
            .with_block_size(2)
            .with_stagnation_limit(3)
            .with_seed(42)
    }

    #[test]
    fn test_round_on_two_identical_empty_fields() {
        for strategy in [RepairStrategy::Carve, RepairStrategy::Retry] {
            let mut ws = Workspace::new(small(), strategy);
            let mut rng = create_rng(42);
            let parent = ws.empty_field();
            let mut population: Population = vec![parent.clone(), parent.clone()].into_iter().collect();
            assert_eq!(population.len(), 1, "identical parents collapse");

            let stats = GeneticRunner::round(
                &mut ws,
                &mut population,
                21,
                &GeneticConfig::default(),
                &mut rng,
            );

            assert!(stats.best_score >= parent.score(), "{strategy:?}");
            assert!(population.best().is_some_and(|f| f.score() >= parent.score()));
            assert!(stats.candidates >= 1);
            assert!(population.len() <= 21);
        }
    }

    #[test]
    fn test_run_stagnates_and_improves() {
        let mut ws = Workspace::new(small(), RepairStrategy::Carve);
        let empty_score = ws.empty_field().score();
        let config = quick_config();
        let limit = config.stagnation_limit;

        let result = GeneticRunner::run(&mut ws, &[], &config);

        assert!(result.stagnated);
        assert!(!result.converged);
        assert!(!result.cancelled);
        assert!(result.rounds >= limit);
        assert_eq!(result.rounds, result.round_stats.len());
        assert_eq!(result.score_history.len(), result.rounds + 1);
        assert!(result.best_score > empty_score);
        assert_eq!(result.best.score(), result.best_score);
        assert!(ws.is_connected(&result.best));

        let mut copy = result.best.clone();
        assert_eq!(ws.evaluate(&mut copy), result.best_score);
    }

    #[test]
    fn test_stops_exactly_after_stagnation_limit() {
        for limit in [1, 2, 4] {
            let mut ws = Workspace::new(small(), RepairStrategy::Carve);
            let config = quick_config().with_stagnation_limit(limit);

            let result = GeneticRunner::run(&mut ws, &[], &config);
            let history = &result.score_history;

            assert!(result.stagnated);
            assert!(history.len() > limit);

            // The last `limit` rounds brought nothing new...
            let tail = &history[history.len() - limit - 1..];
            assert!(tail.iter().all(|&s| s == tail[0]), "limit {limit}: {history:?}");

            // ...and the round before them did, unless no round ever did.
            if history.len() > limit + 1 {
                assert!(
                    history[history.len() - limit - 2] < tail[0],
                    "limit {limit}: {history:?}"
                );
            } else {
                assert_eq!(result.rounds, limit);
            }
        }
    }

    #[test]
    fn test_converged_run_stops_on_filter() {
        let mut ws = Workspace::new(small(), RepairStrategy::Carve);
        let config = quick_config()
            .with_stagnation_limit(0)
            .with_max_rounds(40)
            .with_filter_stop(2, 10, u64::MAX);

        let result = GeneticRunner::run(&mut ws, &[], &config);

        assert!(result.converged);
        assert!(!result.stagnated);
        assert!(result.rounds < 40);
        let history = &result.score_history;
        let tail = &history[history.len() - 3..];
        assert!(tail.iter().all(|&s| s == tail[0]), "{history:?}");
    }

    #[test]
    fn test_spread_above_delta_does_not_stop() {
        let mut ws = Workspace::new(small(), RepairStrategy::Carve);
        let config = quick_config()
            .with_stagnation_limit(0)
            .with_max_rounds(4)
            .with_filter_stop(1, 10, 0);

        let result = GeneticRunner::run(&mut ws, &[], &config);

        // Distinct scores, so the best and the member above the tail differ.
        assert!(result.population.len() > 2);
        assert!(!result.converged);
        assert_eq!(result.rounds, 4);
    }

    #[test]
    fn test_best_history_non_decreasing() {
        let mut ws = Workspace::new(small(), RepairStrategy::Retry);
        let result = GeneticRunner::run(&mut ws, &[], &quick_config());

        for window in result.score_history.windows(2) {
            assert!(window[1] >= window[0], "{} < {}", window[1], window[0]);
        }
        for stats in &result.round_stats {
            assert!(stats.best_score <= result.best_score);
        }
    }

    #[test]
    fn test_population_respects_capacity() {
        let mut ws = Workspace::new(small(), RepairStrategy::Carve);
        let config = quick_config();
        let result = GeneticRunner::run(&mut ws, &[], &config);

        let plan = &config.seed_plan;
        let seeded_max = plan.random_count + plan.empty_count;
        for stats in &result.round_stats {
            assert!(stats.population_size <= seeded_max + config.extra_capacity);
        }
    }

    #[test]
    fn test_starts_are_rescored() {
        let mut ws = Workspace::new(small(), RepairStrategy::Carve);
        let mut rng = create_rng(9);
        let start = ws.random_field(0.3, &mut rng);
        let true_score = start.score();

        // Same layout, stale cached score.
        let stale = Field::from_walls(small(), start.walls().to_vec()).unwrap();
        assert_eq!(stale.score(), 0);

        let config = quick_config().with_max_rounds(1);
        let result = GeneticRunner::run(&mut ws, &[stale], &config);

        assert_eq!(result.score_history[0], true_score);
        assert!(result.best_score >= true_score);
    }

    #[test]
    fn test_max_rounds() {
        let mut ws = Workspace::new(small(), RepairStrategy::Carve);
        let config = quick_config().with_stagnation_limit(0).with_max_rounds(2);

        let result = GeneticRunner::run(&mut ws, &[], &config);

        assert_eq!(result.rounds, 2);
        assert!(!result.stagnated);
    }

    #[test]
    fn test_cancellation() {
        let mut ws = Workspace::new(small(), RepairStrategy::Carve);
        let cancel = Arc::new(AtomicBool::new(true));

        let result = GeneticRunner::run_with_cancel(&mut ws, &[], &quick_config(), Some(cancel));

        assert!(result.cancelled);
        assert_eq!(result.rounds, 0);
        assert_eq!(result.score_history.len(), 1);
    }

    #[test]
    fn test_seed_population_composition() {
        let mut ws = Workspace::new(small(), RepairStrategy::Carve);
        let mut rng = create_rng(4);
        let config = GeneticConfig::default()
            .with_seed_plan(SeedPlan::default().with_random(0, 0).with_empty(3, 0))
            .with_anneal(AnnealConfig::fast());

        // Three unannealed empty fields share one score.
        let population = GeneticRunner::seed_population(&mut ws, &[], &config, &mut rng, None);
        assert_eq!(population.len(), 1);

        let config = config.with_seed_plan(SeedPlan::default().with_random(0, 0).with_empty(0, 0));
        let population = GeneticRunner::seed_population(&mut ws, &[], &config, &mut rng, None);
        assert_eq!(population.len(), 1, "never empty");
    }

    #[test]
    fn test_seed_population_with_window_search() {
        let mut ws = Workspace::new(small(), RepairStrategy::Carve);
        let mut rng = create_rng(4);
        let start = ws.empty_field();
        let config = GeneticConfig::default()
            .with_seed_plan(
                SeedPlan::default()
                    .with_anneal_starts(false)
                    .with_random(0, 0)
                    .with_empty(0, 0)
                    .with_window_search(3, 4),
            )
            .with_anneal(AnnealConfig::fast());

        let population = GeneticRunner::seed_population(&mut ws, &[start.clone()], &config, &mut rng, None);

        assert!(population.len() > 1);
        assert!(population.best().is_some_and(|f| f.score() > start.score()));
    }

    #[test]
    fn test_seed_population_with_crossover_search() {
        let mut ws = Workspace::new(small(), RepairStrategy::Carve);
        let mut rng = create_rng(8);
        let starts = vec![ws.empty_field(), ws.random_field(0.4, &mut rng)];
        let config = GeneticConfig::default()
            .with_seed_plan(
                SeedPlan::default()
                    .with_anneal_starts(false)
                    .with_random(0, 0)
                    .with_empty(0, 0)
                    .with_crossover_search(4, 6),
            )
            .with_anneal(AnnealConfig::fast());

        let population = GeneticRunner::seed_population(&mut ws, &starts, &config, &mut rng, None);
        let best_start = starts.iter().map(Field::score).max().unwrap();

        assert!(!population.is_empty());
        assert!(population.best().is_some_and(|f| f.score() >= best_start));
        assert!(population.iter().all(|f| f.score() > 0));
    }

    #[test]
    fn test_scramble_rate_run() {
        let mut ws = Workspace::new(small(), RepairStrategy::Carve);
        let config = quick_config().with_scramble_rate(1.0).with_max_rounds(2);

        let result = GeneticRunner::run(&mut ws, &[], &config);

        assert!(result.rounds <= 2);
        assert!(ws.is_connected(&result.best));
    }

    #[test]
    #[should_panic(expected = "extent")]
    fn test_mismatched_start_panics() {
        let mut ws = Workspace::new(small(), RepairStrategy::Carve);
        let start = Field::empty(Dimensions::default());
        GeneticRunner::run(&mut ws, &[start], &quick_config());
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn test_parallel_is_deterministic() {
        let config = quick_config().with_parallel(true).with_max_rounds(3);

        let mut ws = Workspace::new(small(), RepairStrategy::Carve);
        let a = GeneticRunner::run(&mut ws, &[], &config);
        let b = GeneticRunner::run(&mut ws, &[], &config);

        assert_eq!(a.score_history, b.score_history);
        assert!(a.best.same_layout(&b.best));
    }
}
