//! Genetic search configuration.
//!
//! [`GeneticConfig`] holds the parameters of the crossover/selection loop;
//! [`SeedPlan`] describes how the initial population is assembled.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::sa::AnnealConfig;

/// Composition of the initial population.
///
/// Besides copies of the caller's start fields, the population is seeded
/// with annealed starts, random fields at densities cycling through
/// 10%, 20%, ..., 50%, and empty fields. The first `random_annealed`
/// random fields and the first `empty_annealed` empty fields are annealed
/// before insertion.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SeedPlan {
    /// Also insert an annealed copy of every start field.
    pub anneal_starts: bool,

    pub random_count: usize,
    pub random_annealed: usize,

    pub empty_count: usize,
    pub empty_annealed: usize,

    /// Window area for [`exhaustive_window_search`](super::operators::exhaustive_window_search)
    /// around every start field. 0 disables it.
    pub window_search_area: usize,

    /// Number of window-search results kept per start.
    pub window_search_keep: usize,

    /// Block budget for [`exhaustive_crossover`](super::operators::exhaustive_crossover)
    /// between every pair of start fields. 0 disables it.
    pub crossover_search_blocks: usize,

    /// Number of crossover-search results kept per pair.
    pub crossover_search_keep: usize,
}

impl Default for SeedPlan {
    fn default() -> Self {
        Self {
            anneal_starts: true,
            random_count: 10,
            random_annealed: 5,
            empty_count: 7,
            empty_annealed: 5,
            window_search_area: 0,
            window_search_keep: 5,
            crossover_search_blocks: 0,
            crossover_search_keep: 5,
        }
    }
}

impl SeedPlan {
    /// Wall density of the `i`-th random seed field.
    pub fn density(i: usize) -> f64 {
        ((i % 5) + 1) as f64 / 10.0
    }

    pub fn with_anneal_starts(mut self, anneal: bool) -> Self {
        self.anneal_starts = anneal;
        self
    }

    pub fn with_random(mut self, count: usize, annealed: usize) -> Self {
        self.random_count = count;
        self.random_annealed = annealed;
        self
    }

    pub fn with_empty(mut self, count: usize, annealed: usize) -> Self {
        self.empty_count = count;
        self.empty_annealed = annealed;
        self
    }

    pub fn with_window_search(mut self, area: usize, keep: usize) -> Self {
        self.window_search_area = area;
        self.window_search_keep = keep;
        self
    }

    pub fn with_crossover_search(mut self, blocks: usize, keep: usize) -> Self {
        self.crossover_search_blocks = blocks;
        self.crossover_search_keep = keep;
        self
    }
}

/// Configuration for the genetic search.
///
/// # Defaults
///
/// ```
/// use u_bugfield::ga::GeneticConfig;
///
/// let config = GeneticConfig::default();
/// assert_eq!(config.block_size, 5);
/// assert_eq!(config.children_per_parent, 5);
/// assert_eq!(config.stagnation_limit, 10);
/// ```
///
/// # Builder Pattern
///
/// ```
/// use u_bugfield::ga::{GeneticConfig, SeedPlan};
/// use u_bugfield::sa::AnnealConfig;
///
/// let config = GeneticConfig::default()
///     .with_block_size(3)
///     .with_seed_plan(SeedPlan::default().with_random(4, 2))
///     .with_anneal(AnnealConfig::fast())
///     .with_seed(42);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GeneticConfig {
    /// Side of the square blocks exchanged by crossover.
    pub block_size: usize,

    /// Best children kept per left parent each round.
    pub children_per_parent: usize,

    /// Population capacity above the seeded population size.
    pub extra_capacity: usize,

    /// Rounds without a new best before stopping. 0 disables.
    pub stagnation_limit: usize,

    /// Hard round budget. 0 = unbounded.
    pub max_rounds: usize,

    /// Rounds without a new best after which the convergence test applies.
    /// 0 disables it.
    pub filter_stop_rounds: usize,

    /// Share of the population, counted from the worst, left out of the
    /// convergence test (percent, rounded up to whole members).
    pub filter_stop_percentage: usize,

    /// The run has converged when the best score exceeds the score just
    /// above the left-out tail by at most this much.
    pub filter_stop_delta: u64,

    /// Probability of scrambling a random block of each child before its
    /// single-cell mutation.
    pub scramble_rate: f64,

    pub seed_plan: SeedPlan,

    /// Annealing schedule used while seeding.
    pub anneal: AnnealConfig,

    /// Breed children of different left parents in parallel (requires the
    /// `parallel` feature; ignored otherwise).
    pub parallel: bool,

    /// Random seed for reproducibility. `None` uses a random seed.
    pub seed: Option<u64>,
}

impl Default for GeneticConfig {
    fn default() -> Self {
        Self {
            block_size: 5,
            children_per_parent: 5,
            extra_capacity: 20,
            stagnation_limit: 10,
            max_rounds: 0,
            filter_stop_rounds: 0,
            filter_stop_percentage: 10,
            filter_stop_delta: 200,
            scramble_rate: 0.0,
            seed_plan: SeedPlan::default(),
            anneal: AnnealConfig::default(),
            parallel: false,
            seed: None,
        }
    }
}

impl GeneticConfig {
    /// Preset for quick runs: a small seed population, short annealing and
    /// an early stagnation stop.
    pub fn fast() -> Self {
        Self {
            extra_capacity: 10,
            stagnation_limit: 5,
            seed_plan: SeedPlan::default().with_random(4, 2).with_empty(2, 1),
            anneal: AnnealConfig::fast(),
            ..Self::default()
        }
    }

    pub fn with_block_size(mut self, n: usize) -> Self {
        self.block_size = n;
        self
    }

    pub fn with_children_per_parent(mut self, k: usize) -> Self {
        self.children_per_parent = k;
        self
    }

    pub fn with_extra_capacity(mut self, n: usize) -> Self {
        self.extra_capacity = n;
        self
    }

    pub fn with_stagnation_limit(mut self, limit: usize) -> Self {
        self.stagnation_limit = limit;
        self
    }

    pub fn with_max_rounds(mut self, n: usize) -> Self {
        self.max_rounds = n;
        self
    }

    /// Enables the convergence stop. See [`Population::spread`](super::Population::spread).
    pub fn with_filter_stop(mut self, rounds: usize, percentage: usize, delta: u64) -> Self {
        self.filter_stop_rounds = rounds;
        self.filter_stop_percentage = percentage;
        self.filter_stop_delta = delta;
        self
    }

    pub fn with_scramble_rate(mut self, rate: f64) -> Self {
        self.scramble_rate = rate.clamp(0.0, 1.0);
        self
    }

    pub fn with_seed_plan(mut self, plan: SeedPlan) -> Self {
        self.seed_plan = plan;
        self
    }

    pub fn with_anneal(mut self, anneal: AnnealConfig) -> Self {
        self.anneal = anneal;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Validates the configuration.
    ///
    /// Returns `Err` with a description if any parameter is invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.block_size == 0 {
            return Err("block_size must be at least 1".into());
        }
        if self.children_per_parent == 0 {
            return Err("children_per_parent must be at least 1".into());
        }
        if self.stagnation_limit == 0 && self.max_rounds == 0 {
            return Err("stagnation_limit and max_rounds cannot both be 0".into());
        }
        if !(0.0..=1.0).contains(&self.scramble_rate) {
            return Err(format!(
                "scramble_rate must be in [0, 1], got {}",
                self.scramble_rate
            ));
        }
        if self.filter_stop_rounds > 0 && !(1..=99).contains(&self.filter_stop_percentage) {
            return Err(format!(
                "filter_stop_percentage must be in 1..=99, got {}",
                self.filter_stop_percentage
            ));
        }
        let plan = &self.seed_plan;
        if plan.random_annealed > plan.random_count {
            return Err("random_annealed exceeds random_count".into());
        }
        if plan.empty_annealed > plan.empty_count {
            return Err("empty_annealed exceeds empty_count".into());
        }
        if plan.window_search_area > 20 {
            return Err(format!(
                "window_search_area must be at most 20, got {}",
                plan.window_search_area
            ));
        }
        if plan.window_search_area > 0 && plan.window_search_keep == 0 {
            return Err("window_search_keep must be at least 1".into());
        }
        if plan.crossover_search_blocks > 20 {
            return Err(format!(
                "crossover_search_blocks must be at most 20, got {}",
                plan.crossover_search_blocks
            ));
        }
        if plan.crossover_search_blocks > 0 && plan.crossover_search_keep == 0 {
            return Err("crossover_search_keep must be at least 1".into());
        }
        self.anneal.validate()
    }
}
