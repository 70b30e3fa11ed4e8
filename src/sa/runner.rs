//! Annealing loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::debug;
use rand::Rng;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::config::{AnnealConfig, CoolingSchedule};
use crate::field::{Field, Workspace};
use crate::random::rng_from_seed;

/// How often the cancellation flag is polled, in iterations.
const CANCEL_POLL_INTERVAL: usize = 256;

/// Result of annealing one field.
///
/// The annealed layout itself is left in the field passed to the runner.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AnnealResult {
    /// Score of the field after the final restore.
    pub final_score: u64,

    /// Highest accepted score seen during the run.
    pub best_score: u64,

    /// Number of flips tried.
    pub iterations: usize,

    pub final_temperature: f64,

    /// Accepted flips, improvements included.
    pub accepted_moves: usize,

    /// Flips that strictly raised the score.
    pub improving_moves: usize,

    /// Whether cancelled externally.
    pub cancelled: bool,

    /// Best score sampled at regular intervals. Non-decreasing.
    pub score_history: Vec<u64>,
}

/// Anneals a field in place.
///
/// Each iteration flips one random non-anchor interior cell and re-scores.
/// A higher score is always accepted; otherwise the flip is kept only if
/// the new score is positive and a uniform draw falls below
/// `exp((new - current) / T)` (Metropolis). Rejected flips are undone.
/// After the loop the field is restored once under the workspace's repair
/// strategy, so its cached score is consistent.
pub struct AnnealRunner;

impl AnnealRunner {
    /// Anneals with a generator built from `config.seed`.
    pub fn run(field: &mut Field, workspace: &mut Workspace, config: &AnnealConfig) -> AnnealResult {
        Self::run_with_cancel(field, workspace, config, None)
    }

    /// Anneals with an optional cancellation token.
    pub fn run_with_cancel(
        field: &mut Field,
        workspace: &mut Workspace,
        config: &AnnealConfig,
        cancel: Option<Arc<AtomicBool>>,
    ) -> AnnealResult {
        let mut rng = rng_from_seed(config.seed);
        Self::run_with_rng(field, workspace, config, &mut rng, cancel.as_deref())
    }

    /// Anneals drawing from a caller-owned generator.
    ///
    /// # Panics
    /// Panics if the configuration is invalid.
    pub fn run_with_rng<R: Rng>(
        field: &mut Field,
        workspace: &mut Workspace,
        config: &AnnealConfig,
        rng: &mut R,
        cancel: Option<&AtomicBool>,
    ) -> AnnealResult {
        config.validate().expect("invalid AnnealConfig");

        let budget = config.iteration_budget(workspace.dims());
        let history_interval = 100.max(workspace.dims().cell_count());

        let mut current = workspace.evaluate(field);
        let mut best = current;
        let mut temperature = config.initial_temperature;
        let mut iterations = 0usize;
        let mut accepted_moves = 0usize;
        let mut improving_moves = 0usize;
        let mut cancelled = false;
        let mut score_history = vec![best];

        for step in 0..budget {
            if step % CANCEL_POLL_INTERVAL == 0
                && cancel.is_some_and(|flag| flag.load(Ordering::Relaxed))
            {
                cancelled = true;
                break;
            }

            temperature = cool(temperature, config, step, budget);

            let cell = workspace.random_mutable_cell(rng);
            field.flip(cell);
            let candidate = workspace.evaluate(field);

            // Metropolis acceptance criterion
            let accept = if candidate > current {
                improving_moves += 1;
                true
            } else if candidate > 0 {
                let delta = candidate as f64 - current as f64;
                rng.random::<f64>() < (delta / temperature).exp()
            } else {
                false
            };

            if accept {
                current = candidate;
                accepted_moves += 1;
                best = best.max(current);
            } else {
                field.flip(cell);
            }

            iterations += 1;
            if iterations % history_interval == 0 {
                score_history.push(best);
            }
        }

        let final_score = workspace.restore(field, rng);
        best = best.max(final_score);
        if score_history.last() != Some(&best) {
            score_history.push(best);
        }

        debug!(
            "annealed {iterations} iterations: final {final_score}, best {best}, accepted {accepted_moves}"
        );

        AnnealResult {
            final_score,
            best_score: best,
            iterations,
            final_temperature: temperature,
            accepted_moves,
            improving_moves,
            cancelled,
            score_history,
        }
    }
}

/// Apply the cooling schedule for iteration `step` of `budget`.
fn cool(temperature: f64, config: &AnnealConfig, step: usize, budget: usize) -> f64 {
    match config.cooling {
        CoolingSchedule::Geometric { alpha } => temperature * alpha,

        CoolingSchedule::Linear => {
            let t = config.initial_temperature
                - (step + 1) as f64 * (config.initial_temperature - config.min_temperature)
                    / budget as f64;
            t.max(config.min_temperature)
        }

        CoolingSchedule::LundyMees { beta } => temperature / (1.0 + beta * temperature),
    }
}
