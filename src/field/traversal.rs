//! Greedy least-visited traversal: the fitness function.
//!
//! The bug starts at `(1, 1)` facing east and walks until it reaches the
//! goal. At every cell it bumps the cell's visit counter, then moves to an
//! open neighbor with the minimum visit count, keeping its heading when the
//! cell ahead qualifies and otherwise taking the first qualifying neighbor
//! in east, south, west, north order. The score is the number of steps.
//!
//! The walk is deterministic, so two evaluations of identical layouts
//! always agree. Every edit anywhere can change the route, so a field must
//! be fully re-evaluated after each mutation.

use super::connectivity::ConnectivityChecker;
use super::grid::{Dimensions, Direction, Field};

/// Computes traversal lengths, reusing its visit buffer across calls.
#[derive(Debug, Clone)]
pub struct TraversalEvaluator {
    dims: Dimensions,
    checker: ConnectivityChecker,
    visits: Vec<u64>,
}

impl TraversalEvaluator {
    pub fn new(dims: Dimensions) -> Self {
        Self {
            dims,
            checker: ConnectivityChecker::new(dims),
            visits: vec![0; dims.cell_count()],
        }
    }

    pub fn is_connected(&mut self, field: &Field) -> bool {
        self.checker.is_connected(field)
    }

    /// Walks the field and returns the step count, or `0` when the goal is
    /// unreachable. The field's cached score is left untouched.
    pub fn traversal_length(&mut self, field: &Field) -> u64 {
        if !self.checker.is_connected(field) {
            return 0;
        }

        let dims = self.dims;
        let goal = dims.goal();
        self.visits.fill(0);

        let mut position = dims.start();
        let mut facing = Direction::East;
        let mut steps = 0u64;

        while position != goal {
            self.visits[position] += 1;

            // Minimum visit count among open neighbors and the first
            // direction in scan order that attains it.
            let mut least: Option<(u64, Direction)> = None;
            for dir in Direction::ALL {
                let next = dir.step(position, &dims);
                if field.is_wall_at(next) {
                    continue;
                }
                let count = self.visits[next];
                if least.is_none_or(|(min, _)| count < min) {
                    least = Some((count, dir));
                }
            }
            let Some((min_count, first_dir)) = least else {
                return 0;
            };

            let ahead = facing.step(position, &dims);
            if field.is_wall_at(ahead) || self.visits[ahead] != min_count {
                facing = first_dir;
            }

            position = facing.step(position, &dims);
            steps += 1;
        }

        steps
    }

    /// Walks the field and caches the result as its score.
    pub fn evaluate(&mut self, field: &mut Field) -> u64 {
        let score = self.traversal_length(field);
        field.set_score(score);
        score
    }
}
