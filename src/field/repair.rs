//! Connectivity repair.
//!
//! Two strategies restore start-to-goal connectivity after wall edits:
//!
//! - [`RepairStrategy::Carve`]: run Dijkstra from the start over a random
//!   cost field (open cells free, walls cost `[0, 1_000_000)`) and open
//!   every cell on the cheapest route to the goal. Already-open cells are
//!   reused wherever possible, so few walls are removed.
//! - [`RepairStrategy::Retry`]: never carve; a mutation that breaks
//!   connectivity is reverted and another cell is tried instead.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use rand::Rng;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::grid::{Dimensions, Direction, Field};

/// Exclusive upper bound of the random cost of crossing a wall cell.
pub const MAX_WALL_COST: u64 = 1_000_000;

const NO_PARENT: usize = usize::MAX;

/// How connectivity is preserved by the mutating operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum RepairStrategy {
    /// Carve a minimal-cost path with [`PathCarver`].
    #[default]
    Carve,
    /// Revert and re-sample connectivity-breaking flips.
    Retry,
}

/// Dijkstra-based path carver.
///
/// All buffers are sized once for the grid extent and reused.
#[derive(Debug, Clone)]
pub struct PathCarver {
    dims: Dimensions,
    costs: Vec<u64>,
    distances: Vec<u64>,
    parents: Vec<usize>,
    heap: BinaryHeap<Reverse<(u64, usize)>>,
}

impl PathCarver {
    pub fn new(dims: Dimensions) -> Self {
        let n = dims.cell_count();
        Self {
            dims,
            costs: vec![0; n],
            distances: vec![u64::MAX; n],
            parents: vec![NO_PARENT; n],
            heap: BinaryHeap::with_capacity(n),
        }
    }

    /// Opens the cheapest start-to-goal route and returns how many walls
    /// were removed.
    ///
    /// Border cells are never entered, so the ring stays intact. The
    /// interior is a connected rectangle, so a route always exists.
    pub fn carve<R: Rng>(&mut self, field: &mut Field, rng: &mut R) -> usize {
        debug_assert_eq!(field.dims(), self.dims);
        let dims = self.dims;
        let (start, goal) = (dims.start(), dims.goal());

        for index in 0..dims.cell_count() {
            self.costs[index] = if field.is_wall_at(index) && !dims.is_border_index(index) {
                rng.random_range(0..MAX_WALL_COST)
            } else {
                0
            };
            self.distances[index] = u64::MAX;
            self.parents[index] = NO_PARENT;
        }

        self.heap.clear();
        self.distances[start] = self.costs[start];
        self.heap.push(Reverse((self.distances[start], start)));

        while let Some(Reverse((distance, cell))) = self.heap.pop() {
            if distance > self.distances[cell] {
                continue;
            }
            if cell == goal {
                break;
            }

            for dir in Direction::ALL {
                let next = dir.step(cell, &dims);
                if dims.is_border_index(next) {
                    continue;
                }
                let candidate = distance + self.costs[next];
                if candidate >= self.distances[next] {
                    continue;
                }
                self.distances[next] = candidate;
                self.parents[next] = cell;
                self.heap.push(Reverse((candidate, next)));
            }
        }

        let mut opened = 0;
        let mut cell = goal;
        loop {
            if field.is_wall_at(cell) {
                field.set_wall_at(cell, false);
                opened += 1;
            }
            if cell == start {
                break;
            }
            match self.parents[cell] {
                NO_PARENT => break,
                parent => cell = parent,
            }
        }

        opened
    }
}
