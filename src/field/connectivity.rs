//! Start-to-goal reachability.

use super::grid::{Dimensions, Direction, Field};

/// Breadth-first reachability test over open cells.
///
/// Visited marks are epoch stamps: a cell is visited in the current run
/// iff its stamp equals `epoch`, so the stamp buffer is never cleared
/// between runs.
#[derive(Debug, Clone)]
pub struct ConnectivityChecker {
    dims: Dimensions,
    stamps: Vec<u32>,
    epoch: u32,
    queue: Vec<usize>,
}

impl ConnectivityChecker {
    pub fn new(dims: Dimensions) -> Self {
        Self {
            dims,
            stamps: vec![0; dims.cell_count()],
            epoch: 0,
            queue: Vec::with_capacity(dims.cell_count()),
        }
    }

    /// Current generation counter.
    pub fn epoch(&self) -> u32 {
        self.epoch
    }

    /// Returns `true` iff the goal is reachable from the start through
    /// 4-adjacent open cells.
    pub fn is_connected(&mut self, field: &Field) -> bool {
        debug_assert_eq!(field.dims(), self.dims);
        let dims = self.dims;
        let start = dims.start();

        if field.is_wall_at(start) {
            return false;
        }

        self.advance_epoch();
        let epoch = self.epoch;

        self.queue.clear();
        self.queue.push(start);
        self.stamps[start] = epoch;

        let mut head = 0;
        while head < self.queue.len() {
            let cell = self.queue[head];
            head += 1;

            for dir in Direction::ALL {
                let next = dir.step(cell, &dims);
                if field.is_wall_at(next) || self.stamps[next] == epoch {
                    continue;
                }
                self.stamps[next] = epoch;
                self.queue.push(next);
            }
        }

        self.stamps[dims.goal()] == epoch
    }

    fn advance_epoch(&mut self) {
        if self.epoch == u32::MAX {
            self.stamps.fill(0);
            self.epoch = 0;
        }
        self.epoch += 1;
    }
}
