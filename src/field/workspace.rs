//! Grid operations bound to a repair strategy.

use log::trace;
use rand::seq::SliceRandom;
use rand::Rng;

use super::grid::{Dimensions, Field};
use super::repair::{PathCarver, RepairStrategy};
use super::traversal::TraversalEvaluator;

/// Owns the scratch state for evaluation and repair and exposes every
/// operation the search drivers apply to fields.
///
/// A workspace serves one extent; passing a field of another extent is a
/// programming error.
///
/// # Examples
///
/// ```
/// use u_bugfield::field::{Dimensions, RepairStrategy, Workspace};
/// use u_bugfield::random::create_rng;
///
/// let mut ws = Workspace::new(Dimensions::default(), RepairStrategy::Carve);
/// let mut rng = create_rng(42);
///
/// let empty = ws.empty_field();
/// assert_eq!(empty.score(), 46);
///
/// let mut field = ws.random_field(0.3, &mut rng);
/// assert!(ws.is_connected(&field));
/// ws.mutate(&mut field, &mut rng);
/// assert!(field.score() > 0);
/// ```
#[derive(Debug, Clone)]
pub struct Workspace {
    dims: Dimensions,
    strategy: RepairStrategy,
    evaluator: TraversalEvaluator,
    carver: PathCarver,
}

impl Workspace {
    pub fn new(dims: Dimensions, strategy: RepairStrategy) -> Self {
        Self {
            dims,
            strategy,
            evaluator: TraversalEvaluator::new(dims),
            carver: PathCarver::new(dims),
        }
    }

    pub fn dims(&self) -> Dimensions {
        self.dims
    }

    pub fn strategy(&self) -> RepairStrategy {
        self.strategy
    }

    pub fn is_connected(&mut self, field: &Field) -> bool {
        self.check_dims(field);
        self.evaluator.is_connected(field)
    }

    /// Recomputes and caches the field's score.
    pub fn evaluate(&mut self, field: &mut Field) -> u64 {
        self.check_dims(field);
        self.evaluator.evaluate(field)
    }

    /// An evaluated field with only the border walled.
    pub fn empty_field(&mut self) -> Field {
        let mut field = Field::empty(self.dims);
        self.evaluator.evaluate(&mut field);
        field
    }

    /// Walls every interior cell independently with probability `density`,
    /// then restores and evaluates.
    ///
    /// # Panics
    /// Panics if `density` is outside `[0, 1]`.
    pub fn random_field<R: Rng>(&mut self, density: f64, rng: &mut R) -> Field {
        let mut field = Field::empty(self.dims);
        for index in self.dims.interior() {
            field.set_wall_at(index, rng.random_bool(density));
        }
        self.restore(&mut field, rng);
        field
    }

    /// Carves a start-to-goal route if the field is disconnected,
    /// regardless of the configured strategy. Returns the number of walls
    /// removed.
    pub fn repair<R: Rng>(&mut self, field: &mut Field, rng: &mut R) -> usize {
        self.check_dims(field);
        if self.evaluator.is_connected(field) {
            return 0;
        }
        let opened = self.carver.carve(field, rng);
        trace!("carved route opening {opened} walls");
        opened
    }

    /// Brings a freshly edited field back to a consistent state under the
    /// configured strategy and returns its new score.
    ///
    /// `Carve` repairs connectivity first; `Retry` only re-evaluates, so a
    /// disconnected field scores `0`.
    pub fn restore<R: Rng>(&mut self, field: &mut Field, rng: &mut R) -> u64 {
        if self.strategy == RepairStrategy::Carve {
            self.repair(field, rng);
        }
        self.evaluate(field)
    }

    /// Uniformly samples a non-anchor interior cell.
    pub fn random_mutable_cell<R: Rng>(&self, rng: &mut R) -> usize {
        self.dims
            .mutable_cell(rng.random_range(0..self.dims.mutable_cell_count()))
    }

    /// Flips one random non-anchor interior cell and returns the new score.
    ///
    /// Under `Carve` a flip that disconnects the field is repaired. Under
    /// `Retry` it is reverted and another cell is sampled; a field that was
    /// already disconnected accepts any flip. After `mutable_cell_count()`
    /// failed draws every mutable cell is tried once in shuffled order, so
    /// the field is left unchanged only when no flip keeps it connected.
    pub fn mutate<R: Rng>(&mut self, field: &mut Field, rng: &mut R) -> u64 {
        self.check_dims(field);
        match self.strategy {
            RepairStrategy::Carve => {
                let cell = self.random_mutable_cell(rng);
                field.flip(cell);
                self.restore(field, rng)
            }
            RepairStrategy::Retry => {
                if !self.evaluator.is_connected(field) {
                    let cell = self.random_mutable_cell(rng);
                    field.flip(cell);
                    return self.evaluator.evaluate(field);
                }

                for _ in 0..self.dims.mutable_cell_count() {
                    let cell = self.random_mutable_cell(rng);
                    if self.flip_if_connected(field, cell) {
                        return self.evaluator.evaluate(field);
                    }
                }

                let mut cells: Vec<usize> = (0..self.dims.mutable_cell_count())
                    .map(|k| self.dims.mutable_cell(k))
                    .collect();
                cells.shuffle(rng);
                for cell in cells {
                    if self.flip_if_connected(field, cell) {
                        return self.evaluator.evaluate(field);
                    }
                }

                trace!("no connectivity-preserving flip exists");
                self.evaluator.evaluate(field)
            }
        }
    }

    /// Keeps the flip of `cell` only if the field stays connected.
    fn flip_if_connected(&mut self, field: &mut Field, cell: usize) -> bool {
        field.flip(cell);
        if self.evaluator.is_connected(field) {
            return true;
        }
        field.flip(cell);
        false
    }

    fn check_dims(&self, field: &Field) {
        assert_eq!(
            field.dims(),
            self.dims,
            "field extent does not match the workspace"
        );
    }
}
