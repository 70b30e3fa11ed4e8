//! Block-based genetic operators on wall fields.
//!
//! # Crossover
//!
//! - [`block_crossover`]: tile the interior with square blocks and copy
//!   each block from a parent chosen by a fair coin
//! - [`exhaustive_crossover`]: try every block assignment between two
//!   parents over a few coarse tilings and keep the best distinct results
//!
//! # Mutation
//!
//! - [`Workspace::mutate`]: flip one random cell (see the workspace docs)
//! - [`scramble_block`]: re-randomize every cell of a random rectangle
//!
//! # Local enumeration
//!
//! - [`exhaustive_window_search`]: try every wall pattern inside every
//!   small window of a base field and keep the best distinct results

use std::sync::atomic::{AtomicBool, Ordering};

use log::debug;
use rand::Rng;

use super::population::Population;
use crate::field::{Field, Workspace};

// ============================================================================
// Crossover
// ============================================================================

/// Assembles a child layout from square blocks of two parents.
///
/// The interior is tiled with `block_size × block_size` blocks starting at
/// `(1, 1)`; blocks on the far edges are clipped. The border is always wall.
/// The child is not restored or evaluated (its score is 0).
///
/// Crossing a field with an identical layout reproduces that layout.
///
/// # Panics
/// Panics if the parents have different extents or `block_size` is 0.
pub fn block_crossover_layout<R: Rng>(
    left: &Field,
    right: &Field,
    block_size: usize,
    rng: &mut R,
) -> Field {
    assert_eq!(left.dims(), right.dims(), "parents must share an extent");
    assert!(block_size > 0, "block_size must be positive");

    let dims = left.dims();
    let (x_end, y_end) = (dims.width() - 1, dims.height() - 1);
    let mut child = Field::empty(dims);

    for x_start in (1..x_end).step_by(block_size) {
        for y_start in (1..y_end).step_by(block_size) {
            let source = if rng.random_bool(0.5) { left } else { right };
            for x in x_start..(x_start + block_size).min(x_end) {
                for y in y_start..(y_start + block_size).min(y_end) {
                    let index = dims.index(x, y);
                    child.set_wall_at(index, source.is_wall_at(index));
                }
            }
        }
    }

    child
}

/// Block crossover followed by a restore under the workspace's strategy.
pub fn block_crossover<R: Rng>(
    left: &Field,
    right: &Field,
    block_size: usize,
    workspace: &mut Workspace,
    rng: &mut R,
) -> Field {
    let mut child = block_crossover_layout(left, right, block_size, rng);
    workspace.restore(&mut child, rng);
    child
}

/// Tries every block assignment between two parents and keeps the `keep`
/// best distinct-score fields found, the evaluated parents included.
///
/// For every tiling of the interior into at most `max_blocks` near-equal
/// blocks (the row/column splits of [`exhaustive_window_search`]), each
/// mask over the blocks picks which parent supplies every block; the two
/// masks that copy a whole parent are skipped. Children are evaluated
/// without repair and disconnected children are dropped.
///
/// # Panics
/// Panics if the parents have different extents, `max_blocks` is 0 or
/// above 20, or `keep` is 0.
pub fn exhaustive_crossover(
    first: &Field,
    second: &Field,
    workspace: &mut Workspace,
    max_blocks: usize,
    keep: usize,
    cancel: Option<&AtomicBool>,
) -> Population {
    assert_eq!(first.dims(), second.dims(), "parents must share an extent");
    assert!(
        (1..=20).contains(&max_blocks),
        "max_blocks must be in 1..=20, got {max_blocks}"
    );
    assert!(keep > 0, "keep must be positive");

    let dims = first.dims();
    let (x_end, y_end) = (dims.width() - 1, dims.height() - 1);
    let mut best = Population::new();

    for parent in [first, second] {
        let mut evaluated = parent.clone();
        if workspace.evaluate(&mut evaluated) > 0 {
            best.insert(evaluated);
        }
    }
    best.truncate(keep);

    let mut child = first.clone();
    let mut blocks = Vec::with_capacity(max_blocks);

    for (rows, cols) in window_shapes(max_blocks) {
        let block_w = (x_end - 1).div_ceil(rows);
        let block_h = (y_end - 1).div_ceil(cols);

        blocks.clear();
        for x_start in (1..x_end).step_by(block_w) {
            for y_start in (1..y_end).step_by(block_h) {
                blocks.push((x_start, y_start));
            }
        }

        let all_second = (1u32 << blocks.len()) - 1;
        for mask in 1..all_second {
            if cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
                return best;
            }

            for (bit, &(x_start, y_start)) in blocks.iter().enumerate() {
                let source = if mask & (1 << bit) != 0 { second } else { first };
                for x in x_start..(x_start + block_w).min(x_end) {
                    for y in y_start..(y_start + block_h).min(y_end) {
                        let index = dims.index(x, y);
                        child.set_wall_at(index, source.is_wall_at(index));
                    }
                }
            }

            let score = workspace.evaluate(&mut child);
            if score == 0 || best.contains_score(score) {
                continue;
            }
            if best.len() < keep || best.worst().is_some_and(|w| score > w.score()) {
                best.insert(child.clone());
                best.truncate(keep);
            }
        }

        debug!(
            "crossover tiling {rows}x{cols} ({} blocks): best {}",
            blocks.len(),
            best.best().map_or(0, Field::score)
        );
    }

    best
}

// ============================================================================
// Mutation
// ============================================================================

/// Re-randomizes a random rectangle of up to `W/3 × H/3` cells with fair
/// coin flips, then restores and returns the new score. Anchor cells keep
/// their state.
pub fn scramble_block<R: Rng>(field: &mut Field, workspace: &mut Workspace, rng: &mut R) -> u64 {
    let dims = field.dims();
    let (w, h) = (dims.width(), dims.height());

    let size_x = rng.random_range(1..=w / 3);
    let size_y = rng.random_range(1..=h / 3);
    let x_start = rng.random_range(1..=w - 1 - size_x);
    let y_start = rng.random_range(1..=h - 1 - size_y);

    for x in x_start..x_start + size_x {
        for y in y_start..y_start + size_y {
            let index = dims.index(x, y);
            if !dims.is_anchor(index) {
                field.set_wall_at(index, rng.random_bool(0.5));
            }
        }
    }

    workspace.restore(field, rng)
}

// ============================================================================
// Local enumeration
// ============================================================================

/// Window shapes `(rows, cols)` with `rows * cols <= max_area`, one per
/// distinct column count, each as tall as the area allows.
fn window_shapes(max_area: usize) -> Vec<(usize, usize)> {
    let mut shapes = Vec::new();
    let mut last_cols = 0;
    for rows_hint in 1..=max_area {
        let cols = max_area / rows_hint;
        if cols == last_cols {
            continue;
        }
        last_cols = cols;
        shapes.push((max_area / cols, cols));
    }
    shapes
}

/// Exhaustively rewrites small windows of `base` and keeps the `keep` best
/// distinct-score fields found, the evaluated base included.
///
/// For every window shape of area up to `max_area` and every placement
/// inside the interior, all `2^cells` wall patterns of the window's
/// non-anchor cells are evaluated (without repair; disconnected patterns
/// score 0 and are skipped). The cost grows as `2^max_area`, so this is a
/// seeding operator for small areas.
///
/// # Panics
/// Panics if `max_area` is 0 or above 20, or `keep` is 0.
pub fn exhaustive_window_search(
    base: &Field,
    workspace: &mut Workspace,
    max_area: usize,
    keep: usize,
    cancel: Option<&AtomicBool>,
) -> Population {
    assert!(
        (1..=20).contains(&max_area),
        "max_area must be in 1..=20, got {max_area}"
    );
    assert!(keep > 0, "keep must be positive");

    let dims = base.dims();
    let mut best = Population::new();

    let mut working = base.clone();
    workspace.evaluate(&mut working);
    if working.score() > 0 {
        best.insert(working.clone());
    }

    let mut window = Vec::with_capacity(max_area);

    for (rows, cols) in window_shapes(max_area) {
        if rows > dims.width() - 2 || cols > dims.height() - 2 {
            continue;
        }

        for x_start in 1..=dims.width() - 1 - rows {
            for y_start in 1..=dims.height() - 1 - cols {
                if cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
                    return best;
                }

                window.clear();
                for x in x_start..x_start + rows {
                    for y in y_start..y_start + cols {
                        let index = dims.index(x, y);
                        if !dims.is_anchor(index) {
                            window.push(index);
                        }
                    }
                }

                for mask in 0u32..(1u32 << window.len()) {
                    for (bit, &index) in window.iter().enumerate() {
                        working.set_wall_at(index, mask & (1 << bit) != 0);
                    }

                    let score = workspace.evaluate(&mut working);
                    if score == 0 || best.contains_score(score) {
                        continue;
                    }
                    if best.len() < keep || best.worst().is_some_and(|w| score > w.score()) {
                        best.insert(working.clone());
                        best.truncate(keep);
                    }
                }

                for &index in &window {
                    working.set_wall_at(index, base.is_wall_at(index));
                }
            }
        }

        debug!(
            "window {rows}x{cols}: best {}",
            best.best().map_or(0, Field::score)
        );
    }

    best
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{Dimensions, RepairStrategy};
    use crate::random::create_rng;

    fn small() -> Dimensions {
        Dimensions::new(7, 9).unwrap()
    }

    #[test]
    fn test_crossover_identical_parents() {
        let mut ws = Workspace::new(small(), RepairStrategy::Carve);
        let mut rng = create_rng(42);
        let parent = ws.random_field(0.4, &mut rng);
        let twin = parent.clone();

        for block_size in [1, 2, 5, 100] {
            let child = block_crossover_layout(&parent, &twin, block_size, &mut rng);
            assert!(child.same_layout(&parent), "block size {block_size}");

            let mut evaluated = child.clone();
            assert_eq!(ws.evaluate(&mut evaluated), parent.score());
        }
    }

    #[test]
    fn test_crossover_takes_whole_blocks() {
        let dims = small();
        let mut ws = Workspace::new(dims, RepairStrategy::Retry);
        let open = ws.empty_field();
        let full = Field::from_walls(dims, vec![true; dims.cell_count()]).unwrap();
        let mut rng = create_rng(7);

        let child = block_crossover_layout(&open, &full, 2, &mut rng);

        assert!(child.border_intact());
        for x_start in (1..6).step_by(2) {
            for y_start in (1..8).step_by(2) {
                let first = child.is_wall(x_start, y_start);
                for x in x_start..(x_start + 2).min(6) {
                    for y in y_start..(y_start + 2).min(8) {
                        assert_eq!(child.is_wall(x, y), first, "block at ({x_start}, {y_start})");
                    }
                }
            }
        }
    }

    #[test]
    fn test_crossover_mixes_parents() {
        let dims = small();
        let mut ws = Workspace::new(dims, RepairStrategy::Carve);
        let open = ws.empty_field();
        let full = Field::from_walls(dims, vec![true; dims.cell_count()]).unwrap();
        let mut rng = create_rng(1);

        let mut saw_open = false;
        let mut saw_wall = false;
        for _ in 0..20 {
            let child = block_crossover_layout(&open, &full, 1, &mut rng);
            let walls = child.interior_wall_count();
            saw_open |= walls < 35;
            saw_wall |= walls > 0;
        }
        assert!(saw_open && saw_wall);
    }

    #[test]
    fn test_block_crossover_restores() {
        let dims = small();
        let mut ws = Workspace::new(dims, RepairStrategy::Carve);
        let mut rng = create_rng(3);
        let a = ws.random_field(0.5, &mut rng);
        let b = ws.random_field(0.2, &mut rng);

        for _ in 0..20 {
            let child = block_crossover(&a, &b, 2, &mut ws, &mut rng);
            assert!(ws.is_connected(&child));
            assert!(child.score() > 0);
        }
    }

    #[test]
    fn test_exhaustive_crossover_mixes_blocks() {
        let dims = small();
        let mut ws = Workspace::new(dims, RepairStrategy::Carve);
        let mut rng = create_rng(12);
        let a = ws.empty_field();
        let b = ws.random_field(0.4, &mut rng);

        let found = exhaustive_crossover(&a, &b, &mut ws, 4, 3, None);

        assert!(!found.is_empty());
        assert!(found.len() <= 3);
        assert!(found.best().map_or(0, Field::score) >= a.score().max(b.score()));
        for field in found.iter() {
            assert!(field.border_intact());
            assert!(ws.is_connected(field));
            let mut copy = field.clone();
            assert_eq!(ws.evaluate(&mut copy), field.score());
            for index in 0..dims.cell_count() {
                let wall = field.is_wall_at(index);
                assert!(wall == a.is_wall_at(index) || wall == b.is_wall_at(index));
            }
        }
    }

    #[test]
    fn test_exhaustive_crossover_single_block_keeps_parents() {
        let mut ws = Workspace::new(small(), RepairStrategy::Carve);
        let mut rng = create_rng(6);
        let a = ws.random_field(0.2, &mut rng);
        let b = ws.random_field(0.3, &mut rng);

        // One block leaves only the two whole-parent masks, both skipped.
        let found = exhaustive_crossover(&a, &b, &mut ws, 1, 5, None);

        for score in found.scores() {
            assert!(score == a.score() || score == b.score());
        }
    }

    #[test]
    fn test_exhaustive_crossover_identical_parents() {
        let mut ws = Workspace::new(small(), RepairStrategy::Carve);
        let mut rng = create_rng(2);
        let parent = ws.random_field(0.3, &mut rng);

        let found = exhaustive_crossover(&parent, &parent.clone(), &mut ws, 6, 4, None);

        assert_eq!(found.scores(), vec![parent.score()]);
        assert!(found.best().is_some_and(|f| f.same_layout(&parent)));
    }

    #[test]
    fn test_exhaustive_crossover_cancelled() {
        let mut ws = Workspace::new(small(), RepairStrategy::Carve);
        let mut rng = create_rng(4);
        let a = ws.empty_field();
        let b = ws.random_field(0.3, &mut rng);
        let cancel = AtomicBool::new(true);

        let found = exhaustive_crossover(&a, &b, &mut ws, 8, 5, Some(&cancel));

        for score in found.scores() {
            assert!(score == a.score() || score == b.score());
        }
    }

    #[test]
    fn test_scramble_block_bounds() {
        let dims = small();
        let mut ws = Workspace::new(dims, RepairStrategy::Carve);
        let mut rng = create_rng(5);
        let mut field = ws.empty_field();

        for _ in 0..100 {
            let score = scramble_block(&mut field, &mut ws, &mut rng);
            assert_eq!(score, field.score());
            assert!(field.border_intact());
            assert!(ws.is_connected(&field));
        }
    }

    #[test]
    fn test_scramble_block_keeps_anchors_under_retry() {
        let dims = Dimensions::new(4, 4).unwrap();
        let mut ws = Workspace::new(dims, RepairStrategy::Retry);
        let mut rng = create_rng(8);
        let mut field = ws.empty_field();

        for _ in 0..50 {
            scramble_block(&mut field, &mut ws, &mut rng);
            assert!(!field.is_wall(1, 1));
            assert!(!field.is_wall(2, 2));
        }
    }

    #[test]
    fn test_window_shapes() {
        assert_eq!(
            window_shapes(12),
            vec![(1, 12), (2, 6), (3, 4), (4, 3), (6, 2), (12, 1)]
        );
        assert_eq!(window_shapes(1), vec![(1, 1)]);
        assert_eq!(window_shapes(4), vec![(1, 4), (2, 2), (4, 1)]);
    }

    #[test]
    fn test_window_search_never_worse_than_base() {
        let dims = small();
        let mut ws = Workspace::new(dims, RepairStrategy::Carve);
        let base = ws.empty_field();

        let found = exhaustive_window_search(&base, &mut ws, 3, 4, None);

        assert!(!found.is_empty());
        assert!(found.len() <= 4);
        assert!(found.best().map_or(0, Field::score) > base.score());
        assert!(found.iter().all(|f| f.score() > 0 && f.border_intact()));
        for field in found.iter() {
            let mut copy = field.clone();
            assert_eq!(ws.evaluate(&mut copy), field.score());
        }
    }

    #[test]
    fn test_window_search_cancelled() {
        let mut ws = Workspace::new(small(), RepairStrategy::Carve);
        let base = ws.empty_field();
        let cancel = AtomicBool::new(true);

        let found = exhaustive_window_search(&base, &mut ws, 2, 3, Some(&cancel));
        assert_eq!(found.scores(), vec![base.score()]);
    }
}
