//! Fixed-extent wall grid.
//!
//! A [`Field`] is a `W × H` boolean wall map stored in one flat buffer
//! indexed by `y + x * H`. The outer ring is always wall. Cell `(1, 1)` is
//! the start anchor and `(W - 2, H - 2)` the goal anchor.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Glyph used for a wall cell in textual records.
pub const WALL_GLYPH: char = '#';

/// Glyph used for an open cell in textual records.
pub const OPEN_GLYPH: char = '.';

/// Errors raised while constructing or decoding fields.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FieldError {
    #[error("grid {width}x{height} has no mutable interior cell besides the anchors")]
    InvalidDimensions { width: usize, height: usize },
    #[error("wall buffer has {found} cells, expected {expected}")]
    BufferLength { found: usize, expected: usize },
    #[error("invalid score line {0:?}")]
    InvalidScore(String),
    #[error("record ended after {rows} of {expected} rows")]
    MissingRows { rows: usize, expected: usize },
    #[error("row {row} has {found} cells, expected {expected}")]
    RowLength {
        row: usize,
        found: usize,
        expected: usize,
    },
    #[error("unknown glyph {glyph:?} at ({x}, {y})")]
    UnknownGlyph { glyph: char, x: usize, y: usize },
    #[error("border cell ({x}, {y}) is open")]
    OpenBorder { x: usize, y: usize },
}

/// Grid extent shared by every field in a run.
///
/// # Examples
///
/// ```
/// use u_bugfield::field::Dimensions;
///
/// let dims = Dimensions::new(21, 31).unwrap();
/// assert_eq!(dims.cell_count(), 651);
/// assert_eq!(dims.mutable_cell_count(), 19 * 29 - 2);
/// assert!(Dimensions::new(3, 3).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Dimensions {
    width: usize,
    height: usize,
}

impl Dimensions {
    /// Validates and creates an extent.
    ///
    /// The interior must hold at least one cell besides the two anchors.
    pub fn new(width: usize, height: usize) -> Result<Self, FieldError> {
        if width < 3 || height < 3 || (width - 2) * (height - 2) < 3 {
            return Err(FieldError::InvalidDimensions { width, height });
        }
        Ok(Self { width, height })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Total number of cells, border included.
    pub fn cell_count(&self) -> usize {
        self.width * self.height
    }

    /// Number of interior cells the mutators may flip (anchors excluded).
    pub fn mutable_cell_count(&self) -> usize {
        (self.width - 2) * (self.height - 2) - 2
    }

    /// Flat index of `(x, y)`.
    #[inline]
    pub fn index(&self, x: usize, y: usize) -> usize {
        y + x * self.height
    }

    /// Inverse of [`index`](Self::index).
    #[inline]
    pub fn coords(&self, index: usize) -> (usize, usize) {
        (index / self.height, index % self.height)
    }

    #[inline]
    pub fn start(&self) -> usize {
        self.index(1, 1)
    }

    #[inline]
    pub fn goal(&self) -> usize {
        self.index(self.width - 2, self.height - 2)
    }

    #[inline]
    pub fn is_anchor(&self, index: usize) -> bool {
        index == self.start() || index == self.goal()
    }

    #[inline]
    pub fn is_border(&self, x: usize, y: usize) -> bool {
        x == 0 || y == 0 || x + 1 == self.width || y + 1 == self.height
    }

    #[inline]
    pub fn is_border_index(&self, index: usize) -> bool {
        let (x, y) = self.coords(index);
        self.is_border(x, y)
    }

    /// Maps `k` in `0..mutable_cell_count()` onto a non-anchor interior cell.
    ///
    /// Interior cells are enumerated row by row; slot 0 (the start) and the
    /// last slot (the goal) are skipped.
    pub fn mutable_cell(&self, k: usize) -> usize {
        debug_assert!(k < self.mutable_cell_count());
        let inner_height = self.height - 2;
        let v = k + 1;
        self.index(v / inner_height + 1, v % inner_height + 1)
    }

    /// Iterates over every interior cell index.
    pub fn interior(&self) -> impl Iterator<Item = usize> + '_ {
        (1..self.width - 1).flat_map(move |x| (1..self.height - 1).map(move |y| self.index(x, y)))
    }
}

impl Default for Dimensions {
    fn default() -> Self {
        Self {
            width: 21,
            height: 31,
        }
    }
}

/// One of the four walking directions.
///
/// East steps along `x + 1`, south along `y + 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    East,
    South,
    West,
    North,
}

impl Direction {
    /// Fixed scan order used for tie-breaks.
    pub const ALL: [Direction; 4] = [
        Direction::East,
        Direction::South,
        Direction::West,
        Direction::North,
    ];

    pub fn offset(self) -> (isize, isize) {
        match self {
            Direction::East => (1, 0),
            Direction::South => (0, 1),
            Direction::West => (-1, 0),
            Direction::North => (0, -1),
        }
    }

    /// Neighbor of a non-border cell in this direction.
    #[inline]
    pub(crate) fn step(self, index: usize, dims: &Dimensions) -> usize {
        match self {
            Direction::East => index + dims.height,
            Direction::South => index + 1,
            Direction::West => index - dims.height,
            Direction::North => index - 1,
        }
    }
}

/// A wall layout with its cached traversal score.
///
/// Equality compares the full layout and the cached score. A field is
/// better than another iff its score is strictly higher.
///
/// Scores are only refreshed by a [`Workspace`](super::Workspace); after
/// editing walls directly with [`set_wall`](Field::set_wall) the cached
/// score is stale until the field is evaluated again.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Field {
    dims: Dimensions,
    walls: Vec<bool>,
    score: u64,
}

impl Field {
    /// A field with only the border walled. The score is not evaluated.
    pub fn empty(dims: Dimensions) -> Self {
        let walls = (0..dims.cell_count())
            .map(|index| dims.is_border_index(index))
            .collect();
        Self {
            dims,
            walls,
            score: 0,
        }
    }

    /// Builds a field from a flat `y + x * H` wall buffer.
    ///
    /// Fails if the buffer length is wrong or any border cell is open.
    pub fn from_walls(dims: Dimensions, walls: Vec<bool>) -> Result<Self, FieldError> {
        if walls.len() != dims.cell_count() {
            return Err(FieldError::BufferLength {
                found: walls.len(),
                expected: dims.cell_count(),
            });
        }
        if let Some(index) = (0..walls.len()).find(|&i| dims.is_border_index(i) && !walls[i]) {
            let (x, y) = dims.coords(index);
            return Err(FieldError::OpenBorder { x, y });
        }
        Ok(Self {
            dims,
            walls,
            score: 0,
        })
    }

    pub fn dims(&self) -> Dimensions {
        self.dims
    }

    /// Cached result of the last evaluation. `0` means disconnected.
    pub fn score(&self) -> u64 {
        self.score
    }

    pub(crate) fn set_score(&mut self, score: u64) {
        self.score = score;
    }

    pub fn walls(&self) -> &[bool] {
        &self.walls
    }

    pub fn is_wall(&self, x: usize, y: usize) -> bool {
        self.walls[self.dims.index(x, y)]
    }

    #[inline]
    pub fn is_wall_at(&self, index: usize) -> bool {
        self.walls[index]
    }

    /// Sets an interior cell.
    ///
    /// # Panics
    /// Panics if `(x, y)` lies on the border.
    pub fn set_wall(&mut self, x: usize, y: usize, wall: bool) {
        assert!(
            !self.dims.is_border(x, y),
            "border cell ({x}, {y}) is immutable"
        );
        let index = self.dims.index(x, y);
        self.walls[index] = wall;
    }

    #[inline]
    pub(crate) fn set_wall_at(&mut self, index: usize, wall: bool) {
        debug_assert!(!self.dims.is_border_index(index));
        self.walls[index] = wall;
    }

    #[inline]
    pub(crate) fn flip(&mut self, index: usize) {
        debug_assert!(!self.dims.is_border_index(index));
        self.walls[index] = !self.walls[index];
    }

    /// Number of walled interior cells.
    pub fn interior_wall_count(&self) -> usize {
        self.dims.interior().filter(|&i| self.walls[i]).count()
    }

    pub fn is_better_than(&self, other: &Field) -> bool {
        self.score > other.score
    }

    /// Compares wall patterns only, ignoring cached scores.
    pub fn same_layout(&self, other: &Field) -> bool {
        self.dims == other.dims && self.walls == other.walls
    }

    /// Whether every border cell is walled.
    pub fn border_intact(&self) -> bool {
        (0..self.walls.len())
            .filter(|&i| self.dims.is_border_index(i))
            .all(|i| self.walls[i])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimensions_validation() {
        assert!(Dimensions::new(21, 31).is_ok());
        assert!(Dimensions::new(5, 5).is_ok());
        assert!(Dimensions::new(3, 5).is_ok());
        assert_eq!(
            Dimensions::new(3, 4),
            Err(FieldError::InvalidDimensions {
                width: 3,
                height: 4
            })
        );
        assert!(Dimensions::new(2, 10).is_err());
        assert!(Dimensions::new(4, 4).is_ok());
    }

    #[test]
    fn test_index_roundtrip() {
        let dims = Dimensions::new(7, 9).unwrap();
        for x in 0..7 {
            for y in 0..9 {
                let index = dims.index(x, y);
                assert_eq!(index, y + x * 9);
                assert_eq!(dims.coords(index), (x, y));
            }
        }
    }

    #[test]
    fn test_mutable_cells_skip_anchors() {
        let dims = Dimensions::new(6, 7).unwrap();
        let cells: Vec<usize> = (0..dims.mutable_cell_count())
            .map(|k| dims.mutable_cell(k))
            .collect();

        assert_eq!(cells.len(), 4 * 5 - 2);
        assert!(!cells.contains(&dims.start()));
        assert!(!cells.contains(&dims.goal()));
        assert!(cells.iter().all(|&i| !dims.is_border_index(i)));

        let mut unique = cells.clone();
        unique.sort_unstable();
        unique.dedup();
        assert_eq!(unique.len(), cells.len());
    }

    #[test]
    fn test_empty_field_border() {
        let dims = Dimensions::default();
        let field = Field::empty(dims);

        assert!(field.border_intact());
        assert_eq!(field.interior_wall_count(), 0);
        assert!(!field.is_wall(1, 1));
        assert!(!field.is_wall(19, 29));
        assert!(field.is_wall(0, 5));
        assert!(field.is_wall(20, 5));
        assert!(field.is_wall(5, 0));
        assert!(field.is_wall(5, 30));
        assert_eq!(field.score(), 0);
    }

    #[test]
    fn test_direction_steps() {
        let dims = Dimensions::new(5, 6).unwrap();
        let center = dims.index(2, 3);
        for dir in Direction::ALL {
            let (dx, dy) = dir.offset();
            let expected = dims.index((2 + dx) as usize, (3 + dy) as usize);
            assert_eq!(dir.step(center, &dims), expected, "{dir:?}");
        }
    }

    #[test]
    fn test_from_walls_rejects_open_border() {
        let dims = Dimensions::new(5, 5).unwrap();
        let mut walls = Field::empty(dims).walls().to_vec();
        walls[dims.index(0, 2)] = false;
        assert_eq!(
            Field::from_walls(dims, walls),
            Err(FieldError::OpenBorder { x: 0, y: 2 })
        );

        assert!(matches!(
            Field::from_walls(dims, vec![true; 3]),
            Err(FieldError::BufferLength { found: 3, .. })
        ));
    }

    #[test]
    #[should_panic(expected = "immutable")]
    fn test_set_wall_on_border_panics() {
        let mut field = Field::empty(Dimensions::new(5, 5).unwrap());
        field.set_wall(0, 1, false);
    }

    #[test]
    fn test_layout_equality() {
        let dims = Dimensions::new(5, 5).unwrap();
        let a = Field::empty(dims);
        let mut b = a.clone();
        assert!(a.same_layout(&b));
        b.set_wall(2, 2, true);
        assert!(!a.same_layout(&b));
        assert_ne!(a, b);
    }
}
