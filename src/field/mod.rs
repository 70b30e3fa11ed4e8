//! Wall fields and the operations that score and edit them.
//!
//! # Key Types
//!
//! - [`Field`]: fixed-extent wall map with a cached traversal score
//! - [`Dimensions`]: the extent shared by every field in a run
//! - [`ConnectivityChecker`]: breadth-first start-to-goal reachability
//! - [`TraversalEvaluator`]: the greedy least-visited walk (fitness)
//! - [`PathCarver`]: Dijkstra repair over a random wall-cost field
//! - [`Workspace`]: scratch state plus mutate/randomize/restore under a
//!   configured [`RepairStrategy`]
//!
//! Records in the `score + W rows of H glyphs` text format are handled by
//! [`Field::to_record`], [`Field::parse_record`] and [`parse_records`].

mod connectivity;
mod grid;
mod record;
mod repair;
mod traversal;
mod workspace;

pub use connectivity::ConnectivityChecker;
pub use grid::{Dimensions, Direction, Field, FieldError, OPEN_GLYPH, WALL_GLYPH};
pub use record::parse_records;
pub use repair::{PathCarver, RepairStrategy, MAX_WALL_COST};
pub use traversal::TraversalEvaluator;
pub use workspace::Workspace;
