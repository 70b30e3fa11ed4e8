//! Wall-layout optimization for a greedy least-visited walker.
//!
//! A bug starts in the top-left interior cell of a walled grid and walks
//! to the bottom-right one, always stepping to the neighbour it has visited
//! least. This crate searches for wall layouts that make that walk as long
//! as possible:
//!
//! - **Field**: grid, connectivity check, traversal scoring, shortest-path
//!   carve repair, record codec, and the [`field::Workspace`] that applies
//!   them under a configured repair strategy.
//! - **Simulated Annealing (SA)**: single-field trajectory search with
//!   pluggable cooling schedules.
//! - **Genetic Search (GA)**: score-keyed population improved by block
//!   crossover and single-cell mutation until it stagnates.
//! - **Campaign**: repeated genetic searches collecting winners into a
//!   file-backed [`archive::FieldStore`], then a champion run over them.

pub mod archive;
pub mod campaign;
pub mod field;
pub mod ga;
pub mod random;
pub mod sa;
