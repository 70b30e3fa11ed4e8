//! Genetic search over wall layouts.
//!
//! A score-keyed population is seeded with start fields, annealed fields,
//! random fields and empty fields, then improved round by round: every
//! member is crossed with every member by block crossover, each child is
//! mutated once, the best children of each left parent are merged back and
//! the population is truncated to its capacity. The search stops after a
//! configured number of rounds without a new best, or earlier when the top
//! of the population has converged.
//!
//! # Key Types
//!
//! - [`GeneticConfig`]: round parameters, capacity and stop criteria
//! - [`SeedPlan`]: composition of the initial population
//! - [`Population`]: score-ordered set that holds each score once
//! - [`GeneticRunner`]: executes the loop
//! - [`GeneticResult`]: best field plus per-round statistics
//!
//! # Submodules
//!
//! - [`operators`]: block crossover, exhaustive crossover, block scramble
//!   and exhaustive window search
//!
//! # References
//!
//! - Holland (1975), *Adaptation in Natural and Artificial Systems*
//! - Goldberg (1989), *Genetic Algorithms in Search, Optimization, and Machine Learning*

mod config;
pub mod operators;
mod population;
mod runner;

pub use config::{GeneticConfig, SeedPlan};
pub use population::Population;
pub use runner::{GeneticResult, GeneticRunner, RoundStats};
