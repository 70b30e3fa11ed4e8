//! Simulated Annealing over wall layouts.
//!
//! A single field is perturbed one cell at a time. Worsening flips are
//! accepted with a probability that shrinks as the temperature cools,
//! letting the search escape local optima of the traversal score.
//!
//! # References
//!
//! - Kirkpatrick, Gelatt & Vecchi (1983), "Optimization by Simulated Annealing"
//! - Cerny (1985), "Thermodynamical Approach to the Travelling Salesman Problem"
//! - Lundy & Mees (1986), "Convergence of an Annealing Algorithm"

mod config;
mod runner;

pub use config::{AnnealConfig, CoolingSchedule};
pub use runner::{AnnealResult, AnnealRunner};
