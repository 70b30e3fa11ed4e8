//! Annealing configuration and cooling schedules.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::field::Dimensions;

/// Cooling schedule, applied once at the start of every iteration.
///
/// # References
///
/// - Geometric: standard textbook approach
/// - Linear: fixed-duration cooling
/// - LundyMees: Lundy & Mees (1986), with convergence proof
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum CoolingSchedule {
    /// Geometric cooling: `T_{k+1} = alpha * T_k`.
    Geometric {
        /// Decay factor in (0, 1), typically 0.99–0.999.
        alpha: f64,
    },

    /// Linear cooling from the initial to the minimum temperature over the
    /// iteration budget.
    Linear,

    /// Lundy-Mees cooling: `T_{k+1} = T_k / (1 + beta * T_k)`.
    LundyMees {
        /// Cooling parameter, must be positive.
        beta: f64,
    },
}

impl Default for CoolingSchedule {
    fn default() -> Self {
        CoolingSchedule::Geometric { alpha: 0.999 }
    }
}

/// Configuration for annealing a single field.
///
/// The iteration budget scales with the grid area:
/// `width * height * iterations_per_cell`, unless `max_iterations`
/// overrides it.
///
/// # Examples
///
/// ```
/// use u_bugfield::sa::{AnnealConfig, CoolingSchedule};
///
/// let config = AnnealConfig::default()
///     .with_iterations_per_cell(10)
///     .with_cooling(CoolingSchedule::Geometric { alpha: 0.99 })
///     .with_seed(7);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AnnealConfig {
    /// Starting temperature.
    pub initial_temperature: f64,

    /// Floor for linear cooling.
    pub min_temperature: f64,

    pub cooling: CoolingSchedule,

    /// Iterations per grid cell.
    pub iterations_per_cell: usize,

    /// Hard iteration budget. 0 = use `iterations_per_cell`.
    pub max_iterations: usize,

    /// Random seed for standalone runs. Ignored when the caller supplies
    /// its own generator.
    pub seed: Option<u64>,
}

impl Default for AnnealConfig {
    fn default() -> Self {
        Self {
            initial_temperature: 1.0,
            min_temperature: 1e-9,
            cooling: CoolingSchedule::default(),
            iterations_per_cell: 100,
            max_iterations: 0,
            seed: None,
        }
    }
}

impl AnnealConfig {
    /// Short schedule: 10 iterations per cell, `alpha = 0.99`.
    pub fn fast() -> Self {
        Self {
            iterations_per_cell: 10,
            cooling: CoolingSchedule::Geometric { alpha: 0.99 },
            ..Self::default()
        }
    }

    pub fn with_initial_temperature(mut self, t: f64) -> Self {
        self.initial_temperature = t;
        self
    }

    pub fn with_min_temperature(mut self, t: f64) -> Self {
        self.min_temperature = t;
        self
    }

    pub fn with_cooling(mut self, cooling: CoolingSchedule) -> Self {
        self.cooling = cooling;
        self
    }

    pub fn with_iterations_per_cell(mut self, n: usize) -> Self {
        self.iterations_per_cell = n;
        self
    }

    pub fn with_max_iterations(mut self, n: usize) -> Self {
        self.max_iterations = n;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Number of iterations a run on `dims` performs.
    pub fn iteration_budget(&self, dims: Dimensions) -> usize {
        if self.max_iterations > 0 {
            self.max_iterations
        } else {
            dims.cell_count() * self.iterations_per_cell
        }
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.initial_temperature <= 0.0 {
            return Err("initial_temperature must be positive".into());
        }
        if self.min_temperature <= 0.0 {
            return Err("min_temperature must be positive".into());
        }
        if self.min_temperature >= self.initial_temperature {
            return Err("min_temperature must be less than initial_temperature".into());
        }
        if self.iterations_per_cell == 0 && self.max_iterations == 0 {
            return Err("iterations_per_cell and max_iterations cannot both be 0".into());
        }
        match self.cooling {
            CoolingSchedule::Geometric { alpha } => {
                if alpha <= 0.0 || alpha >= 1.0 {
                    return Err(format!("geometric alpha must be in (0, 1), got {alpha}"));
                }
            }
            CoolingSchedule::LundyMees { beta } => {
                if beta <= 0.0 {
                    return Err(format!("lundy-mees beta must be positive, got {beta}"));
                }
            }
            CoolingSchedule::Linear => {}
        }
        Ok(())
    }
}
