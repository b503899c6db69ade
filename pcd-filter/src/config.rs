use serde::{Deserialize, Serialize};

use crate::error::FilterError;

/// Global rejection method applied before local surface filtering.
///
/// Only sigma clipping is implemented; the other methods are accepted as
/// names so that a request for them fails loudly instead of doing nothing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CleaningAlgorithm {
    #[default]
    SigmaClipping,
    StatisticalOutlierRemoval,
    RadiusOutlierRemoval,
}

impl CleaningAlgorithm {
    pub fn ensure_supported(self) -> Result<(), FilterError> {
        match self {
            Self::SigmaClipping => Ok(()),
            other => Err(FilterError::UnsupportedAlgorithm(other)),
        }
    }
}

/// When iterative sigma clipping stops if it has not converged yet.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoppingPolicy {
    /// Run at most this many rejection passes.
    MaxIterations(usize),
    /// Stop once a pass removes less than `ratio` of the points it started
    /// with, or after `max_iterations` passes.
    RemovedFractionBelow { ratio: f64, max_iterations: usize },
}

impl StoppingPolicy {
    pub const DEFAULT_MAX_ITERATIONS: usize = 100;

    pub fn max_iterations(&self) -> usize {
        match *self {
            Self::MaxIterations(n) => n,
            Self::RemovedFractionBelow { max_iterations, .. } => max_iterations,
        }
    }
}

impl Default for StoppingPolicy {
    fn default() -> Self {
        Self::MaxIterations(Self::DEFAULT_MAX_ITERATIONS)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Grid nodes per axis for the local surface.
    pub grid_resolution: usize,
    /// Nearest points averaged per grid node.
    pub neighbors: usize,
    /// Residual rejection threshold in standard deviations.
    pub residual_sigma: f64,
    /// Global elevation rejection threshold in standard deviations.
    pub global_sigma: f64,
    /// Point budget of the cleaned cloud.
    pub target_points: usize,
    pub algorithm: CleaningAlgorithm,
    pub stopping: StoppingPolicy,
    /// Seed for downsampling, `None` for a fresh random seed per run.
    pub seed: Option<u64>,
    /// Run only the local surface filter: no global rejection and no point
    /// budget.
    pub local_only: bool,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            grid_resolution: 100,
            neighbors: 10,
            residual_sigma: 2.0,
            global_sigma: 3.0,
            target_points: 5_000_000,
            algorithm: CleaningAlgorithm::default(),
            stopping: StoppingPolicy::default(),
            seed: None,
            local_only: false,
        }
    }
}

impl FilterConfig {
    pub fn validate(&self) -> Result<(), FilterError> {
        if self.grid_resolution == 0 {
            return Err(invalid("grid resolution must be positive"));
        }
        if self.neighbors == 0 {
            return Err(invalid("neighbor count must be positive"));
        }
        if self.target_points == 0 {
            return Err(invalid("target point count must be positive"));
        }
        if !self.residual_sigma.is_finite() || self.residual_sigma < 0.0 {
            return Err(invalid("residual sigma multiplier must be non-negative"));
        }
        if !self.global_sigma.is_finite() || self.global_sigma <= 0.0 {
            return Err(invalid("global sigma threshold must be positive"));
        }
        match self.stopping {
            StoppingPolicy::MaxIterations(0)
            | StoppingPolicy::RemovedFractionBelow {
                max_iterations: 0, ..
            } => return Err(invalid("iteration bound must be positive")),
            StoppingPolicy::RemovedFractionBelow { ratio, .. }
                if !(0.0..=1.0).contains(&ratio) =>
            {
                return Err(invalid("removed-fraction ratio must lie in [0, 1]"))
            }
            _ => {}
        }
        Ok(())
    }
}

fn invalid(message: &str) -> FilterError {
    FilterError::InvalidConfig(message.to_string())
}
