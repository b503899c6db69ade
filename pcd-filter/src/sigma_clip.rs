use pcd_core::pointcloud::point::PointCloud;

use crate::{cancel::CancellationToken, config::StoppingPolicy, error::FilterError, stats};

/// Iterative sigma clipping over raw elevations.
///
/// Each pass keeps the points inside `[mu - k*sigma, mu + k*sigma]` of the
/// current survivors. Passes repeat until nothing more is removed or the
/// stopping policy ends the loop.
#[derive(Debug, Clone, Copy)]
pub struct GlobalOutlierRejector {
    pub sigma_threshold: f64,
    pub stopping: StoppingPolicy,
}

#[derive(Debug, Clone)]
pub struct SigmaClipOutcome {
    pub cloud: PointCloud,
    pub removed: usize,
    /// Passes that removed at least one point.
    pub iterations: usize,
    pub converged: bool,
}

impl GlobalOutlierRejector {
    pub fn new(sigma_threshold: f64, stopping: StoppingPolicy) -> Self {
        Self {
            sigma_threshold,
            stopping,
        }
    }

    pub fn apply(
        &self,
        point_cloud: PointCloud,
        token: &CancellationToken,
    ) -> Result<SigmaClipOutcome, FilterError> {
        let original = point_cloud.len();
        let mut current = point_cloud;
        let mut iterations = 0;
        let mut converged = false;

        while iterations < self.stopping.max_iterations() {
            token.check()?;

            let zs: Vec<f64> = current.elevations().collect();
            let (Some(mu), Some(sigma)) = (stats::mean(&zs), stats::population_std(&zs)) else {
                converged = true;
                break;
            };
            // identical elevations: nothing is an outlier
            if sigma == 0.0 {
                converged = true;
                break;
            }

            let lower = mu - self.sigma_threshold * sigma;
            let upper = mu + self.sigma_threshold * sigma;
            let mask: Vec<bool> = zs.iter().map(|&z| z >= lower && z <= upper).collect();
            let kept = mask.iter().filter(|keep| **keep).count();
            if kept == zs.len() {
                converged = true;
                break;
            }

            let before = current.len();
            current = current.select(&mask);
            iterations += 1;
            log::debug!(
                "sigma clip pass {}: [{:.3}, {:.3}] kept {} of {}",
                iterations,
                lower,
                upper,
                kept,
                before
            );

            if let StoppingPolicy::RemovedFractionBelow { ratio, .. } = self.stopping {
                let removed_fraction = (before - kept) as f64 / before as f64;
                if removed_fraction < ratio {
                    break;
                }
            }
        }

        Ok(SigmaClipOutcome {
            removed: original - current.len(),
            cloud: current,
            iterations,
            converged,
        })
    }
}
