use pcd_core::pointcloud::point::PointCloud;

use crate::stats;

/// Rejects points that sit too far from the predicted surface.
///
/// A point survives when `|z - z_pred| <= sigma_multiplier * sigma`, where
/// `sigma` is the population standard deviation of all residuals.
#[derive(Debug, Clone, Copy)]
pub struct ResidualFilter {
    pub sigma_multiplier: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResidualStats {
    pub mean: f64,
    pub sigma: f64,
    pub threshold: f64,
    pub rejected: usize,
}

impl ResidualStats {
    /// All residuals were equal, so the threshold collapsed to zero.
    pub fn is_degenerate(&self) -> bool {
        self.sigma == 0.0
    }
}

impl ResidualFilter {
    pub fn new(sigma_multiplier: f64) -> Self {
        Self { sigma_multiplier }
    }

    pub fn residuals(point_cloud: &PointCloud, predicted: &[f64]) -> Vec<f64> {
        assert_eq!(
            predicted.len(),
            point_cloud.len(),
            "one prediction per point is required"
        );
        point_cloud
            .elevations()
            .zip(predicted)
            .map(|(z, z_pred)| (z - z_pred).abs())
            .collect()
    }

    /// Selection mask over the cloud plus the statistics that produced it.
    ///
    /// With zero spread the threshold is exactly zero: only points whose
    /// residual is exactly zero are kept.
    pub fn mask(&self, point_cloud: &PointCloud, predicted: &[f64]) -> (Vec<bool>, ResidualStats) {
        let residuals = Self::residuals(point_cloud, predicted);
        let mean = stats::mean(&residuals).unwrap_or(0.0);
        let sigma = stats::population_std(&residuals).unwrap_or(0.0);
        let threshold = self.sigma_multiplier * sigma;

        let mask: Vec<bool> = residuals.iter().map(|&r| r <= threshold).collect();
        let rejected = mask.iter().filter(|keep| !**keep).count();

        (
            mask,
            ResidualStats {
                mean,
                sigma,
                threshold,
                rejected,
            },
        )
    }

    pub fn apply(&self, point_cloud: PointCloud, predicted: &[f64]) -> (PointCloud, ResidualStats) {
        let (mask, stats) = self.mask(&point_cloud, predicted);
        (point_cloud.select(&mask), stats)
    }
}

#[cfg(test)]
mod tests {
    use pcd_core::pointcloud::point::Point;

    use super::*;

    fn cloud(zs: &[f64]) -> PointCloud {
        zs.iter()
            .enumerate()
            .map(|(i, &z)| Point::new(i as f64, 0.0, z))
            .collect::<Vec<_>>()
            .into()
    }

    #[test]
    fn rejects_large_residual() {
        let mut zs = vec![0.0; 20];
        zs[7] = 10.0;
        let pc = cloud(&zs);
        let predicted = vec![0.0; 20];

        let (out, stats) = ResidualFilter::new(2.0).apply(pc, &predicted);

        assert_eq!(out.len(), 19);
        assert!(out.elevations().all(|z| z == 0.0));
        assert_eq!(stats.rejected, 1);
        assert!(!stats.is_degenerate());
    }

    #[test]
    fn zero_multiplier_keeps_exact_matches_only() {
        let pc = cloud(&[1.0, 2.0, 3.0, 4.0]);
        let predicted = [1.0, 2.5, 3.0, 3.0];

        let (mask, _) = ResidualFilter::new(0.0).mask(&pc, &predicted);

        assert_eq!(mask, vec![true, false, true, false]);
    }

    #[test]
    fn identical_nonzero_residuals_reject_everything() {
        let pc = cloud(&[1.0, 2.0, 3.0]);
        let predicted = [0.5, 1.5, 2.5];

        let (mask, stats) = ResidualFilter::new(2.0).mask(&pc, &predicted);

        assert!(stats.is_degenerate());
        assert_eq!(stats.threshold, 0.0);
        assert_eq!(stats.mean, 0.5);
        assert_eq!(mask, vec![false, false, false]);
    }

    #[test]
    fn fallback_points_always_survive() {
        // the last point has no prediction, so it was given its own elevation
        let pc = cloud(&[0.0, 0.1, -0.1, 0.05, 1000.0]);
        let predicted = [0.0, 0.0, 0.0, 0.0, 1000.0];

        for sigma in [0.0, 0.5, 2.0] {
            let (mask, _) = ResidualFilter::new(sigma).mask(&pc, &predicted);
            assert!(mask[4]);
        }
    }
}
