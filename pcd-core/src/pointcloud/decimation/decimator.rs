use rand::{rngs::StdRng, seq::index, SeedableRng};

use crate::pointcloud::point::PointCloud;

pub trait PointCloudDecimator {
    fn decimate(&self, point_cloud: PointCloud) -> PointCloud;
}

/// Uniform random subsampling down to a fixed point budget.
///
/// Clouds already within budget are returned untouched. Otherwise exactly
/// `target` distinct points are drawn without replacement; survivors keep
/// their relative order.
#[derive(Debug, Clone, Copy)]
pub struct RandomDecimator {
    pub target: usize,
    /// Fixed seed for reproducible runs, `None` draws one from the OS.
    pub seed: Option<u64>,
}

impl RandomDecimator {
    pub fn new(target: usize, seed: Option<u64>) -> Self {
        Self { target, seed }
    }

    fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        }
    }

    /// Sorted indices of the points to keep.
    pub fn sample_indices(&self, len: usize) -> Vec<usize> {
        if len <= self.target {
            return (0..len).collect();
        }
        let mut rng = self.rng();
        let mut indices = index::sample(&mut rng, len, self.target).into_vec();
        indices.sort_unstable();
        indices
    }
}

impl PointCloudDecimator for RandomDecimator {
    fn decimate(&self, point_cloud: PointCloud) -> PointCloud {
        if point_cloud.len() <= self.target {
            return point_cloud;
        }

        let before = point_cloud.len();
        let indices = self.sample_indices(before);
        let decimated = point_cloud.take_indices(&indices);
        log::debug!("downsampled {} -> {} points", before, decimated.len());

        decimated
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::pointcloud::point::Point;

    fn numbered_cloud(n: usize) -> PointCloud {
        (0..n)
            .map(|i| {
                let mut p = Point::new(i as f64, 0.0, i as f64 * 0.5);
                p.attributes.point_source_id = i as u16;
                p
            })
            .collect::<Vec<_>>()
            .into()
    }

    #[test]
    fn within_budget_is_identity() {
        let pc = numbered_cloud(10);
        let out = RandomDecimator::new(10, Some(1)).decimate(pc.clone());
        assert_eq!(out, pc);

        let out = RandomDecimator::new(50, None).decimate(pc.clone());
        assert_eq!(out, pc);
    }

    #[test]
    fn exact_count_no_duplicates() {
        let pc = numbered_cloud(1000);
        let out = RandomDecimator::new(137, Some(7)).decimate(pc);

        assert_eq!(out.len(), 137);
        let ids: HashSet<u16> = out
            .points
            .iter()
            .map(|p| p.attributes.point_source_id)
            .collect();
        assert_eq!(ids.len(), 137);
        for p in &out.points {
            // attributes still belong to their own coordinates
            assert_eq!(p.x, p.attributes.point_source_id as f64);
        }
        assert!(out.points.windows(2).all(|w| w[0].x < w[1].x));
    }

    #[test]
    fn fixed_seed_is_reproducible() {
        let a = RandomDecimator::new(20, Some(99)).decimate(numbered_cloud(500));
        let b = RandomDecimator::new(20, Some(99)).decimate(numbered_cloud(500));
        assert_eq!(a, b);
    }

    #[test]
    fn zero_target_empties_cloud() {
        let out = RandomDecimator::new(0, Some(3)).decimate(numbered_cloud(5));
        assert!(out.is_empty());
    }
}
