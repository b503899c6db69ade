//! Uniform sampling grid and per-node elevation estimates.

use rayon::prelude::*;

use pcd_core::pointcloud::point::{BoundingBox, PointCloud};

use crate::{
    cancel::CancellationToken, error::FilterError, error::FilterWarning,
    spatial_index::SpatialIndex, stats,
};

/// An M x M lattice spanning a bounding box, edges included.
///
/// Node `(row, col)` sits at `(xs[col], ys[row])`; nodes are stored row by
/// row.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    pub xs: Vec<f64>,
    pub ys: Vec<f64>,
}

impl Grid {
    pub fn new(bbox: &BoundingBox, resolution: usize) -> Self {
        Self {
            xs: linspace(bbox.xmin, bbox.xmax, resolution),
            ys: linspace(bbox.ymin, bbox.ymax, resolution),
        }
    }

    pub fn resolution(&self) -> usize {
        self.xs.len()
    }

    pub fn node_count(&self) -> usize {
        self.xs.len() * self.ys.len()
    }

    pub fn node(&self, row: usize, col: usize) -> [f64; 2] {
        [self.xs[col], self.ys[row]]
    }

    pub fn nodes(&self) -> impl Iterator<Item = [f64; 2]> + '_ {
        self.ys
            .iter()
            .flat_map(move |&y| self.xs.iter().map(move |&x| [x, y]))
    }
}

/// `n` evenly spaced values from `start` to `end`, both included.
///
/// A single sample is `start`. The last sample is pinned to `end` so that
/// rounding never places a node outside the box.
fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as f64;
            (0..n)
                .map(|i| {
                    if i == n - 1 {
                        end
                    } else {
                        (start + step * i as f64).min(end)
                    }
                })
                .collect()
        }
    }
}

/// Estimated elevation at every node of a grid.
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceEstimate {
    pub grid: Grid,
    /// Row-major, one value per node.
    pub elevations: Vec<f64>,
}

impl SurfaceEstimate {
    pub fn elevation(&self, row: usize, col: usize) -> f64 {
        self.elevations[row * self.grid.resolution() + col]
    }
}

/// Averages the elevations of the nearest points around each grid node.
#[derive(Debug, Clone, Copy)]
pub struct GridSurfaceEstimator {
    pub resolution: usize,
    pub neighbors: usize,
}

impl GridSurfaceEstimator {
    pub fn new(resolution: usize, neighbors: usize) -> Self {
        Self {
            resolution,
            neighbors,
        }
    }

    /// Builds the grid over the cloud's extent and estimates every node.
    ///
    /// Returns `Ok(None)` for an empty cloud. A neighbour count larger than
    /// the cloud is clamped and reported through `warnings`.
    pub fn estimate(
        &self,
        point_cloud: &PointCloud,
        token: &CancellationToken,
        warnings: &mut Vec<FilterWarning>,
    ) -> Result<Option<SurfaceEstimate>, FilterError> {
        let Some(bbox) = point_cloud.bounding_box() else {
            return Ok(None);
        };

        let k = if self.neighbors > point_cloud.len() {
            log::warn!(
                "neighbor count {} exceeds {} points, clamping",
                self.neighbors,
                point_cloud.len()
            );
            warnings.push(FilterWarning::NeighborsClamped {
                requested: self.neighbors,
                available: point_cloud.len(),
            });
            point_cloud.len()
        } else {
            self.neighbors
        };

        let grid = Grid::new(&bbox, self.resolution);
        let index = SpatialIndex::new(point_cloud);
        let m = grid.resolution();
        let mut elevations = vec![0.0; grid.node_count()];

        // each row owns a disjoint slice of the output
        elevations
            .par_chunks_mut(m.max(1))
            .enumerate()
            .try_for_each(|(row, out)| {
                token.check()?;
                let mut zs = Vec::with_capacity(k);
                for (col, slot) in out.iter_mut().enumerate() {
                    zs.clear();
                    zs.extend(
                        index
                            .nearest(grid.node(row, col), k)
                            .iter()
                            .map(|n| point_cloud.points[n.index].z),
                    );
                    *slot = stats::mean(&zs).unwrap_or(f64::NAN);
                }
                Ok::<(), FilterError>(())
            })?;

        log::debug!(
            "estimated {} grid nodes ({}x{}) from {} neighbors each",
            grid.node_count(),
            m,
            m,
            k
        );

        Ok(Some(SurfaceEstimate { grid, elevations }))
    }
}

#[cfg(test)]
mod tests {
    use pcd_core::pointcloud::point::Point;

    use super::*;

    #[test]
    fn linspace_includes_edges() {
        assert_eq!(linspace(0.0, 1.0, 5), vec![0.0, 0.25, 0.5, 0.75, 1.0]);
        assert_eq!(linspace(3.0, 9.0, 1), vec![3.0]);
        assert_eq!(linspace(2.0, 2.0, 3), vec![2.0, 2.0, 2.0]);
    }

    #[test]
    fn grid_nodes_inside_box() {
        let bbox = BoundingBox {
            xmin: 0.1,
            xmax: 0.7,
            ymin: -3.3,
            ymax: 1.9,
        };
        let grid = Grid::new(&bbox, 7);
        assert_eq!(grid.node_count(), 49);
        assert!(grid.nodes().all(|[x, y]| bbox.contains(x, y)));
        assert_eq!(grid.node(0, 0), [0.1, -3.3]);
        assert_eq!(grid.node(6, 6), [0.7, 1.9]);
    }

    #[test]
    fn single_node_grid_sits_at_min_corner() {
        let bbox = BoundingBox {
            xmin: 1.0,
            xmax: 4.0,
            ymin: 2.0,
            ymax: 8.0,
        };
        let grid = Grid::new(&bbox, 1);
        assert_eq!(grid.nodes().collect::<Vec<_>>(), vec![[1.0, 2.0]]);
    }

    #[test]
    fn node_elevation_is_neighbor_mean() {
        let points = vec![
            Point::new(0.0, 0.0, 1.0),
            Point::new(0.1, 0.0, 3.0),
            Point::new(10.0, 10.0, 100.0),
            Point::new(9.9, 10.0, 200.0),
        ];
        let pc = PointCloud::new(points);
        let mut warnings = Vec::new();
        let surface = GridSurfaceEstimator::new(2, 2)
            .estimate(&pc, &CancellationToken::new(), &mut warnings)
            .unwrap()
            .unwrap();

        assert_eq!(surface.elevation(0, 0), 2.0);
        assert_eq!(surface.elevation(1, 1), 150.0);
        assert!(warnings.is_empty());
    }

    #[test]
    fn neighbors_clamped_with_warning() {
        let pc = PointCloud::new(vec![
            Point::new(0.0, 0.0, 1.0),
            Point::new(1.0, 1.0, 2.0),
        ]);
        let mut warnings = Vec::new();
        let surface = GridSurfaceEstimator::new(3, 10)
            .estimate(&pc, &CancellationToken::new(), &mut warnings)
            .unwrap()
            .unwrap();

        assert!(surface.elevations.iter().all(|&z| z == 1.5));
        assert_eq!(
            warnings,
            vec![FilterWarning::NeighborsClamped {
                requested: 10,
                available: 2
            }]
        );
    }

    #[test]
    fn cancelled_before_start() {
        let pc = PointCloud::new(vec![Point::new(0.0, 0.0, 0.0)]);
        let token = CancellationToken::new();
        token.cancel();
        let result = GridSurfaceEstimator::new(4, 1).estimate(&pc, &token, &mut Vec::new());
        assert_eq!(result, Err(FilterError::Cancelled));
    }
}
