//! Piecewise-linear surface through the grid node estimates.

use rayon::prelude::*;

use pcd_core::pointcloud::point::PointCloud;

use crate::grid::SurfaceEstimate;

/// Linear interpolation over a triangulation of the grid nodes.
///
/// Every lattice cell with positive area is split into two triangles along
/// its lower-left to upper-right diagonal. Together they tile the convex hull
/// of the nodes, which is the grid's bounding rectangle. Outside it, or when
/// the nodes are collinear, there is no prediction.
#[derive(Debug, Clone)]
pub struct SurfaceInterpolator {
    surface: SurfaceEstimate,
    triangulated: bool,
}

/// Predicted elevation for every point of a cloud.
#[derive(Debug, Clone, PartialEq)]
pub struct Predictions {
    pub values: Vec<f64>,
    /// How many points had a defined interpolated value.
    pub defined: usize,
}

impl SurfaceInterpolator {
    pub fn new(surface: SurfaceEstimate) -> Self {
        let grid = &surface.grid;
        let triangulated = grid.resolution() >= 2
            && grid.xs.windows(2).all(|w| w[1] > w[0])
            && grid.ys.windows(2).all(|w| w[1] > w[0]);
        Self {
            surface,
            triangulated,
        }
    }

    pub fn triangle_count(&self) -> usize {
        if self.triangulated {
            let cells = self.surface.grid.resolution() - 1;
            2 * cells * cells
        } else {
            0
        }
    }

    /// Interpolated elevation at `(x, y)`, `None` outside the convex hull.
    pub fn predict(&self, x: f64, y: f64) -> Option<f64> {
        if !self.triangulated {
            return None;
        }
        let grid = &self.surface.grid;
        let col = locate(&grid.xs, x)?;
        let row = locate(&grid.ys, y)?;

        let u = unit_offset(grid.xs[col], grid.xs[col + 1], x);
        let v = unit_offset(grid.ys[row], grid.ys[row + 1], y);

        let z00 = self.surface.elevation(row, col);
        let z10 = self.surface.elevation(row, col + 1);
        let z01 = self.surface.elevation(row + 1, col);
        let z11 = self.surface.elevation(row + 1, col + 1);

        // written as offsets from a corner so a flat patch stays exactly flat
        let z = if v <= u {
            z00 + u * (z10 - z00) + v * (z11 - z10)
        } else {
            z00 + v * (z01 - z00) + u * (z11 - z01)
        };
        Some(z)
    }

    /// Predicted elevation for every point, falling back to the point's own
    /// elevation wherever the interpolant is undefined.
    ///
    /// Such points end up with a zero residual and are never rejected by the
    /// residual filter.
    pub fn predict_or_observed(&self, point_cloud: &PointCloud) -> Predictions {
        let predicted: Vec<Option<f64>> = point_cloud
            .points
            .par_iter()
            .map(|p| self.predict(p.x, p.y))
            .collect();

        let defined = predicted.iter().filter(|z| z.is_some()).count();
        let values = predicted
            .into_iter()
            .zip(&point_cloud.points)
            .map(|(z, p)| z.unwrap_or(p.z))
            .collect();

        Predictions { values, defined }
    }
}

/// Index `i` of the interval `[axis[i], axis[i + 1]]` holding `value`.
fn locate(axis: &[f64], value: f64) -> Option<usize> {
    let first = *axis.first()?;
    let last = *axis.last()?;
    if !(value >= first && value <= last) {
        return None;
    }
    // first node strictly greater than value, then step back one interval
    let upper = axis.partition_point(|&node| node <= value);
    Some(upper.saturating_sub(1).min(axis.len() - 2))
}

fn unit_offset(lo: f64, hi: f64, value: f64) -> f64 {
    ((value - lo) / (hi - lo)).clamp(0.0, 1.0)
}
