use serde::Serialize;

use crate::pointcloud::point::PointCloud;

/// Extent statistics shown when inspecting a file before cleaning.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CloudSummary {
    pub points: usize,
    pub dx: f64,
    pub dy: f64,
    pub dz: f64,
    /// Colour channel ranges, only when every point carries colour.
    pub color: Option<ColorExtent>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ColorExtent {
    pub dr: u16,
    pub dg: u16,
    pub db: u16,
}

impl CloudSummary {
    pub fn of(point_cloud: &PointCloud) -> Self {
        let Some(first) = point_cloud.points.first() else {
            return Self::default();
        };

        let mut min = [first.x, first.y, first.z];
        let mut max = min;
        for (x, y, z, _) in point_cloud.iter() {
            for (axis, value) in [x, y, z].into_iter().enumerate() {
                min[axis] = min[axis].min(value);
                max[axis] = max[axis].max(value);
            }
        }

        let color = first.color.and_then(|first_color| {
            let mut lo = [first_color.r, first_color.g, first_color.b];
            let mut hi = lo;
            for point in &point_cloud.points {
                let c = point.color?;
                for (channel, value) in [c.r, c.g, c.b].into_iter().enumerate() {
                    lo[channel] = lo[channel].min(value);
                    hi[channel] = hi[channel].max(value);
                }
            }
            Some(ColorExtent {
                dr: hi[0] - lo[0],
                dg: hi[1] - lo[1],
                db: hi[2] - lo[2],
            })
        });

        Self {
            points: point_cloud.len(),
            dx: max[0] - min[0],
            dy: max[1] - min[1],
            dz: max[2] - min[2],
            color,
        }
    }
}

/// Point-count statistics across a set of files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct BatchSummary {
    pub files: usize,
    pub average_points: f64,
    pub min_points: usize,
    pub max_points: usize,
}

impl BatchSummary {
    pub fn from_counts(counts: &[usize]) -> Option<Self> {
        let min_points = *counts.iter().min()?;
        let max_points = *counts.iter().max()?;
        let total: usize = counts.iter().sum();
        Some(Self {
            files: counts.len(),
            average_points: total as f64 / counts.len() as f64,
            min_points,
            max_points,
        })
    }
}
