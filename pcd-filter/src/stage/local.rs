use pcd_core::pointcloud::point::PointCloud;

use super::{FilterStage, StageContext, StageKind};
use crate::{
    error::{FilterError, FilterWarning},
    grid::GridSurfaceEstimator,
    interpolation::SurfaceInterpolator,
    residual::ResidualFilter,
};

/// Grid estimate, interpolated surface, then residual rejection.
pub struct LocalSurfaceStage {
    estimator: GridSurfaceEstimator,
    residual: ResidualFilter,
}

impl LocalSurfaceStage {
    pub fn new(estimator: GridSurfaceEstimator, residual: ResidualFilter) -> Self {
        Self {
            estimator,
            residual,
        }
    }
}

impl FilterStage for LocalSurfaceStage {
    fn kind(&self) -> StageKind {
        StageKind::LocalFiltering
    }

    fn apply(
        &self,
        point_cloud: PointCloud,
        ctx: &mut StageContext<'_>,
    ) -> Result<PointCloud, FilterError> {
        if point_cloud.is_empty() {
            return Ok(point_cloud);
        }

        if let Some(detail) = collinear_support(&point_cloud) {
            ctx.warn(FilterWarning::DegenerateGeometry { detail });
            ctx.warn(FilterWarning::NoValidPrediction {
                points: point_cloud.len(),
            });
            return Ok(point_cloud);
        }

        let Some(surface) = self
            .estimator
            .estimate(&point_cloud, ctx.token, &mut ctx.warnings)?
        else {
            return Ok(point_cloud);
        };

        let interpolator = SurfaceInterpolator::new(surface);
        if interpolator.triangle_count() == 0 {
            ctx.warn(FilterWarning::DegenerateGeometry {
                detail: format!(
                    "{} grid nodes per axis cannot be triangulated",
                    self.estimator.resolution
                ),
            });
        }

        ctx.token.check()?;
        let predictions = interpolator.predict_or_observed(&point_cloud);
        if predictions.defined == 0 {
            // every residual would be zero
            ctx.warn(FilterWarning::NoValidPrediction {
                points: point_cloud.len(),
            });
            return Ok(point_cloud);
        }
        log::debug!(
            "surface predicted {} of {} points",
            predictions.defined,
            point_cloud.len()
        );

        let (filtered, stats) = self.residual.apply(point_cloud, &predictions.values);
        if stats.is_degenerate() && stats.rejected > 0 {
            ctx.warn(FilterWarning::DegenerateResiduals {
                residual: stats.mean,
                rejected: stats.rejected,
            });
        }
        log::debug!(
            "residual sigma {:.4}, threshold {:.4}, rejected {}",
            stats.sigma,
            stats.threshold,
            stats.rejected
        );

        Ok(filtered)
    }
}

/// Describes why the planar support cannot carry a surface, if it cannot.
///
/// Points that all lie on one line (including a single location) give no
/// triangle with positive area, so no local prediction is possible.
fn collinear_support(point_cloud: &PointCloud) -> Option<String> {
    let origin = point_cloud.points.first()?.planar();
    let offset = |xy: [f64; 2]| [xy[0] - origin[0], xy[1] - origin[1]];

    let far = point_cloud
        .points
        .iter()
        .map(|p| offset(p.planar()))
        .max_by(|a, b| norm2(*a).total_cmp(&norm2(*b)))?;
    let length = norm2(far).sqrt();
    if length == 0.0 {
        return Some(format!(
            "all {} points share one planar location",
            point_cloud.len()
        ));
    }

    let tolerance = length * 1e-9;
    let spread = point_cloud
        .points
        .iter()
        .map(|p| {
            let d = offset(p.planar());
            (far[0] * d[1] - far[1] * d[0]).abs() / length
        })
        .fold(0.0_f64, f64::max);

    (spread <= tolerance).then(|| format!("all {} points are collinear", point_cloud.len()))
}

fn norm2(v: [f64; 2]) -> f64 {
    v[0] * v[0] + v[1] * v[1]
}
