use pcd_core::pointcloud::{
    decimation::decimator::{PointCloudDecimator, RandomDecimator},
    point::PointCloud,
};

use super::{FilterStage, StageContext, StageKind};
use crate::error::FilterError;

/// Random subsampling to a point budget, skipped when already within it.
pub struct DownsampleStage {
    kind: StageKind,
    decimator: RandomDecimator,
}

impl DownsampleStage {
    pub fn new(kind: StageKind, target: usize, seed: Option<u64>) -> Self {
        Self {
            kind,
            decimator: RandomDecimator::new(target, seed),
        }
    }
}

impl FilterStage for DownsampleStage {
    fn kind(&self) -> StageKind {
        self.kind
    }

    fn apply(
        &self,
        point_cloud: PointCloud,
        ctx: &mut StageContext<'_>,
    ) -> Result<PointCloud, FilterError> {
        ctx.token.check()?;
        Ok(self.decimator.decimate(point_cloud))
    }
}
