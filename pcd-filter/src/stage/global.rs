use pcd_core::pointcloud::point::PointCloud;

use super::{FilterStage, StageContext, StageKind};
use crate::{error::FilterError, sigma_clip::GlobalOutlierRejector};

pub struct GlobalRejectionStage {
    rejector: GlobalOutlierRejector,
}

impl GlobalRejectionStage {
    pub fn new(rejector: GlobalOutlierRejector) -> Self {
        Self { rejector }
    }
}

impl FilterStage for GlobalRejectionStage {
    fn kind(&self) -> StageKind {
        StageKind::GlobalRejection
    }

    fn apply(
        &self,
        point_cloud: PointCloud,
        ctx: &mut StageContext<'_>,
    ) -> Result<PointCloud, FilterError> {
        let outcome = self.rejector.apply(point_cloud, ctx.token)?;
        log::debug!(
            "global rejection removed {} points in {} passes (converged: {})",
            outcome.removed,
            outcome.iterations,
            outcome.converged
        );
        Ok(outcome.cloud)
    }
}
