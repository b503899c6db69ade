use serde::Serialize;

use pcd_core::pointcloud::point::PointCloud;

use crate::{cancel::CancellationToken, error::FilterError, error::FilterWarning};

pub mod downsample;
pub mod global;
pub mod local;

pub use downsample::DownsampleStage;
pub use global::GlobalRejectionStage;
pub use local::LocalSurfaceStage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    PreDownsample,
    GlobalRejection,
    LocalFiltering,
    FinalDownsample,
}

/// Per-run state shared by the stages of one pipeline run.
pub struct StageContext<'a> {
    pub token: &'a CancellationToken,
    pub warnings: Vec<FilterWarning>,
}

impl<'a> StageContext<'a> {
    pub fn new(token: &'a CancellationToken) -> Self {
        Self {
            token,
            warnings: Vec::new(),
        }
    }

    pub fn warn(&mut self, warning: FilterWarning) {
        log::warn!("{}", warning);
        self.warnings.push(warning);
    }
}

/// One step of the cleaning pipeline.
///
/// A stage consumes a cloud and returns a subset of it.
pub trait FilterStage: Send + Sync {
    fn kind(&self) -> StageKind;

    fn apply(
        &self,
        point_cloud: PointCloud,
        ctx: &mut StageContext<'_>,
    ) -> Result<PointCloud, FilterError>;
}
