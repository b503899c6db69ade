use std::time::{Duration, Instant};

use serde::Serialize;

use pcd_core::pointcloud::point::PointCloud;

use crate::{
    cancel::CancellationToken,
    config::FilterConfig,
    error::{FilterError, FilterWarning},
    grid::GridSurfaceEstimator,
    residual::ResidualFilter,
    sigma_clip::GlobalOutlierRejector,
    stage::{
        DownsampleStage, FilterStage, GlobalRejectionStage, LocalSurfaceStage, StageContext,
        StageKind,
    },
};

#[derive(Debug, Clone, Serialize)]
pub struct StageReport {
    pub stage: StageKind,
    pub points_before: usize,
    pub points_after: usize,
    pub elapsed: Duration,
}

impl StageReport {
    pub fn removed(&self) -> usize {
        self.points_before - self.points_after
    }
}

/// Receives progress while a pipeline runs.
pub trait PipelineObserver: Sync {
    fn stage_finished(&self, _report: &StageReport) {}
}

pub struct NoopObserver;

impl PipelineObserver for NoopObserver {}

#[derive(Debug, Clone)]
pub struct FilterReport {
    pub cloud: PointCloud,
    pub input_points: usize,
    pub stages: Vec<StageReport>,
    pub warnings: Vec<FilterWarning>,
}

impl FilterReport {
    pub fn removed(&self) -> usize {
        self.input_points - self.cloud.len()
    }

    /// The local surface could not predict a single point.
    pub fn lacks_prediction(&self) -> bool {
        self.warnings
            .iter()
            .any(|w| matches!(w, FilterWarning::NoValidPrediction { .. }))
    }
}

/// The full cleaning procedure for one cloud.
///
/// 1. downsample to twice the budget when above it,
/// 2. global elevation sigma clipping,
/// 3. local surface residual filtering,
/// 4. downsample to the budget when still above it.
///
/// The result may hold fewer points than the budget when the filters removed
/// enough of them.
pub struct FilterPipeline {
    stages: Vec<Box<dyn FilterStage>>,
}

impl FilterPipeline {
    pub fn new(stages: Vec<Box<dyn FilterStage>>) -> Self {
        Self { stages }
    }

    pub fn from_config(config: &FilterConfig) -> Result<Self, FilterError> {
        config.validate()?;

        let local = LocalSurfaceStage::new(
            GridSurfaceEstimator::new(config.grid_resolution, config.neighbors),
            ResidualFilter::new(config.residual_sigma),
        );
        if config.local_only {
            return Ok(Self::new(vec![Box::new(local)]));
        }
        config.algorithm.ensure_supported()?;

        let pre = DownsampleStage::new(
            StageKind::PreDownsample,
            config.target_points.saturating_mul(2),
            config.seed,
        );
        let global = GlobalRejectionStage::new(GlobalOutlierRejector::new(
            config.global_sigma,
            config.stopping,
        ));
        let last = DownsampleStage::new(
            StageKind::FinalDownsample,
            config.target_points,
            config.seed.map(|seed| seed.wrapping_add(1)),
        );

        Ok(Self::new(vec![
            Box::new(pre),
            Box::new(global),
            Box::new(local),
            Box::new(last),
        ]))
    }

    pub fn stages(&self) -> impl Iterator<Item = StageKind> + '_ {
        self.stages.iter().map(|stage| stage.kind())
    }

    pub fn run(
        &self,
        point_cloud: PointCloud,
        observer: &dyn PipelineObserver,
        token: &CancellationToken,
    ) -> Result<FilterReport, FilterError> {
        let input_points = point_cloud.len();
        let mut ctx = StageContext::new(token);
        let mut reports = Vec::with_capacity(self.stages.len());
        let mut current = point_cloud;

        for stage in &self.stages {
            token.check()?;
            let start = Instant::now();
            let points_before = current.len();
            current = stage.apply(current, &mut ctx)?;

            let report = StageReport {
                stage: stage.kind(),
                points_before,
                points_after: current.len(),
                elapsed: start.elapsed(),
            };
            log::debug!(
                "{:?}: {} -> {} points in {:?}",
                report.stage,
                report.points_before,
                report.points_after,
                report.elapsed
            );
            observer.stage_finished(&report);
            reports.push(report);
        }

        Ok(FilterReport {
            cloud: current,
            input_points,
            stages: reports,
            warnings: ctx.warnings,
        })
    }
}
