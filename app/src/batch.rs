use std::{
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

use crossbeam::channel::{self, Sender};
use rayon::prelude::*;
use serde::Serialize;

use pcd_filter::{
    CancellationToken, FilterConfig, FilterPipeline, FilterWarning, PipelineObserver, StageReport,
};
use pcd_store::PointCloudStore;

use crate::{discover::mirror_path, error::CliError};

pub struct BatchJob<'a> {
    pub input_root: &'a Path,
    pub output_root: &'a Path,
    pub files: &'a [PathBuf],
    pub config: &'a FilterConfig,
    pub jobs: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileStatus {
    Cleaned {
        input_points: usize,
        output_points: usize,
        stages: Vec<StageReport>,
        warnings: Vec<FilterWarning>,
    },
    /// The local surface predicted nothing, so no output was written.
    Skipped {
        input_points: usize,
        warnings: Vec<FilterWarning>,
    },
    Failed {
        error: String,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct FileOutcome {
    pub input: PathBuf,
    pub output: Option<PathBuf>,
    pub elapsed: Duration,
    #[serde(flatten)]
    pub status: FileStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub files: Vec<FileOutcome>,
    pub elapsed: Duration,
}

impl BatchReport {
    pub fn failed(&self) -> usize {
        self.files
            .iter()
            .filter(|f| matches!(f.status, FileStatus::Failed { .. }))
            .count()
    }
}

/// Messages from workers to the thread that reports progress.
#[derive(Debug)]
pub enum BatchEvent {
    StageFinished { index: usize, report: StageReport },
    FileFinished { index: usize, outcome: FileOutcome },
}

struct ChannelObserver<'a> {
    index: usize,
    sender: &'a Sender<BatchEvent>,
}

impl PipelineObserver for ChannelObserver<'_> {
    fn stage_finished(&self, report: &StageReport) {
        let _ = self.sender.send(BatchEvent::StageFinished {
            index: self.index,
            report: report.clone(),
        });
    }
}

/// Cleans every file of the job on a dedicated worker pool.
///
/// Per-file failures end up in the report; only a pool that cannot be
/// built fails the whole batch.
pub fn run_batch<S>(
    store: &S,
    job: &BatchJob<'_>,
    token: &CancellationToken,
) -> Result<BatchReport, CliError>
where
    S: PointCloudStore + Sync,
{
    let start = Instant::now();
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(job.jobs)
        .thread_name(|idx| format!("cleaner-{}", idx))
        .build()?;
    let pipeline = FilterPipeline::from_config(job.config);
    let total = job.files.len();

    let (sender, receiver) = channel::unbounded();
    let mut outcomes: Vec<Option<FileOutcome>> = vec![None; total];

    std::thread::scope(|scope| {
        scope.spawn(|| {
            pool.install(|| {
                job.files
                    .par_iter()
                    .enumerate()
                    .for_each_with(sender, |sender, (index, input)| {
                        let observer = ChannelObserver { index, sender };
                        let file_start = Instant::now();
                        let output = mirror_path(job.input_root, input, job.output_root);

                        let status = match &output {
                            Ok(output) => clean_file(store, &pipeline, input, output, &observer, token),
                            Err(e) => Err(e.to_string()),
                        };
                        let status = status.unwrap_or_else(|error| FileStatus::Failed { error });
                        let written = matches!(status, FileStatus::Cleaned { .. });

                        let outcome = FileOutcome {
                            input: input.clone(),
                            output: output.ok().filter(|_| written),
                            elapsed: file_start.elapsed(),
                            status,
                        };
                        let _ = sender.send(BatchEvent::FileFinished { index, outcome });
                    });
            });
        });

        let mut finished = 0;
        for event in receiver.iter() {
            match event {
                BatchEvent::StageFinished { index, report } => {
                    log::debug!(
                        "{:?} {:?}: {} -> {} points in {:?}",
                        job.files[index],
                        report.stage,
                        report.points_before,
                        report.points_after,
                        report.elapsed
                    );
                }
                BatchEvent::FileFinished { index, outcome } => {
                    finished += 1;
                    log::info!("Processing: {} of {} files", finished, total);
                    log_outcome(&outcome);
                    outcomes[index] = Some(outcome);
                }
            }
        }
    });

    Ok(BatchReport {
        files: outcomes.into_iter().flatten().collect(),
        elapsed: start.elapsed(),
    })
}

fn clean_file<S: PointCloudStore>(
    store: &S,
    pipeline: &Result<FilterPipeline, pcd_filter::FilterError>,
    input: &Path,
    output: &Path,
    observer: &dyn PipelineObserver,
    token: &CancellationToken,
) -> Result<FileStatus, String> {
    let pipeline = pipeline.as_ref().map_err(|e| e.to_string())?;
    token.check().map_err(|e| e.to_string())?;

    let (point_cloud, schema) = store.load(input).map_err(|e| e.to_string())?;
    let report = pipeline
        .run(point_cloud, observer, token)
        .map_err(|e| e.to_string())?;

    if report.lacks_prediction() {
        return Ok(FileStatus::Skipped {
            input_points: report.input_points,
            warnings: report.warnings,
        });
    }

    store
        .write(output, &report.cloud, &schema)
        .map_err(|e| e.to_string())?;

    Ok(FileStatus::Cleaned {
        input_points: report.input_points,
        output_points: report.cloud.len(),
        stages: report.stages,
        warnings: report.warnings,
    })
}

fn log_outcome(outcome: &FileOutcome) {
    match &outcome.status {
        FileStatus::Cleaned {
            input_points,
            output_points,
            ..
        } => log::info!(
            "{:?}: {} -> {} points ({} removed) in {:?}",
            outcome.input,
            input_points,
            output_points,
            input_points - output_points,
            outcome.elapsed
        ),
        FileStatus::Skipped { input_points, .. } => log::warn!(
            "{:?}: no surface prediction for any of {} points, not written",
            outcome.input,
            input_points
        ),
        FileStatus::Failed { error } => log::error!("{:?}: {}", outcome.input, error),
    }
}
