use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde::Serialize;

use pcd_core::pointcloud::summary::{BatchSummary, CloudSummary};
use pcd_store::PointCloudStore;

#[derive(Debug, Clone, Serialize)]
pub struct FileSummary {
    pub path: PathBuf,
    #[serde(flatten)]
    pub summary: CloudSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileFailure {
    pub path: PathBuf,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AnalyzeReport {
    pub files: Vec<FileSummary>,
    pub failures: Vec<FileFailure>,
    pub batch: Option<BatchSummary>,
}

/// Reads every file and summarises its extent. Unreadable files are
/// recorded and do not stop the others.
pub fn analyze<S>(store: &S, files: &[PathBuf]) -> AnalyzeReport
where
    S: PointCloudStore + Sync,
{
    let results: Vec<_> = files
        .par_iter()
        .map(|path| {
            store
                .load(path)
                .map(|(point_cloud, _)| FileSummary {
                    path: path.clone(),
                    summary: CloudSummary::of(&point_cloud),
                })
                .map_err(|e| FileFailure {
                    path: path.clone(),
                    error: e.to_string(),
                })
        })
        .collect();

    let mut report = AnalyzeReport::default();
    for result in results {
        match result {
            Ok(summary) => report.files.push(summary),
            Err(failure) => {
                log::error!("{}", failure.error);
                report.failures.push(failure);
            }
        }
    }
    let counts: Vec<usize> = report.files.iter().map(|f| f.summary.points).collect();
    report.batch = BatchSummary::from_counts(&counts);
    report
}

pub fn log_table(report: &AnalyzeReport, root: &Path) {
    log::info!(
        "{:<40} {:>12} {:>12} {:>12} {:>10}",
        "file",
        "points",
        "dx",
        "dy",
        "dz"
    );
    for file in &report.files {
        let name = file.path.strip_prefix(root).unwrap_or(&file.path);
        let s = &file.summary;
        log::info!(
            "{:<40} {:>12} {:>12.3} {:>12.3} {:>10.3}",
            name.display(),
            s.points,
            s.dx,
            s.dy,
            s.dz
        );
        if let Some(c) = s.color {
            log::info!("{:<40} color range r {} g {} b {}", "", c.dr, c.dg, c.db);
        }
    }
    if let Some(batch) = report.batch {
        log::info!(
            "{} files, points average {:.1}, min {}, max {}",
            batch.files,
            batch.average_points,
            batch.min_points,
            batch.max_points
        );
    }
}
