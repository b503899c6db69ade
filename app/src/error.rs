use std::path::PathBuf;

use thiserror::Error;

use pcd_filter::FilterError;
use pcd_store::StoreError;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error("invalid glob pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error(transparent)]
    Glob(#[from] glob::GlobError),

    #[error("failed to serialize report: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("{} is not inside {}", file.display(), root.display())]
    OutsideInput { file: PathBuf, root: PathBuf },

    #[error("no LAS/LAZ files found under {}", .0.display())]
    NoInput(PathBuf),
}
