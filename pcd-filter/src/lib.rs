//! Elevation outlier filtering for LiDAR point clouds.
//!
//! Points are rejected when their elevation is anomalous against the whole
//! cloud (iterative sigma clipping) or against a locally estimated surface
//! (grid of neighbour means, linearly interpolated). Random downsampling
//! keeps the cloud within a point budget.

pub mod cancel;
pub mod config;
pub mod error;
pub mod grid;
pub mod interpolation;
pub mod pipeline;
pub mod residual;
pub mod sigma_clip;
pub mod spatial_index;
pub mod stage;
pub mod stats;

pub use cancel::CancellationToken;
pub use config::{CleaningAlgorithm, FilterConfig, StoppingPolicy};
pub use error::{FilterError, FilterWarning};
pub use pipeline::{FilterPipeline, FilterReport, NoopObserver, PipelineObserver, StageReport};
