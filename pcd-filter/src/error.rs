use serde::Serialize;
use thiserror::Error;

use crate::config::CleaningAlgorithm;

/// Conditions that abort cleaning of a single cloud.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FilterError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("cleaning algorithm {0:?} is not implemented")]
    UnsupportedAlgorithm(CleaningAlgorithm),

    #[error("filtering was cancelled")]
    Cancelled,
}

/// Degeneracies that were recovered from locally.
///
/// They never stop the pipeline but are reported with its result.
#[derive(Debug, Error, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FilterWarning {
    /// Fewer points than the requested neighbour count; the query was clamped.
    #[error("neighbor count {requested} clamped to the {available} available points")]
    NeighborsClamped { requested: usize, available: usize },

    /// The planar points are collinear or the grid has a single node, so no
    /// surface can be triangulated.
    #[error("degenerate geometry ({detail}), local surface unavailable")]
    DegenerateGeometry { detail: String },

    /// The interpolated surface was undefined for every point and local
    /// filtering passed the cloud through unchanged.
    #[error("no valid surface prediction for any of {points} points, local filtering skipped")]
    NoValidPrediction { points: usize },

    /// All residuals were identical, so the rejection threshold collapsed to
    /// zero and only exactly-zero residuals were kept.
    #[error("all residuals equal {residual}, zero threshold rejected {rejected} points")]
    DegenerateResiduals { residual: f64, rejected: usize },
}
