//! Error types for the preprocessing pipeline.
//!
//! Every failure is raised at the point of detection; a failed batch never
//! produces a partial result.

use polars::prelude::PolarsError;
use thiserror::Error;

/// Errors raised by the feature selector, the category aggregator and the
/// persistence layer.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A configured feature is absent from the input batch.
    #[error("Required column '{column}' not found in input batch")]
    MissingColumn { column: String },

    /// A cell could not be cast to the declared semantic type.
    #[error("Cannot convert value '{value}' in column '{column}' (row {row}) to {target}")]
    TypeCoercion {
        column: String,
        row: usize,
        value: String,
        target: &'static str,
    },

    /// An aggregated column is not among the selected features.
    #[error("Aggregated column '{column}' is not a selected feature")]
    UnselectedColumn { column: String },

    /// `transform` was called before `fit`.
    #[error("{component} is not fitted yet. Call fit() before transform()")]
    NotFitted { component: &'static str },

    /// `fit` was called on a column without rows.
    #[error("Column '{column}' has no rows to fit on")]
    EmptyColumn { column: String },

    /// The aggregation threshold is outside (0, 1].
    #[error("Threshold must be in (0, 1], got {threshold}")]
    InvalidThreshold { threshold: f64 },

    /// A category has no frequency recorded at fit time and the
    /// configured policy refuses to substitute one.
    #[error("No frequency recorded for category '{category}' in column '{column}'")]
    UnknownFrequency { column: String, category: String },

    /// A persisted pipeline could not be interpreted.
    #[error("Invalid persisted pipeline: {0}")]
    Persistence(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Polars(#[from] PolarsError),
}

/// Result alias used across the pipeline module.
pub type Result<T> = std::result::Result<T, PipelineError>;
