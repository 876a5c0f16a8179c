use std::io;

use thiserror::Error;

use crate::types::{CanonicalHeader, DatasetLabel, RawHeader};

/// Error type for table loading, schema validation, and output failures.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(
        "dataset '{dataset}' is missing required columns {missing:?}; available columns: {available:?}"
    )]
    MissingColumns {
        dataset: DatasetLabel,
        missing: Vec<CanonicalHeader>,
        available: Vec<CanonicalHeader>,
    },
    #[error(
        "distinct headers {raw:?} normalize to the same canonical name '{canonical}'"
    )]
    HeaderCollision {
        canonical: CanonicalHeader,
        raw: Vec<RawHeader>,
    },
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("configuration error: {0}")]
    Configuration(String),
}
