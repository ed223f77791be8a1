use thiserror::Error;

/// Errors surfaced to callers of the ingestion pipeline.
///
/// Per-day read problems never show up here; they are carried as
/// [`crate::source::DayOutcome::Failed`] instead.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Unknown station: {0}")]
    UnknownStation(String),
    #[error("Invalid processing level: {0}")]
    InvalidLevel(i64),
    #[error("Invalid data type: {0:?}")]
    InvalidDataType(String),
    #[error("Invalid date range: {0}")]
    InvalidDateRange(String),
    #[error("Schema error: {0}")]
    Schema(String),
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Worker pool error: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}

impl Error {
    /// True for errors raised while validating inputs, before any I/O.
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            Error::UnknownStation(_)
                | Error::InvalidLevel(_)
                | Error::InvalidDataType(_)
                | Error::InvalidDateRange(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
