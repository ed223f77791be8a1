//! Per-day source file loading
//!
//! A missing file is an expected condition (instruments go offline) and a
//! broken one must not take the rest of the range down with it, so [`load`]
//! never returns an error: it folds everything into a [`DayOutcome`].

use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{ArrayRef, TimestampNanosecondArray};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::NaiveDate;

use crate::error::{Error, Result};

mod cf_time;
mod ipc;
#[cfg(feature = "netcdf")]
mod netcdf_reader;

#[cfg(test)]
mod tests;

pub use cf_time::CfTimeUnits;
pub use ipc::IpcSourceReader;
#[cfg(feature = "netcdf")]
pub use netcdf_reader::NetcdfSourceReader;

/// Name of the time index column every loaded table starts with.
pub const TIME_COLUMN: &str = "time";

/// Metadata key the producing code stamps its revision under.
pub const VERSION_KEY: &str = "version";

/// Version reported when a file does not carry one.
pub const UNKNOWN_VERSION: &str = "unknown";

/// Contents of one successfully read source file.
#[derive(Debug, Clone)]
pub struct SourceRecord {
    pub table: RecordBatch,
    pub version: Option<String>,
}

/// Format-specific reader for one per-day file.
///
/// Implementations open the file, read it fully and close it before
/// returning. They are shared across worker threads.
pub trait SourceReader: Send + Sync {
    fn read(&self, path: &Path) -> Result<SourceRecord>;
}

/// What happened when a single day was loaded.
#[derive(Debug, Clone)]
pub enum DayOutcome {
    Loaded(RecordBatch),
    Absent,
    Failed(String),
}

impl DayOutcome {
    pub fn table(&self) -> Option<&RecordBatch> {
        match self {
            DayOutcome::Loaded(table) => Some(table),
            _ => None,
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, DayOutcome::Loaded(_))
    }
}

/// Result slot for one day of a fetch.
#[derive(Debug, Clone)]
pub struct DayRecord {
    pub day: NaiveDate,
    pub path: PathBuf,
    pub outcome: DayOutcome,
    pub version: String,
}

/// Loads one per-day file, degrading every failure to an outcome.
pub fn load(reader: &dyn SourceReader, path: &Path) -> (DayOutcome, String) {
    if !path.exists() {
        log::debug!("No source file at {}", path.display());
        return (DayOutcome::Absent, UNKNOWN_VERSION.to_string());
    }

    match reader.read(path).and_then(|record| {
        let table = normalize_time_index(&record.table)?;
        Ok((table, record.version))
    }) {
        Ok((table, version)) => {
            log::debug!("Loaded {} rows from {}", table.num_rows(), path.display());
            let version = version
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| UNKNOWN_VERSION.to_string());
            (DayOutcome::Loaded(table), version)
        }
        Err(e) => {
            log::warn!("Failed to read {}: {}", path.display(), e);
            (DayOutcome::Failed(e.to_string()), UNKNOWN_VERSION.to_string())
        }
    }
}

/// Moves the time column to the front as nanosecond timestamps and drops
/// file-level schema metadata so tables from different days concatenate.
pub fn normalize_time_index(batch: &RecordBatch) -> Result<RecordBatch> {
    let schema = batch.schema();
    let time_idx = schema
        .index_of(TIME_COLUMN)
        .map_err(|_| Error::Schema(format!("missing '{}' column", TIME_COLUMN)))?;

    let time_type = DataType::Timestamp(TimeUnit::Nanosecond, None);
    let time_col = batch.column(time_idx);
    let time_col = match time_col.data_type() {
        DataType::Timestamp(TimeUnit::Nanosecond, None) => Arc::clone(time_col),
        // Rescale in the source zone, then drop the zone; values stay UTC instants.
        DataType::Timestamp(_, tz) => {
            let rescaled = cast(time_col, &DataType::Timestamp(TimeUnit::Nanosecond, tz.clone()))?;
            let nanos = rescaled
                .as_any()
                .downcast_ref::<TimestampNanosecondArray>()
                .ok_or_else(|| Error::Schema("timestamp cast produced unexpected type".to_string()))?
                .clone()
                .with_timezone_opt(None::<String>);
            Arc::new(nanos) as ArrayRef
        }
        other => {
            return Err(Error::Schema(format!(
                "'{}' column must be a timestamp, found {}",
                TIME_COLUMN, other
            )));
        }
    };

    let mut fields = vec![Field::new(TIME_COLUMN, time_type, false)];
    let mut columns = vec![time_col];
    for (idx, field) in schema.fields().iter().enumerate() {
        if idx == time_idx {
            continue;
        }
        fields.push(field.as_ref().clone().with_metadata(Default::default()));
        columns.push(Arc::clone(batch.column(idx)));
    }

    Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)?)
}
