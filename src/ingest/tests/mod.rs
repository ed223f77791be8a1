pub mod fetch;

use super::*;
use crate::source::{DayOutcome, DayRecord, SourceRecord, UNKNOWN_VERSION};
use crate::test_utils::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::tempdir;

pub fn loaded(d: NaiveDate, table: arrow::record_batch::RecordBatch, version: &str) -> DayRecord {
    DayRecord {
        day: d,
        path: PathBuf::from(format!("{}.arrow", d)),
        outcome: DayOutcome::Loaded(table),
        version: version.to_string(),
    }
}

pub fn absent(d: NaiveDate) -> DayRecord {
    DayRecord {
        day: d,
        path: PathBuf::from(format!("{}.arrow", d)),
        outcome: DayOutcome::Absent,
        version: UNKNOWN_VERSION.to_string(),
    }
}

/// Wraps the IPC reader and counts how many files it was asked to read.
#[derive(Default)]
pub struct CountingReader {
    pub reads: AtomicUsize,
}

impl SourceReader for CountingReader {
    fn read(&self, path: &Path) -> crate::error::Result<SourceRecord> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        crate::source::IpcSourceReader.read(path)
    }
}
