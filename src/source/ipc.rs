use std::fs::File;
use std::path::Path;

use arrow::compute::concat_batches;
use arrow::ipc::reader::FileReader;
use arrow::record_batch::RecordBatch;

use super::{SourceReader, SourceRecord, VERSION_KEY};
use crate::error::Result;

/// Reads per-day files stored in the Arrow IPC file format.
///
/// The producing code's version is looked up in the footer's custom
/// metadata first and in the schema metadata second.
#[derive(Debug, Default, Clone, Copy)]
pub struct IpcSourceReader;

impl SourceReader for IpcSourceReader {
    fn read(&self, path: &Path) -> Result<SourceRecord> {
        let file = File::open(path)?;
        let reader = FileReader::try_new(file, None)?;

        let schema = reader.schema();
        let version = reader
            .custom_metadata()
            .get(VERSION_KEY)
            .or_else(|| schema.metadata().get(VERSION_KEY))
            .cloned();

        let batches = reader.collect::<std::result::Result<Vec<RecordBatch>, _>>()?;
        let table = concat_batches(&schema, &batches)?;

        Ok(SourceRecord { table, version })
    }
}
