use std::ffi::OsString;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

use arrow::compute::concat_batches;
use arrow::ipc::reader::FileReader;
use arrow::ipc::writer::FileWriter;
use arrow::record_batch::RecordBatch;
use rand::distr::Alphanumeric;
use rand::{rng, Rng};

use crate::error::Result;
use crate::source::VERSION_KEY;

/// Writes `batch` to `path` via a uniquely named sibling temp file.
pub(super) fn write_blob(path: &Path, batch: &RecordBatch, version: &str) -> Result<()> {
    let temp_path = temp_path_for(path);

    let written = (|| -> Result<()> {
        let file = File::create(&temp_path)?;
        let mut writer = FileWriter::try_new(file, &batch.schema())?;
        writer.write_metadata(VERSION_KEY, version);
        writer.write(batch)?;
        writer.finish()?;
        Ok(())
    })()
    .and_then(|_| Ok(fs::rename(&temp_path, path)?));

    if written.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    written
}

/// Reads a blob back, with the version stored in its footer if any.
pub(super) fn read_blob(path: &Path) -> Result<(RecordBatch, Option<String>)> {
    let file = File::open(path)?;
    let reader = FileReader::try_new(file, None)?;

    let schema = reader.schema();
    let version = reader.custom_metadata().get(VERSION_KEY).cloned();

    let batches = reader.collect::<std::result::Result<Vec<RecordBatch>, _>>()?;
    let batch = concat_batches(&schema, &batches)?;
    Ok((batch, version))
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(format!(".{}.tmp", generate_random_string(10)));
    path.with_file_name(name)
}

fn generate_random_string(len: usize) -> String {
    rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}
