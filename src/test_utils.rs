//! Fixture helpers shared by the unit tests of every module.

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{Float64Array, TimestampNanosecondArray};
use arrow::datatypes::{DataType as ArrowType, Field, Schema, TimeUnit};
use arrow::ipc::writer::FileWriter;
use arrow::record_batch::RecordBatch;
use chrono::NaiveDate;

use crate::campaign::{self, DataType, ProcessingLevel, Station};

pub const NANOS_PER_SEC: i64 = 1_000_000_000;

pub fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Unix nanoseconds of `day` plus `offset_secs`.
pub fn ts(day: NaiveDate, offset_secs: i64) -> i64 {
    day.and_hms_opt(0, 0, 0).unwrap().and_utc().timestamp_nanos_opt().unwrap() + offset_secs * NANOS_PER_SEC
}

pub fn flux_schema() -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("time", ArrowType::Timestamp(TimeUnit::Nanosecond, None), false),
        Field::new("value", ArrowType::Float64, true),
    ]))
}

pub fn flux_batch(timestamps: Vec<i64>, values: Vec<f64>) -> RecordBatch {
    RecordBatch::try_new(
        flux_schema(),
        vec![
            Arc::new(TimestampNanosecondArray::from(timestamps)),
            Arc::new(Float64Array::from(values)),
        ],
    )
    .unwrap()
}

/// Three ten-minute samples starting at midnight of `day`, valued `base`, `base + 1`, `base + 2`.
pub fn day_batch(day: NaiveDate, base: f64) -> RecordBatch {
    flux_batch(
        vec![ts(day, 0), ts(day, 600), ts(day, 1200)],
        vec![base, base + 1.0, base + 2.0],
    )
}

pub fn write_ipc(path: &Path, batch: &RecordBatch, version: Option<&str>) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    let file = File::create(path).unwrap();
    let mut writer = FileWriter::try_new(file, &batch.schema()).unwrap();
    if let Some(version) = version {
        writer.write_metadata("version", version);
    }
    writer.write(batch).unwrap();
    writer.finish().unwrap();
}

/// Resolved location of a fixture day file in the Arrow IPC flavour.
pub fn source_path(base: &Path, station: Station, day: NaiveDate, level: ProcessingLevel, data_type: &DataType) -> PathBuf {
    campaign::resolve(station, day, level, data_type, base).with_extension("arrow")
}

pub fn write_day_file(
    base: &Path,
    station: Station,
    day: NaiveDate,
    level: ProcessingLevel,
    data_type: &DataType,
    batch: &RecordBatch,
    version: Option<&str>,
) -> PathBuf {
    let path = source_path(base, station, day, level, data_type);
    write_ipc(&path, batch, version);
    path
}

pub fn float_values(batch: &RecordBatch, column: &str) -> Vec<Option<f64>> {
    batch
        .column_by_name(column)
        .unwrap()
        .as_any()
        .downcast_ref::<Float64Array>()
        .unwrap()
        .iter()
        .collect()
}

pub fn time_values(batch: &RecordBatch, column: &str) -> Vec<i64> {
    batch
        .column_by_name(column)
        .unwrap()
        .as_any()
        .downcast_ref::<TimestampNanosecondArray>()
        .unwrap()
        .values()
        .to_vec()
}
