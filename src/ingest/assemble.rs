use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use arrow::array::{new_null_array, Array, ArrayRef, TimestampNanosecondArray, UInt32Array};
use arrow::compute::{cast, concat, take};
use arrow::datatypes::{DataType as ArrowType, Field, Schema, SchemaRef, TimeUnit};
use arrow::record_batch::RecordBatch;

use crate::campaign::DataType;
use crate::error::{Error, Result};
use crate::source::{DayRecord, TIME_COLUMN};

/// Assembled multi-day table; column 0 is the `time` index, the last column is `times`.
pub type Dataset = RecordBatch;

/// Plain-column copy of the time index attached for downstream consumers.
pub const TIMES_COLUMN: &str = "times";

/// Secondary index level that fast data carries next to `time`.
pub const FREQUENCY_COLUMN: &str = "freq";

fn time_field() -> Field {
    Field::new(TIME_COLUMN, ArrowType::Timestamp(TimeUnit::Nanosecond, None), false)
}

/// Dataset with no rows and only the time columns.
pub fn empty_dataset() -> Dataset {
    let schema = Schema::new(vec![time_field(), time_field().with_name(TIMES_COLUMN)]);
    RecordBatch::new_empty(Arc::new(schema))
}

/// Merges per-day results, in the order given, into one dataset.
///
/// Days that did not load, or loaded empty, are skipped. Rows repeating an
/// earlier timestamp are dropped.
pub fn assemble(records: &[DayRecord], data_type: &DataType) -> Result<Dataset> {
    let tables = records
        .iter()
        .filter_map(|record| record.outcome.table())
        .filter(|table| table.num_rows() > 0)
        .map(|table| drop_frequency_level(table, data_type))
        .collect::<Result<Vec<_>>>()?;

    if tables.is_empty() {
        log::debug!("No populated days to assemble");
        return Ok(empty_dataset());
    }

    let schema = unify_schemas(&tables)?;
    let aligned = tables
        .iter()
        .map(|table| align_to_schema(table, &schema))
        .collect::<Result<Vec<_>>>()?;

    let combined = concat_tables(&schema, &aligned)?;
    let deduped = dedup_by_time(&combined)?;
    if deduped.num_rows() < combined.num_rows() {
        log::debug!("Dropped {} duplicate timestamps", combined.num_rows() - deduped.num_rows());
    }

    attach_times_column(&deduped)
}

/// True when the table carries the sampling-frequency index level.
pub fn has_frequency_level(table: &RecordBatch) -> bool {
    table.schema().column_with_name(FREQUENCY_COLUMN).is_some()
}

fn drop_frequency_level(table: &RecordBatch, data_type: &DataType) -> Result<RecordBatch> {
    if !data_type.has_frequency_level() || !has_frequency_level(table) {
        return Ok(table.clone());
    }
    let mut table = table.clone();
    let (idx, _) = table
        .schema()
        .column_with_name(FREQUENCY_COLUMN)
        .ok_or_else(|| Error::Schema(format!("'{}' column vanished", FREQUENCY_COLUMN)))?;
    table.remove_column(idx);
    Ok(table)
}

/// Union of all columns in first-seen order; the first type seen for a name wins.
fn unify_schemas(tables: &[RecordBatch]) -> Result<SchemaRef> {
    let mut fields = vec![time_field()];
    let mut seen: HashMap<String, usize> = HashMap::new();

    for table in tables {
        let schema = table.schema();
        match schema.fields().first() {
            Some(field) if field.name() == TIME_COLUMN => {}
            _ => return Err(Error::Schema(format!("table does not start with '{}'", TIME_COLUMN))),
        }
        for field in schema.fields().iter().skip(1) {
            match seen.get(field.name()) {
                Some(&idx) if fields[idx].data_type() != field.data_type() => {
                    log::warn!(
                        "Column {} changes type from {} to {}; casting",
                        field.name(),
                        fields[idx].data_type(),
                        field.data_type()
                    );
                }
                Some(_) => {}
                None => {
                    seen.insert(field.name().clone(), fields.len());
                    // Any day may lack the column, so every data column is nullable.
                    fields.push(Field::new(field.name(), field.data_type().clone(), true));
                }
            }
        }
    }

    Ok(Arc::new(Schema::new(fields)))
}

fn align_to_schema(table: &RecordBatch, schema: &SchemaRef) -> Result<RecordBatch> {
    let rows = table.num_rows();
    let columns = schema
        .fields()
        .iter()
        .map(|field| match table.column_by_name(field.name()) {
            Some(col) if col.data_type() == field.data_type() => Arc::clone(col),
            Some(col) => cast(col, field.data_type()).unwrap_or_else(|e| {
                log::warn!("Cannot cast column {} to {}: {}; filling with nulls", field.name(), field.data_type(), e);
                new_null_array(field.data_type(), rows)
            }),
            None => new_null_array(field.data_type(), rows),
        })
        .collect::<Vec<ArrayRef>>();

    Ok(RecordBatch::try_new(Arc::clone(schema), columns)?)
}

fn concat_tables(schema: &SchemaRef, tables: &[RecordBatch]) -> Result<RecordBatch> {
    let num_columns = schema.fields().len();
    let mut concatenated_columns: Vec<ArrayRef> = Vec::with_capacity(num_columns);

    for col_idx in 0..num_columns {
        let arrays: Vec<&dyn Array> = tables
            .iter()
            .map(|table| table.column(col_idx).as_ref())
            .collect();
        concatenated_columns.push(concat(&arrays)?);
    }

    Ok(RecordBatch::try_new(Arc::clone(schema), concatenated_columns)?)
}

fn time_index(table: &RecordBatch) -> Result<&TimestampNanosecondArray> {
    table
        .column(0)
        .as_any()
        .downcast_ref::<TimestampNanosecondArray>()
        .ok_or_else(|| Error::Schema(format!("first column must be the '{}' timestamp", TIME_COLUMN)))
}

/// Keeps the first row for every timestamp.
pub fn dedup_by_time(table: &RecordBatch) -> Result<RecordBatch> {
    let times = time_index(table)?;
    let mut seen = HashSet::with_capacity(times.len());
    let keep: Vec<u32> = times
        .values()
        .iter()
        .enumerate()
        .filter(|(_, ts)| seen.insert(**ts))
        .map(|(row, _)| row as u32)
        .collect();

    if keep.len() == table.num_rows() {
        return Ok(table.clone());
    }

    let indices = UInt32Array::from(keep);
    let columns = table
        .columns()
        .iter()
        .map(|col| take(col.as_ref(), &indices, None))
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(RecordBatch::try_new(table.schema(), columns)?)
}

fn attach_times_column(table: &RecordBatch) -> Result<Dataset> {
    let mut table = table.clone();
    if let Some((idx, _)) = table.schema().column_with_name(TIMES_COLUMN) {
        table.remove_column(idx);
    }

    let index = Arc::clone(table.column(0));
    let mut fields: Vec<Field> = table.schema().fields().iter().map(|f| f.as_ref().clone()).collect();
    fields.push(time_field().with_name(TIMES_COLUMN));
    let mut columns = table.columns().to_vec();
    columns.push(index);

    Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)?)
}
