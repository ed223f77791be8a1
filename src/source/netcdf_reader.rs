use std::path::Path;
use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, TimestampNanosecondArray};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use netcdf::AttributeValue;

use super::{CfTimeUnits, SourceReader, SourceRecord, TIME_COLUMN, VERSION_KEY};
use crate::error::{Error, Result};

/// Reads per-day NetCDF files.
///
/// Every numeric variable laid out along the time dimension becomes a
/// `Float64` column; `_FillValue` and `missing_value` entries become nulls.
/// Multi-dimensional variables are skipped.
#[derive(Debug, Default, Clone, Copy)]
pub struct NetcdfSourceReader;

impl SourceReader for NetcdfSourceReader {
    fn read(&self, path: &Path) -> Result<SourceRecord> {
        let nc = netcdf::open(path).map_err(|e| Error::Schema(format!("failed to open NetCDF: {}", e)))?;

        let version = nc
            .attribute(VERSION_KEY)
            .and_then(|attr| attr.value().ok())
            .and_then(|value| match value {
                AttributeValue::Str(s) => Some(s),
                _ => None,
            });

        let time_var = nc
            .variable(TIME_COLUMN)
            .ok_or_else(|| Error::Schema(format!("missing '{}' variable", TIME_COLUMN)))?;
        let time_dim = match time_var.dimensions() {
            [dim] => dim.name(),
            _ => return Err(Error::Schema("time variable must be one-dimensional".to_string())),
        };
        let units: CfTimeUnits = match time_var.attribute_value("units") {
            Some(Ok(AttributeValue::Str(units))) => units.parse()?,
            _ => return Err(Error::Schema("time variable has no string 'units' attribute".to_string())),
        };

        let raw_times: Vec<f64> = time_var
            .get_values(..)
            .map_err(|e| Error::Schema(format!("failed to read time: {}", e)))?;
        let times: Vec<i64> = raw_times
            .iter()
            .map(|&t| {
                units
                    .to_unix_nanos(t)
                    .ok_or_else(|| Error::Schema(format!("unrepresentable time value {}", t)))
            })
            .collect::<Result<_>>()?;

        let mut fields = vec![Field::new(TIME_COLUMN, DataType::Timestamp(TimeUnit::Nanosecond, None), false)];
        let mut columns: Vec<ArrayRef> = vec![Arc::new(TimestampNanosecondArray::from(times))];

        for var in nc.variables() {
            let name = var.name();
            if name == TIME_COLUMN {
                continue;
            }
            let along_time = matches!(var.dimensions(), [dim] if dim.name() == time_dim);
            if !along_time {
                continue;
            }

            let values: Vec<f64> = match var.get_values(..) {
                Ok(values) => values,
                Err(e) => {
                    log::debug!("Skipping variable {} in {}: {}", name, path.display(), e);
                    continue;
                }
            };
            let fill = numeric_attr(&var, "_FillValue").or_else(|| numeric_attr(&var, "missing_value"));
            let column: Float64Array = values
                .into_iter()
                .map(|v| match fill {
                    Some(fill) if v == fill => None,
                    _ if v.is_nan() => None,
                    _ => Some(v),
                })
                .collect();

            fields.push(Field::new(name, DataType::Float64, true));
            columns.push(Arc::new(column));
        }

        let table = RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)?;
        Ok(SourceRecord { table, version })
    }
}

/// Checks presence first; asking HDF5 for a missing attribute spams stderr.
fn numeric_attr(var: &netcdf::Variable, name: &str) -> Option<f64> {
    if !var.attributes().any(|attr| attr.name() == name) {
        return None;
    }
    let value = var.attribute_value(name)?.ok()?;
    f64::try_from(value).ok()
}
