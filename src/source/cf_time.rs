use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};

use crate::error::Error;

const EPOCH_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Parsed CF-style time units, e.g. `"seconds since 2019-10-15 00:00:00"`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CfTimeUnits {
    nanos_per_unit: f64,
    epoch_nanos: i64,
}

impl CfTimeUnits {
    /// Converts a raw offset into nanoseconds since the Unix epoch.
    ///
    /// Non-finite values (fill values that slipped through) map to `None`.
    pub fn to_unix_nanos(&self, value: f64) -> Option<i64> {
        if !value.is_finite() {
            return None;
        }
        let offset = (value * self.nanos_per_unit).round();
        if offset.abs() > i64::MAX as f64 {
            return None;
        }
        self.epoch_nanos.checked_add(offset as i64)
    }
}

impl FromStr for CfTimeUnits {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || Error::Schema(format!("unsupported time units: {:?}", s));

        let (unit, epoch) = s.split_once(" since ").ok_or_else(bad)?;
        let nanos_per_unit = match unit.trim().to_lowercase().as_str() {
            "nanoseconds" | "nanosecond" | "ns" => 1.0,
            "microseconds" | "microsecond" | "us" => 1e3,
            "milliseconds" | "millisecond" | "ms" => 1e6,
            "seconds" | "second" | "secs" | "sec" | "s" => 1e9,
            "minutes" | "minute" | "mins" | "min" => 60.0 * 1e9,
            "hours" | "hour" | "hrs" | "hr" | "h" => 3600.0 * 1e9,
            "days" | "day" | "d" => 86_400.0 * 1e9,
            _ => return Err(bad()),
        };

        // Trailing zone designators are assumed to be UTC.
        let epoch = epoch.trim().trim_end_matches('Z').trim_end_matches(" UTC").trim();
        let epoch = EPOCH_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(epoch, fmt).ok())
            .or_else(|| {
                NaiveDate::parse_from_str(epoch, "%Y-%m-%d")
                    .ok()
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
            })
            .ok_or_else(bad)?;

        let epoch_nanos = epoch.and_utc().timestamp_nanos_opt().ok_or_else(bad)?;
        Ok(Self { nanos_per_unit, epoch_nanos })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seconds_since_unix_epoch() {
        let units: CfTimeUnits = "seconds since 1970-01-01 00:00:00".parse().unwrap();
        assert_eq!(units.to_unix_nanos(1.5), Some(1_500_000_000));
    }

    #[test]
    fn test_minutes_since_date_only_epoch() {
        let units: CfTimeUnits = "minutes since 1970-01-02".parse().unwrap();
        assert_eq!(units.to_unix_nanos(0.0), Some(86_400_000_000_000));
        assert_eq!(units.to_unix_nanos(1.0), Some(86_460_000_000_000));
    }

    #[test]
    fn test_iso_epoch_with_zone() {
        let units: CfTimeUnits = "hours since 1970-01-01T00:00:00Z".parse().unwrap();
        assert_eq!(units.to_unix_nanos(2.0), Some(7_200_000_000_000));
    }

    #[test]
    fn test_rejects_unknown_units() {
        assert!("fortnights since 1970-01-01".parse::<CfTimeUnits>().is_err());
        assert!("seconds".parse::<CfTimeUnits>().is_err());
    }

    #[test]
    fn test_non_finite_values_map_to_none() {
        let units: CfTimeUnits = "seconds since 1970-01-01".parse().unwrap();
        assert_eq!(units.to_unix_nanos(f64::NAN), None);
    }
}
