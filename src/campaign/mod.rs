//! Campaign vocabulary: stations, processing levels, data types and day ranges

use std::fmt;
use std::str::FromStr;

use chrono::{Days, NaiveDate};

use crate::error::{Error, Result};

mod paths;

#[cfg(test)]
mod tests;

pub use paths::resolve;

/// Measurement platforms deployed during the campaign.
///
/// The set is closed; each member owns a directory tree under the data root.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Station {
    Tower,
    Asfs30,
    Asfs40,
    Asfs50,
}

impl Station {
    pub const ALL: [Station; 4] = [Station::Tower, Station::Asfs30, Station::Asfs40, Station::Asfs50];

    pub fn name(&self) -> &'static str {
        match self {
            Station::Tower => "tower",
            Station::Asfs30 => "asfs30",
            Station::Asfs40 => "asfs40",
            Station::Asfs50 => "asfs50",
        }
    }
}

impl fmt::Display for Station {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Station {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Station::ALL
            .into_iter()
            .find(|station| station.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::UnknownStation(s.to_string()))
    }
}

/// How far raw instrument output has been carried through processing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ProcessingLevel {
    Ingest = 1,
    Product = 2,
    Archive = 3,
}

impl ProcessingLevel {
    pub fn number(&self) -> u8 {
        *self as u8
    }

    /// Directory suffix used in `<N>_level_<suffix>_<station>`.
    pub fn dir_suffix(&self) -> &'static str {
        match self {
            ProcessingLevel::Ingest => "ingest",
            ProcessingLevel::Product => "product",
            ProcessingLevel::Archive => "archive",
        }
    }
}

impl TryFrom<i64> for ProcessingLevel {
    type Error = Error;

    fn try_from(value: i64) -> Result<Self> {
        match value {
            1 => Ok(ProcessingLevel::Ingest),
            2 => Ok(ProcessingLevel::Product),
            3 => Ok(ProcessingLevel::Archive),
            other => Err(Error::InvalidLevel(other)),
        }
    }
}

impl fmt::Display for ProcessingLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

/// Free-form tag selecting which family of files to read ("slow", "fast", "seb", ...).
///
/// Restricted to ASCII alphanumerics, `-` and `_` so it can be embedded in
/// file names and cache keys without escaping.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DataType(String);

impl DataType {
    pub fn new(tag: impl Into<String>) -> Result<Self> {
        let tag = tag.into();
        let valid = !tag.is_empty()
            && tag.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(Error::InvalidDataType(tag));
        }
        Ok(DataType(tag))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Averaging interval token that appears in level 2 and 3 file names.
    pub fn cadence(&self) -> &str {
        match self.0.as_str() {
            "slow" | "seb" => "10min",
            "fast" => "20hz",
            "1min" => "1min",
            other => other,
        }
    }

    /// Fast data carries a sampling-frequency column next to the time index.
    pub fn has_frequency_level(&self) -> bool {
        self.0 == "fast"
    }
}

impl FromStr for DataType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        DataType::new(s)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Inclusive range of calendar days.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(Error::InvalidDateRange(format!("start {} is after end {}", start, end)));
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn num_days(&self) -> usize {
        (self.end - self.start).num_days() as usize + 1
    }

    /// Days of the range in chronological order.
    pub fn days(&self) -> Vec<NaiveDate> {
        (0..self.num_days() as u64)
            .filter_map(|offset| self.start.checked_add_days(Days::new(offset)))
            .collect()
    }
}
