use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use super::{DataType, ProcessingLevel, Station};

/// Subdirectory holding the final quality-controlled level 2 products.
const FINAL_QC_DIR: &str = "version3_final_qc";

/// Stem the tower's met city files are published under.
const TOWER_STEM: &str = "metcity";

/// Maps a station/day/level/type combination to the file it lives in.
///
/// No I/O is performed; the file may or may not exist.
///
/// ```text
/// <base>/<station>/<N>_level_<suffix>_<station>/[<sub>/]<file>.nc
/// ```
pub fn resolve(
    station: Station,
    day: NaiveDate,
    level: ProcessingLevel,
    data_type: &DataType,
    base_dir: &Path,
) -> PathBuf {
    let date = day.format("%Y%m%d");
    let level_dir = base_dir
        .join(station.name())
        .join(format!("{}_level_{}_{}", level.number(), level.dir_suffix(), station.name()));

    let (subdir, file_name) = match (station, level) {
        (Station::Tower, ProcessingLevel::Ingest) => (
            Some(data_type.as_str().to_string()),
            format!("{}.level1.{}.{}.000000.nc", TOWER_STEM, data_type, date),
        ),
        (Station::Tower, ProcessingLevel::Product) => (
            Some(FINAL_QC_DIR.to_string()),
            format!("mosmet.{}.level2.{}.{}.000000.nc", TOWER_STEM, data_type.cadence(), date),
        ),
        (Station::Tower, ProcessingLevel::Archive) => (
            None,
            format!("mosmet.{}.level3.{}.{}.000000.nc", TOWER_STEM, data_type.cadence(), date),
        ),
        (_, ProcessingLevel::Ingest) => (
            Some(data_type.as_str().to_string()),
            format!("{}.level1.{}.{}.000000.nc", station, data_type, date),
        ),
        (_, ProcessingLevel::Product) => (
            Some(FINAL_QC_DIR.to_string()),
            format!("mos{}.{}.level2.{}.{}.000000.nc", data_type, station, data_type.cadence(), date),
        ),
        (_, ProcessingLevel::Archive) => (
            None,
            format!("mos{}.{}.level3.{}.{}.000000.nc", data_type, station, data_type.cadence(), date),
        ),
    };

    match subdir {
        Some(sub) => level_dir.join(sub).join(file_name),
        None => level_dir.join(file_name),
    }
}
