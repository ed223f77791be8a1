
use super::*;
use crate::test_utils::*;
use tempfile::tempdir;

pub fn seb() -> DataType {
    DataType::new("seb").unwrap()
}

pub fn sample_dataset() -> Dataset {
    let d = day(2020, 1, 1);
    let records = vec![crate::source::DayRecord {
        day: d,
        path: PathBuf::from("unused"),
        outcome: crate::source::DayOutcome::Loaded(day_batch(d, 1.0)),
        version: "v1".to_string(),
    }];
    crate::ingest::assemble(&records, &seb()).unwrap()
}
