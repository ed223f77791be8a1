
use super::*;

pub fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn data_type(tag: &str) -> DataType {
    DataType::new(tag).unwrap()
}
