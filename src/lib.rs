//! Parallel, cached ingestion of per-day field campaign files into Arrow tables
//!
//! ```no_run
//! use chrono::NaiveDate;
//! use fluxcache::{ingest, IngestConfig};
//!
//! let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
//! let end = NaiveDate::from_ymd_opt(2020, 1, 31).unwrap();
//! let config = IngestConfig::parse("asfs30", start, end, 2, "seb", "/data/mosaic")?
//!     .with_cache_dir("/data/cache");
//! let result = ingest(&config)?;
//! println!("{} rows, version {}", result.dataset.num_rows(), result.version);
//! # Ok::<(), fluxcache::Error>(())
//! ```

pub mod cache;
pub mod campaign;
pub mod ingest;
pub mod source;

mod error;

#[cfg(test)]
mod test_utils;

pub use campaign::{DataType, DateRange, ProcessingLevel, Station};
pub use error::{Error, Result};
pub use ingest::{ingest, ingest_with_reader, Dataset, DatasetSource, IngestConfig, Ingested};
