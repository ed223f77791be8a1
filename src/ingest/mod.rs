//! Multi-day ingestion: cache lookup, parallel fetch, assembly, cache write

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;

use crate::cache;
use crate::campaign::{self, DataType, DateRange, ProcessingLevel, Station};
use crate::error::Result;
use crate::source::{self, SourceReader};

mod assemble;
mod fetch;

#[cfg(test)]
mod tests;

pub use assemble::{assemble, dedup_by_time, empty_dataset, has_frequency_level, Dataset, FREQUENCY_COLUMN, TIMES_COLUMN};
pub use fetch::{default_concurrency, default_concurrency_for, fetch_all, reconcile_version, FetchJob, FetchOptions, FetchStats};

/// Extension of source files when no reader is chosen explicitly.
#[cfg(feature = "netcdf")]
pub const DEFAULT_SOURCE_EXTENSION: &str = "nc";
#[cfg(not(feature = "netcdf"))]
pub const DEFAULT_SOURCE_EXTENSION: &str = "arrow";

/// Everything one ingestion call needs.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub station: Station,
    pub range: DateRange,
    pub level: ProcessingLevel,
    pub data_type: DataType,
    pub data_dir: PathBuf,
    pub concurrency: usize,
    /// `None` disables caching entirely.
    pub cache_dir: Option<PathBuf>,
    /// Skip the cache lookup and overwrite the entry after fetching.
    pub refresh_cache: bool,
    pub fetch_timeout: Option<Duration>,
    pub source_extension: String,
}

impl IngestConfig {
    pub fn new(
        station: Station,
        range: DateRange,
        level: ProcessingLevel,
        data_type: DataType,
        data_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            station,
            range,
            level,
            data_type,
            data_dir: data_dir.into(),
            concurrency: default_concurrency(),
            cache_dir: None,
            refresh_cache: false,
            fetch_timeout: None,
            source_extension: DEFAULT_SOURCE_EXTENSION.to_string(),
        }
    }

    /// Validates raw, user-supplied values; fails before touching the disk.
    pub fn parse(
        station: &str,
        start: NaiveDate,
        end: NaiveDate,
        level: i64,
        data_type: &str,
        data_dir: impl Into<PathBuf>,
    ) -> Result<Self> {
        Ok(Self::new(
            station.parse()?,
            DateRange::new(start, end)?,
            ProcessingLevel::try_from(level)?,
            data_type.parse()?,
            data_dir,
        ))
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_cache_dir(mut self, cache_dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(cache_dir.into());
        self
    }

    pub fn with_refresh_cache(mut self, refresh: bool) -> Self {
        self.refresh_cache = refresh;
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = Some(timeout);
        self
    }

    /// An empty extension keeps the current one.
    pub fn with_source_extension(mut self, extension: impl Into<String>) -> Self {
        let extension = extension.into();
        let extension = extension.trim_start_matches('.');
        if !extension.is_empty() {
            self.source_extension = extension.to_string();
        }
        self
    }

    pub fn cache_key(&self) -> String {
        cache::cache_key(self.station, self.level, &self.data_type)
    }

    /// Where the file for `day` is expected under the data directory.
    pub fn source_path(&self, day: NaiveDate) -> PathBuf {
        campaign::resolve(self.station, day, self.level, &self.data_type, &self.data_dir)
            .with_extension(&self.source_extension)
    }

    pub fn fetch_options(&self) -> FetchOptions {
        FetchOptions {
            concurrency: self.concurrency,
            timeout: self.fetch_timeout,
        }
    }
}

/// Where an ingested dataset came from.
#[derive(Debug, Clone, PartialEq)]
pub enum DatasetSource {
    Cache(PathBuf),
    Fetched(FetchStats),
}

/// Result of one ingestion call, owned by the caller.
#[derive(Debug, Clone)]
pub struct Ingested {
    pub dataset: Dataset,
    pub version: String,
    pub source: DatasetSource,
}

/// Reader matching the compiled-in source format.
pub fn default_reader() -> Arc<dyn SourceReader> {
    #[cfg(feature = "netcdf")]
    {
        Arc::new(source::NetcdfSourceReader)
    }
    #[cfg(not(feature = "netcdf"))]
    {
        Arc::new(source::IpcSourceReader)
    }
}

pub fn ingest(config: &IngestConfig) -> Result<Ingested> {
    ingest_with_reader(config, default_reader())
}

/// Builds the dataset for `config`, consulting the cache first.
///
/// Only configuration and assembly problems are returned as errors; missing
/// or unreadable days shrink the dataset instead.
pub fn ingest_with_reader(config: &IngestConfig, reader: Arc<dyn SourceReader>) -> Result<Ingested> {
    let key = config.cache_key();

    if let Some(cache_dir) = &config.cache_dir {
        if config.refresh_cache {
            log::info!("Cache refresh requested for {}", key);
        } else if let Some(entry) = cache::try_load(cache_dir, &key) {
            log::info!(
                "Cache hit for {} ({} rows, version {})",
                key,
                entry.dataset.num_rows(),
                entry.version
            );
            return Ok(Ingested {
                dataset: entry.dataset,
                version: entry.version,
                source: DatasetSource::Cache(entry.path),
            });
        }
    }

    let jobs: Vec<FetchJob> = config
        .range
        .days()
        .into_iter()
        .map(|day| FetchJob { day, path: config.source_path(day) })
        .collect();

    log::info!(
        "Fetching {} {} level {} for {} to {} ({} days)",
        config.station,
        config.data_type,
        config.level,
        config.range.start(),
        config.range.end(),
        jobs.len()
    );

    let records = fetch_all(jobs, move |path: &Path| source::load(reader.as_ref(), path), &config.fetch_options())?;
    let stats = FetchStats::from_records(&records);
    let version = reconcile_version(&records);
    log::info!(
        "Fetched {} days: {} loaded, {} absent, {} failed; version {}",
        stats.total(),
        stats.loaded,
        stats.absent,
        stats.failed,
        version
    );

    let dataset = assemble(&records, &config.data_type)?;

    if let Some(cache_dir) = &config.cache_dir {
        if stats.loaded == 0 {
            log::debug!("Nothing loaded for {}; not caching", key);
        } else {
            match cache::save(cache_dir, &key, &dataset, &version) {
                Ok(path) => log::info!("Cached {} rows to {}", dataset.num_rows(), path.display()),
                Err(e) => log::warn!("Failed to write cache for {}: {}", key, e),
            }
        }
    }

    Ok(Ingested {
        dataset,
        version,
        source: DatasetSource::Fetched(stats),
    })
}
