//! On-disk cache of assembled datasets
//!
//! One Arrow IPC file per (station, level, data type), named
//! `<station>.level<N>.<data_type>.v<version>.arrow`. Lookup matches on the
//! key only, so an entry stays in use until it is deleted or refreshed even
//! if newer source files appear.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::campaign::{DataType, ProcessingLevel, Station};
use crate::error::Result;
use crate::ingest::Dataset;
use crate::source::UNKNOWN_VERSION;

mod blob;

#[cfg(test)]
mod tests;

/// Longest version fragment embedded in a cache file name.
pub const VERSION_TOKEN_LEN: usize = 32;

const BLOB_EXTENSION: &str = ".arrow";

/// A dataset read back from the cache.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub dataset: Dataset,
    pub version: String,
    pub path: PathBuf,
}

/// Cache key for a station/level/type combination.
///
/// Data types cannot contain `.`, so keys of different combinations never
/// prefix one another once the `.v` separator is appended.
pub fn cache_key(station: Station, level: ProcessingLevel, data_type: &DataType) -> String {
    format!("{}.level{}.{}", station, level.number(), data_type)
}

/// Filename-safe, truncated form of a version string.
pub fn version_token(version: &str) -> String {
    let token: String = version
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '-' })
        .take(VERSION_TOKEN_LEN)
        .collect();
    if token.is_empty() { UNKNOWN_VERSION.to_string() } else { token }
}

pub fn entry_file_name(key: &str, version: &str) -> String {
    format!("{}.v{}{}", key, version_token(version), BLOB_EXTENSION)
}

/// Version fragment of a cache file name belonging to `key`.
fn token_of<'a>(file_name: &'a str, key: &str) -> Option<&'a str> {
    file_name
        .strip_prefix(key)?
        .strip_prefix(".v")?
        .strip_suffix(BLOB_EXTENSION)
}

/// Finds and reads the cache entry for `key`.
///
/// Unrelated files and subdirectories are ignored. With several entries for
/// the same key, the most recently modified one is tried first (ties by name); unreadable
/// entries are skipped. Any failure is reported as a miss.
pub fn try_load(cache_dir: &Path, key: &str) -> Option<CacheEntry> {
    let entries = match fs::read_dir(cache_dir) {
        Ok(entries) => entries,
        Err(e) => {
            log::debug!("Cache directory {} not readable: {}", cache_dir.display(), e);
            return None;
        }
    };

    let mut candidates: Vec<(SystemTime, String, PathBuf)> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
        .filter_map(|entry| {
            let name = entry.file_name().into_string().ok()?;
            token_of(&name, key)?;
            let modified = entry.metadata().and_then(|m| m.modified()).unwrap_or(SystemTime::UNIX_EPOCH);
            Some((modified, name, entry.path()))
        })
        .collect();
    candidates.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));

    for (_, name, path) in candidates {
        match blob::read_blob(&path) {
            Ok((dataset, stored_version)) => {
                let version = stored_version
                    .or_else(|| token_of(&name, key).map(str::to_string))
                    .unwrap_or_else(|| UNKNOWN_VERSION.to_string());
                return Some(CacheEntry { dataset, version, path });
            }
            Err(e) => log::warn!("Ignoring unreadable cache entry {}: {}", path.display(), e),
        }
    }

    log::debug!("Cache miss for {} in {}", key, cache_dir.display());
    None
}

/// Persists `dataset` under `key` and the version token.
///
/// The blob is written beside its final name and renamed into place, so
/// concurrent readers never observe a partial file.
pub fn save(cache_dir: &Path, key: &str, dataset: &Dataset, version: &str) -> Result<PathBuf> {
    fs::create_dir_all(cache_dir)?;
    let path = cache_dir.join(entry_file_name(key, version));
    blob::write_blob(&path, dataset, version)?;
    Ok(path)
}
