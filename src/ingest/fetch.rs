use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use chrono::NaiveDate;

use crate::error::Result;
use crate::source::{DayOutcome, DayRecord, UNKNOWN_VERSION};

/// One day to fetch and where its file is expected.
#[derive(Debug, Clone)]
pub struct FetchJob {
    pub day: NaiveDate,
    pub path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Worker threads; clamped to `1..=available cores`.
    pub concurrency: usize,
    /// Days still running at the deadline are recorded as failed.
    pub timeout: Option<Duration>,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            timeout: None,
        }
    }
}

/// Per-outcome day counts of a finished fetch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchStats {
    pub loaded: usize,
    pub absent: usize,
    pub failed: usize,
}

impl FetchStats {
    pub fn from_records(records: &[DayRecord]) -> Self {
        records.iter().fold(Self::default(), |mut stats, record| {
            match record.outcome {
                DayOutcome::Loaded(_) => stats.loaded += 1,
                DayOutcome::Absent => stats.absent += 1,
                DayOutcome::Failed(_) => stats.failed += 1,
            }
            stats
        })
    }

    pub fn total(&self) -> usize {
        self.loaded + self.absent + self.failed
    }
}

fn available_cores() -> usize {
    thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
}

/// All cores, except on small hosts where one core is left to the caller.
pub fn default_concurrency() -> usize {
    default_concurrency_for(available_cores())
}

pub fn default_concurrency_for(cores: usize) -> usize {
    if cores <= 4 { cores.saturating_sub(1).max(1) } else { cores }
}

type Loaded = (DayOutcome, String);

/// Runs `loader` over every job on a bounded worker pool.
///
/// The returned records line up one-to-one with `jobs`, whatever order the
/// workers finish in. A panicking loader only fails its own day. Once the
/// timeout fires, queued days are skipped instead of loaded.
pub fn fetch_all<F>(jobs: Vec<FetchJob>, loader: F, options: &FetchOptions) -> Result<Vec<DayRecord>>
where
    F: Fn(&Path) -> Loaded + Send + Sync + 'static,
{
    let n = jobs.len();
    if n == 0 {
        return Ok(Vec::new());
    }

    let workers = options.concurrency.clamp(1, available_cores()).min(n);
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("fetch-worker-{}", i))
        .build()?;

    log::debug!("Fetching {} days on {} workers", n, workers);

    let loader = Arc::new(loader);
    let cancelled = Arc::new(AtomicBool::new(false));
    let (tx, rx) = mpsc::channel::<(usize, Loaded)>();

    for (idx, job) in jobs.iter().enumerate() {
        let tx = tx.clone();
        let loader = Arc::clone(&loader);
        let cancelled = Arc::clone(&cancelled);
        let path = job.path.clone();
        pool.spawn(move || {
            if cancelled.load(Ordering::Acquire) {
                return;
            }
            let result = panic::catch_unwind(AssertUnwindSafe(|| loader(&path))).unwrap_or_else(|payload| {
                let reason = format!("worker panicked: {}", panic_message(payload.as_ref()));
                log::warn!("{} while loading {}", reason, path.display());
                (DayOutcome::Failed(reason), UNKNOWN_VERSION.to_string())
            });
            // The receiver is gone once the fetch has timed out.
            let _ = tx.send((idx, result));
        });
    }
    drop(tx);

    let mut slots: Vec<Option<Loaded>> = (0..n).map(|_| None).collect();
    let deadline = options.timeout.map(|timeout| Instant::now() + timeout);
    let mut received = 0;
    let mut timed_out = false;

    while received < n {
        let message = match deadline {
            Some(deadline) => {
                match rx.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
                    Ok(message) => message,
                    Err(RecvTimeoutError::Timeout) => {
                        log::warn!("Fetch timed out with {} of {} days outstanding", n - received, n);
                        cancelled.store(true, Ordering::Release);
                        timed_out = true;
                        break;
                    }
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            None => match rx.recv() {
                Ok(message) => message,
                Err(_) => break,
            },
        };
        let (idx, result) = message;
        slots[idx] = Some(result);
        received += 1;
    }

    let unfinished = if timed_out { "timed out" } else { "worker exited without a result" };

    let records = jobs
        .into_iter()
        .zip(slots)
        .map(|(job, slot)| {
            let (outcome, version) =
                slot.unwrap_or_else(|| (DayOutcome::Failed(unfinished.to_string()), UNKNOWN_VERSION.to_string()));
            DayRecord {
                day: job.day,
                path: job.path,
                outcome,
                version,
            }
        })
        .collect();

    Ok(records)
}

/// First version other than "unknown" in day order, else "unknown".
pub fn reconcile_version(records: &[DayRecord]) -> String {
    let mut found: Option<&str> = None;
    for record in records.iter().filter(|r| r.version != UNKNOWN_VERSION) {
        match found {
            None => found = Some(&record.version),
            Some(first) if first != record.version => {
                log::debug!("{} reports version {}, keeping {}", record.day, record.version, first);
            }
            Some(_) => {}
        }
    }
    found.unwrap_or(UNKNOWN_VERSION).to_string()
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
