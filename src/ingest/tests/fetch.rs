use super::*;
use std::thread;
use std::time::Duration;

fn jobs(n: u64) -> Vec<FetchJob> {
    let start = day(2020, 1, 1);
    (0..n)
        .map(|i| {
            let d = start + chrono::Days::new(i);
            FetchJob { day: d, path: PathBuf::from(format!("{}", i)) }
        })
        .collect()
}

fn index_of(path: &Path) -> u64 {
    path.to_str().unwrap().parse().unwrap()
}

/// Earlier days sleep longer, so workers finish in reverse order.
fn slow_first_loader(n: u64) -> impl Fn(&Path) -> (DayOutcome, String) + Send + Sync + 'static {
    move |path: &Path| {
        let i = index_of(path);
        thread::sleep(Duration::from_millis((n - i) * 5));
        let d = day(2020, 1, 1) + chrono::Days::new(i);
        (DayOutcome::Loaded(day_batch(d, i as f64)), format!("v{}", i))
    }
}

#[test]
fn test_results_follow_input_order() {
    let n = 12;
    let options = FetchOptions { concurrency: 4, timeout: None };
    let records = fetch_all(jobs(n), slow_first_loader(n), &options).unwrap();

    assert_eq!(records.len(), n as usize);
    for (i, record) in records.iter().enumerate() {
        assert_eq!(record.day, day(2020, 1, 1) + chrono::Days::new(i as u64));
        assert_eq!(record.version, format!("v{}", i));
        assert_eq!(float_values(record.outcome.table().unwrap(), "value")[0], Some(i as f64));
    }
}

#[test]
fn test_concurrency_does_not_change_results() {
    let n = 9;
    let single = fetch_all(jobs(n), slow_first_loader(n), &FetchOptions { concurrency: 1, timeout: None }).unwrap();
    let many = fetch_all(jobs(n), slow_first_loader(n), &FetchOptions { concurrency: 8, timeout: None }).unwrap();

    assert_eq!(single.len(), many.len());
    for (a, b) in single.iter().zip(&many) {
        assert_eq!(a.day, b.day);
        assert_eq!(a.version, b.version);
        assert_eq!(a.outcome.table(), b.outcome.table());
    }
}

#[test]
fn test_absent_days_keep_their_slot() {
    let loader = |path: &Path| {
        if index_of(path) % 2 == 1 {
            (DayOutcome::Absent, UNKNOWN_VERSION.to_string())
        } else {
            (DayOutcome::Loaded(day_batch(day(2020, 1, 1), 0.0)), "v1".to_string())
        }
    };
    let records = fetch_all(jobs(5), loader, &FetchOptions::default()).unwrap();

    assert_eq!(records.len(), 5);
    let stats = FetchStats::from_records(&records);
    assert_eq!(stats, FetchStats { loaded: 3, absent: 2, failed: 0 });
    assert!(matches!(records[1].outcome, DayOutcome::Absent));
}

#[test]
fn test_panicking_worker_fails_only_its_day() {
    let loader = |path: &Path| {
        if index_of(path) == 2 {
            panic!("instrument file exploded");
        }
        (DayOutcome::Loaded(day_batch(day(2020, 1, 1), 0.0)), "v1".to_string())
    };
    let records = fetch_all(jobs(4), loader, &FetchOptions { concurrency: 2, timeout: None }).unwrap();

    assert_eq!(records.len(), 4);
    match &records[2].outcome {
        DayOutcome::Failed(reason) => assert!(reason.contains("instrument file exploded")),
        other => panic!("expected failure, got {:?}", other),
    }
    assert!(records.iter().enumerate().all(|(i, r)| i == 2 || r.outcome.is_loaded()));
}

#[test]
fn test_timeout_marks_unfinished_days_failed() {
    let loader = |path: &Path| {
        if index_of(path) == 2 {
            thread::sleep(Duration::from_secs(2));
        }
        (DayOutcome::Loaded(day_batch(day(2020, 1, 1), 0.0)), "v1".to_string())
    };
    let options = FetchOptions { concurrency: 2, timeout: Some(Duration::from_millis(300)) };
    let records = fetch_all(jobs(3), loader, &options).unwrap();

    assert_eq!(records.len(), 3);
    assert!(records[0].outcome.is_loaded());
    assert!(records[1].outcome.is_loaded());
    assert!(matches!(&records[2].outcome, DayOutcome::Failed(reason) if reason == "timed out"));
}

#[test]
fn test_empty_job_list() {
    let records = fetch_all(Vec::new(), |_: &Path| (DayOutcome::Absent, UNKNOWN_VERSION.to_string()), &FetchOptions::default()).unwrap();
    assert!(records.is_empty());
}

#[test]
fn test_reconcile_first_known_version_wins() {
    let d = day(2020, 1, 1);
    let records = vec![
        absent(d),
        loaded(d, day_batch(d, 0.0), UNKNOWN_VERSION),
        loaded(d, day_batch(d, 0.0), "v2"),
        loaded(d, day_batch(d, 0.0), "v3"),
    ];
    assert_eq!(reconcile_version(&records), "v2");
    assert_eq!(reconcile_version(&[absent(d)]), UNKNOWN_VERSION);
}

#[test]
fn test_timeout_skips_queued_days() {
    let started = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&started);
    let loader = move |_: &Path| {
        counter.fetch_add(1, Ordering::SeqCst);
        thread::sleep(Duration::from_millis(20));
        (DayOutcome::Absent, UNKNOWN_VERSION.to_string())
    };
    let options = FetchOptions { concurrency: 1, timeout: Some(Duration::from_millis(50)) };
    let records = fetch_all(jobs(40), loader, &options).unwrap();
    let at_return = started.load(Ordering::SeqCst);

    thread::sleep(Duration::from_millis(300));
    let after = started.load(Ordering::SeqCst);

    assert!(records.iter().any(|r| matches!(&r.outcome, DayOutcome::Failed(reason) if reason == "timed out")));
    assert!(after <= at_return + 1, "{} loads started after returning", after - at_return);
}

#[test]
fn test_default_concurrency_is_positive() {
    assert!(default_concurrency() >= 1);
}

#[test]
fn test_default_concurrency_by_core_count() {
    for (cores, expected) in [(0, 1), (1, 1), (2, 1), (4, 3), (5, 5), (8, 8)] {
        assert_eq!(default_concurrency_for(cores), expected, "cores = {}", cores);
    }
}
