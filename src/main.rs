use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use arrow::util::pretty::pretty_format_batches;
use chrono::NaiveDate;
use clap::Parser;

use fluxcache::{ingest, DatasetSource, IngestConfig};

#[derive(Parser, Debug)]
#[command(name = "fluxcache")]
#[command(about = "Assemble per-day campaign flux files into one dataset")]
struct Args {
    /// Station name (tower, asfs30, asfs40, asfs50)
    #[arg(long)]
    station: String,

    /// First day, YYYY-MM-DD
    #[arg(long)]
    start: NaiveDate,

    /// Last day (inclusive), YYYY-MM-DD
    #[arg(long)]
    end: NaiveDate,

    /// Processing level (1 = ingest, 2 = product, 3 = archive)
    #[arg(long, default_value_t = 2)]
    level: i64,

    /// Data type tag, e.g. slow, fast, seb
    #[arg(long, default_value = "slow")]
    data_type: String,

    /// Campaign data root
    #[arg(long, env = "FLUXCACHE_DATA_DIR")]
    data_dir: PathBuf,

    /// Worker threads (default: number of CPU cores)
    #[arg(long)]
    concurrency: Option<usize>,

    /// Cache directory; caching is off when omitted
    #[arg(long, env = "FLUXCACHE_CACHE_DIR")]
    cache_dir: Option<PathBuf>,

    /// Ignore any cached dataset and rewrite it
    #[arg(long)]
    refresh_cache: bool,

    /// Give up on days still loading after this many seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Source file extension override
    #[arg(long)]
    extension: Option<String>,

    /// Rows to print from the start of the dataset
    #[arg(long, default_value_t = 10)]
    preview: usize,
}

fn build_config(args: &Args) -> fluxcache::Result<IngestConfig> {
    let mut config = IngestConfig::parse(
        &args.station,
        args.start,
        args.end,
        args.level,
        &args.data_type,
        &args.data_dir,
    )?
    .with_refresh_cache(args.refresh_cache);

    if let Some(concurrency) = args.concurrency {
        config = config.with_concurrency(concurrency);
    }
    if let Some(cache_dir) = &args.cache_dir {
        config = config.with_cache_dir(cache_dir);
    }
    if let Some(secs) = args.timeout_secs {
        config = config.with_fetch_timeout(Duration::from_secs(secs));
    }
    if let Some(extension) = &args.extension {
        config = config.with_source_extension(extension.as_str());
    }
    Ok(config)
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let config = match build_config(&args) {
        Ok(config) => config,
        Err(e) => {
            log::error!("Invalid configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let result = match ingest(&config) {
        Ok(result) => result,
        Err(e) => {
            log::error!("Ingestion failed: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let origin = match &result.source {
        DatasetSource::Cache(path) => format!("cache {}", path.display()),
        DatasetSource::Fetched(stats) => format!(
            "{} loaded, {} absent, {} failed days",
            stats.loaded, stats.absent, stats.failed
        ),
    };
    println!("version: {}", result.version);
    println!("source:  {}", origin);
    println!(
        "shape:   {} rows x {} columns",
        result.dataset.num_rows(),
        result.dataset.num_columns()
    );

    if args.preview > 0 && result.dataset.num_rows() > 0 {
        let head = result.dataset.slice(0, args.preview.min(result.dataset.num_rows()));
        match pretty_format_batches(&[head]) {
            Ok(table) => println!("{}", table),
            Err(e) => log::warn!("Cannot render preview: {}", e),
        }
    }

    ExitCode::SUCCESS
}
