//! CLI entry point for the waste tile tools.
//!
//! Provides subcommands for aggregating raw telemetry into daily tiles,
//! forecasting tiles from an aggregate table, and running both end to end
//! with optional publishing to S3.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};
use waste_tiles::{
    config::PipelineConfig,
    forecast::{ForecastReport, forecast_tiles},
    output::{read_aggregates, write_aggregates, write_json},
    publish::{LocalPublisher, S3Publisher, publish_forecasts},
    telemetry::read_telemetry,
    tiles::{aggregate, daily_totals},
};

#[derive(Parser)]
#[command(name = "waste_tiles")]
#[command(about = "Aggregate waste telemetry into map tiles and forecast them", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Bucket a telemetry CSV into daily tile aggregates
    Aggregate {
        /// Telemetry CSV (optionally .gz)
        #[arg(value_name = "TELEMETRY_CSV")]
        input: PathBuf,

        /// CSV file to write aggregates to
        #[arg(short, long, default_value = "aggregates.csv")]
        output: PathBuf,

        /// Decimal places kept when rounding coordinates into tiles
        #[arg(short = 'p', long)]
        tile_precision: Option<u32>,

        /// JSON file with pipeline settings
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Forecast every tile in an aggregate CSV
    Forecast {
        /// Aggregate CSV produced by `aggregate`
        #[arg(value_name = "AGGREGATES_CSV")]
        input: PathBuf,

        /// JSON file to write forecasts to
        #[arg(short, long, default_value = "forecasts.json")]
        output: PathBuf,

        /// Number of days to project past the last observation
        #[arg(short = 'd', long)]
        horizon_days: Option<usize>,

        /// JSON file with pipeline settings
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Aggregate, forecast and publish in one pass
    Run {
        /// Telemetry CSV (optionally .gz)
        #[arg(value_name = "TELEMETRY_CSV")]
        input: PathBuf,

        /// Directory for aggregates.csv, forecasts.json and per-tile JSON
        #[arg(long, default_value = "out")]
        out_dir: PathBuf,

        #[arg(short = 'p', long)]
        tile_precision: Option<u32>,

        #[arg(short = 'd', long)]
        horizon_days: Option<usize>,

        /// JSON file with pipeline settings
        #[arg(long)]
        config: Option<PathBuf>,

        /// Optional: S3 bucket to publish per-tile forecasts to instead of `out_dir`
        #[arg(long)]
        s3_bucket: Option<String>,
    },
}

fn resolve_config(
    path: Option<&Path>,
    tile_precision: Option<u32>,
    horizon_days: Option<usize>,
) -> Result<PipelineConfig> {
    let base = match path {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::default(),
    };
    let config = base.with_overrides(tile_precision, horizon_days);
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/waste_tiles.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("waste_tiles.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Aggregate {
            input,
            output,
            tile_precision,
            config,
        } => {
            let config = resolve_config(config.as_deref(), tile_precision, None)?;
            let records = read_telemetry(&input)?;
            let outcome = aggregate(&records, config.tile_precision)?;

            write_aggregates(&output, &outcome.rows)?;
            info!(
                input_rows = outcome.input_rows,
                dropped = outcome.dropped.total(),
                buckets = outcome.rows.len(),
                output = %output.display(),
                "Aggregates written"
            );
        }
        Commands::Forecast {
            input,
            output,
            horizon_days,
            config,
        } => {
            let config = resolve_config(config.as_deref(), None, horizon_days)?;
            let rows = read_aggregates(&input)?;
            let forecasts = forecast_tiles(&rows, config.horizon_days)?;
            let report = ForecastReport::new(forecasts, config.horizon_days);

            write_json(&output, &report)?;
            info!(
                tiles = report.tiles.len(),
                horizon_days = config.horizon_days,
                output = %output.display(),
                "Forecasts written"
            );
        }
        Commands::Run {
            input,
            out_dir,
            tile_precision,
            horizon_days,
            config,
            s3_bucket,
        } => {
            let config = resolve_config(config.as_deref(), tile_precision, horizon_days)?;
            run_pipeline(&input, &out_dir, config, s3_bucket).await?;
        }
    }

    Ok(())
}

/// Aggregates and forecasts one telemetry file, writing the aggregate CSV and
/// the forecast report to `out_dir` and publishing per-tile JSON.
#[tracing::instrument(skip_all, fields(input = %input.display(), out_dir = %out_dir.display()))]
async fn run_pipeline(
    input: &Path,
    out_dir: &Path,
    config: PipelineConfig,
    s3_bucket: Option<String>,
) -> Result<()> {
    std::fs::create_dir_all(out_dir)?;

    let records = read_telemetry(input)?;
    let outcome = aggregate(&records, config.tile_precision)?;
    info!(
        input_rows = outcome.input_rows,
        bad_coordinates = outcome.dropped.bad_coordinates,
        bad_timestamp = outcome.dropped.bad_timestamp,
        buckets = outcome.rows.len(),
        "Telemetry aggregated"
    );

    for day in daily_totals(&outcome.rows) {
        info!(
            date = %day.date,
            tiles = day.tiles,
            waste_count = day.waste_count,
            weighted_count = day.weighted_count,
            total_mass = day.total_mass,
            "Daily total"
        );
    }

    write_aggregates(&out_dir.join("aggregates.csv"), &outcome.rows)?;

    let forecasts = forecast_tiles(&outcome.rows, config.horizon_days)?;
    let report = ForecastReport::new(forecasts, config.horizon_days);
    write_json(&out_dir.join("forecasts.json"), &report)?;

    let published = match s3_bucket {
        Some(bucket) => {
            info!(bucket = %bucket, "S3 upload enabled");
            publish_forecasts(&S3Publisher::from_env(bucket).await, &report).await?
        }
        None => publish_forecasts(&LocalPublisher::new(out_dir), &report).await?,
    };

    info!(
        tiles = report.tiles.len(),
        published,
        horizon_days = config.horizon_days,
        "Pipeline finished"
    );
    Ok(())
}
