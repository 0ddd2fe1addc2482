//! CLI entry point for the Seoul subway position monitor.
//!
//! `collect` runs the polling daemon; the analysis subcommands read recent
//! history back from the position store and print a report.

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::ffi::OsStr;
use std::path::Path;
use std::time::Duration;
use subway_monitor::analyzers::analyzer::{AnalysisKind, load_events, run_analysis};
use subway_monitor::collector::Collector;
use subway_monitor::config::{ApiConfig, Config, StoreConfig};
use subway_monitor::fetch::BasicClient;
use subway_monitor::infra::seoul::SeoulMetroClient;
use subway_monitor::infra::store::open_store;
use subway_monitor::position::map_positions;
use subway_monitor::scheduler::{Scheduler, SystemClock};
use subway_monitor::services::{PositionApi, PositionStore};
use tracing::{error, info};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Parser)]
#[command(name = "subway_monitor")]
#[command(about = "Collects and analyzes Seoul subway train positions", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll every target line on a fixed interval and store the positions
    Collect {
        /// Seconds between collection cycles
        #[arg(short = 'i', long, default_value_t = 60)]
        interval_secs: u64,

        /// Number of cycles to run (0 = until interrupted)
        #[arg(short = 'n', long, default_value_t = 0)]
        cycles: usize,

        /// Optional CSV file to append per-line cycle outcomes to
        #[arg(long)]
        summary_csv: Option<String>,
    },
    /// Report stations where trains dwell longest
    Dwell(AnalysisArgs),
    /// Report how regular arrival intervals are per station and direction
    Intervals(AnalysisArgs),
    /// Report how long trains take to reverse direction at a station
    Turnaround(AnalysisArgs),
    /// Count express and local observations on a line
    Interference(AnalysisArgs),
    /// Fetch a handful of positions for one line and print a sample
    VerifyApi {
        /// Line name as the upstream API expects it
        #[arg(long, default_value = "1호선")]
        line_name: String,
    },
    /// Print the status codes of the most recent stored rows
    Inspect {
        #[arg(long, default_value = "1002")]
        line_id: String,

        #[arg(long, default_value_t = 50)]
        limit: usize,
    },
}

#[derive(Args)]
struct AnalysisArgs {
    /// Numeric line identifier, e.g. 1002 for line 2
    #[arg(long)]
    line_id: Option<String>,

    /// Number of most recent rows to analyze
    #[arg(long)]
    limit: Option<usize>,
}

impl AnalysisArgs {
    fn resolve(self, kind: AnalysisKind) -> (String, usize) {
        let default_line = match kind {
            AnalysisKind::Interference => "1009",
            _ => "1002",
        };
        (
            self.line_id.unwrap_or_else(|| default_line.to_string()),
            self.limit.unwrap_or_else(|| kind.default_limit()),
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/subway_monitor.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("subway_monitor.log"));

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
        Commands::Collect {
            interval_secs,
            cycles,
            summary_csv,
        } => collect(interval_secs, cycles, summary_csv).await?,
        Commands::Dwell(args) => analyze(AnalysisKind::Dwell, args).await?,
        Commands::Intervals(args) => analyze(AnalysisKind::Interval, args).await?,
        Commands::Turnaround(args) => analyze(AnalysisKind::Turnaround, args).await?,
        Commands::Interference(args) => analyze(AnalysisKind::Interference, args).await?,
        Commands::VerifyApi { line_name } => verify_api(&line_name).await?,
        Commands::Inspect { line_id, limit } => inspect(&line_id, limit).await?,
    }

    Ok(())
}

/// Runs collection cycles until the requested count is reached or Ctrl+C.
#[tracing::instrument(skip(summary_csv))]
async fn collect(interval_secs: u64, cycles: usize, summary_csv: Option<String>) -> Result<()> {
    let config = match Config::from_env() {
        Ok(config) => config.with_poll_interval(Duration::from_secs(interval_secs)),
        Err(e) => {
            error!(error = %e, "Configuration failed");
            return Err(e.into());
        }
    };

    info!("=== Seoul Subway Monitoring System Started ===");
    info!(
        backend = config.store.backend(),
        lines = config.target_lines.len(),
        interval_secs,
        "Collector configured"
    );

    let store = open_store(&config.store).await?;
    let api = SeoulMetroClient::from_config(BasicClient::with_timeout(HTTP_TIMEOUT)?, &config.api);

    let mut collector = Collector::new(api, store, config.target_lines.clone());
    if let Some(path) = summary_csv {
        info!(path = %path, "Appending cycle summaries");
        collector = collector.with_summary_csv(path);
    }

    let scheduler =
        Scheduler::every(config.poll_interval).with_max_runs((cycles > 0).then_some(cycles));

    if cycles == 0 {
        info!("Collecting until interrupted. Press Ctrl+C to stop.");
    }

    tokio::select! {
        runs = scheduler.run(&SystemClock, &mut collector) => {
            info!(runs, "Finished requested cycles");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Monitoring stopped by user");
        }
    }

    Ok(())
}

/// Configuration or connection problems are reported on stdout, not as a failure.
async fn analyze(kind: AnalysisKind, args: AnalysisArgs) -> Result<()> {
    let (line_id, limit) = args.resolve(kind);

    let Some(store) = store_from_env().await else {
        return Ok(());
    };

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    run_analysis(&store, &mut out, kind, &line_id, limit).await?;
    Ok(())
}

async fn store_from_env() -> Option<Box<dyn PositionStore>> {
    let config = match StoreConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            println!("{e}");
            return None;
        }
    };

    match open_store(&config).await {
        Ok(store) => Some(store),
        Err(e) => {
            error!(backend = config.backend(), error = %e, "Failed to open position store");
            println!("Failed to open position store: {e}");
            None
        }
    }
}

async fn verify_api(line_name: &str) -> Result<()> {
    let config = ApiConfig::from_env()?;
    let api = SeoulMetroClient::from_config(BasicClient::with_timeout(HTTP_TIMEOUT)?, &config)
        .with_window(0, 5);

    println!("Testing API for {line_name}...");
    match api.realtime_positions(line_name).await {
        Ok(items) => {
            println!("Success! Found {} trains.", items.len());
            let batch = map_positions(items);
            if let Some(sample) = batch.records.first() {
                let status = sample
                    .train_status_code
                    .map_or_else(|| "-".to_string(), |code| code.to_string());
                println!(
                    "Sample: {} - {} ({})",
                    sample.train_number, sample.station_name, status
                );
            }
        }
        Err(e) => println!("Failed: {e}"),
    }

    Ok(())
}

async fn inspect(line_id: &str, limit: usize) -> Result<()> {
    let Some(store) = store_from_env().await else {
        return Ok(());
    };

    let events = load_events(&store, line_id, limit).await;
    let codes: Vec<Option<i32>> = events
        .iter()
        .map(|e| e.record.train_status_code)
        .collect();

    println!("Fetched {} rows for line {line_id}", events.len());
    println!("train_status_code (oldest first): {}", serde_json::to_string(&codes)?);
    Ok(())
}
