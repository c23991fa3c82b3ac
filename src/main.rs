//! CLI entry point for the disaster intelligence pipeline.
//!
//! Provides subcommands for ingesting a single feed payload, monitoring all
//! registered sources continuously, scoring ad-hoc weather telemetry, and
//! probing source health.

mod services;

use crate::services::registry::{FeedAuth, FeedSource, SourceCatalog, StaticCatalog};
use anyhow::Result;
use chrono::{Duration, Utc};
use clap::{Parser, Subcommand};
use disastro_pipeline::{
    adapters::{
        DeclarationsAdapter, FeedAdapter, SeismicAdapter, WeatherAdapter, WildfireAdapter,
    },
    fetch::{BasicClient, auth::UrlParam, fetch_bytes, probe_health},
    model::{Coordinates, FeedKind, WeatherSample},
    output::{append_record, print_json, print_pretty},
    predict,
    stats::PipelineStats,
    transport::{Pipeline, TransportEvent},
};
use std::ffi::OsStr;
use std::path::Path;
use tracing::Instrument;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "disastro_pipeline")]
#[command(about = "Real-time disaster feed reconciliation and prediction", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest one feed payload from a file or URL and print the resulting stats
    Ingest {
        /// Path to file or URL to fetch
        #[arg(value_name = "FILE_OR_URL")]
        source: String,

        /// Which feed the payload belongs to (seismic, wildfire, weather, declarations)
        #[arg(short, long)]
        feed: String,

        /// CSV file to append the stats row to
        #[arg(short, long, default_value = "data.csv")]
        output: String,
    },
    /// Poll all registered sources continuously and reconcile them
    Monitor {
        /// Directory to save daily CSV snapshot files
        #[arg(short, long, default_value = "snapshots")]
        output_dir: String,

        /// Maximum number of concurrent source fetches
        #[arg(short, long, default_value_t = 4)]
        concurrency: usize,

        /// Sample rate: poll each source every X seconds
        #[arg(short = 'r', long, default_value_t = 60)]
        sample_rate: u64,

        /// Number of rounds to run (0 = infinite)
        #[arg(short = 'n', long, default_value_t = 1)]
        num_samples: usize,
    },
    /// Score one ad-hoc weather observation and print any predictions
    Predict {
        #[arg(long)]
        lat: f64,

        #[arg(long)]
        lng: f64,

        /// Air temperature, °C
        #[arg(short, long)]
        temperature: Option<f64>,

        /// Atmospheric pressure, hPa
        #[arg(short, long)]
        pressure: Option<f64>,

        /// Relative humidity, percent
        #[arg(long)]
        humidity: Option<f64>,

        /// Wind speed, km/h
        #[arg(short, long)]
        wind: Option<f64>,
    },
    /// Probe every registered source and report reachability
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path = std::env::var("LOG_FILE_PATH")
        .unwrap_or_else(|_| "logs/disastro_pipeline.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("disastro_pipeline.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse().unwrap()));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse().unwrap()));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Ingest {
            source,
            feed,
            output,
        } => {
            let kind = parse_feed_kind(&feed)?;
            let adapter = adapter_for(kind)
                .ok_or_else(|| anyhow::anyhow!("no adapter for feed kind {kind}"))?;

            let bytes = fetcher(&source).await?;
            let batch = adapter.adapt(&bytes)?;
            if batch.skipped_rows > 0 {
                warn!(skipped = batch.skipped_rows, "Some rows could not be normalized");
            }

            let mut pipeline = Pipeline::new();
            let (merged, emitted) = pipeline.ingest_batch(kind, batch);
            info!(merged, emitted, "Payload ingested");

            let stats = PipelineStats::from_collections(
                &pipeline.events.snapshot(),
                &pipeline.predictions.snapshot(),
            );
            append_record(&output, &stats)?;
            print_json(&stats)?;
        }
        Commands::Monitor {
            output_dir,
            concurrency,
            sample_rate,
            num_samples,
        } => {
            monitor(&output_dir, concurrency, sample_rate, num_samples).await?;
        }
        Commands::Predict {
            lat,
            lng,
            temperature,
            pressure,
            humidity,
            wind,
        } => {
            let coordinates = Coordinates::new(lat, lng)
                .ok_or_else(|| anyhow::anyhow!("coordinates out of range: {lat}, {lng}"))?;
            let sample = WeatherSample {
                coordinates,
                temperature_c: temperature,
                pressure_hpa: pressure,
                humidity_pct: humidity,
                wind_speed_kmh: wind,
                condition_code: String::new(),
            };

            let predictions = predict::evaluate(&sample, &[], Utc::now());
            info!(count = predictions.len(), "Scoring complete");
            for prediction in &predictions {
                info!("{}", serde_json::to_string_pretty(prediction)?);
            }
        }
        Commands::Health => {
            let catalog = StaticCatalog::default();
            let sources = catalog.list_sources().await?;
            let client = BasicClient::new();

            let mut reachable = 0;
            for source in &sources {
                let up = probe_health(&client, &source.url).await;
                if up {
                    reachable += 1;
                }
                info!(
                    source_id = %source.id,
                    source_name = %source.name,
                    feed = %source.kind,
                    up,
                    "Source probed"
                );
            }

            info!(total = sources.len(), reachable, "Health check summary");
            if reachable == 0 {
                anyhow::bail!("no registered source is reachable");
            }
        }
    }

    Ok(())
}

/// Loads feed data from a local file path or fetches it over HTTP.
#[tracing::instrument(fields(source = %url))]
async fn fetcher(url: &String) -> Result<Vec<u8>> {
    let bytes = if url.starts_with("http") {
        let client = BasicClient::new();
        fetch_bytes(&client, url).await?
    } else {
        std::fs::read(url)?
    };
    Ok(bytes)
}

fn parse_feed_kind(name: &str) -> Result<FeedKind> {
    match name.to_lowercase().as_str() {
        "seismic" => Ok(FeedKind::Seismic),
        "wildfire" => Ok(FeedKind::Wildfire),
        "weather" => Ok(FeedKind::Weather),
        "declarations" => Ok(FeedKind::Declarations),
        other => Err(anyhow::anyhow!("unknown feed kind: {other}")),
    }
}

/// Picks the adapter for a feed. Predictions have no adapter: they are
/// produced internally, never fetched.
fn adapter_for(kind: FeedKind) -> Option<Box<dyn FeedAdapter>> {
    match kind {
        FeedKind::Seismic => Some(Box::new(SeismicAdapter)),
        FeedKind::Wildfire => Some(Box::new(WildfireAdapter)),
        FeedKind::Weather => Some(Box::new(WeatherAdapter)),
        FeedKind::Declarations => Some(Box::new(DeclarationsAdapter)),
        FeedKind::Predictions => None,
    }
}

/// Fetches one source's payload, honoring its credential scheme.
async fn fetch_source(source: &FeedSource) -> Result<Vec<u8>> {
    match &source.auth {
        FeedAuth::None => fetch_bytes(&BasicClient::new(), &source.url).await,
        FeedAuth::UrlParam { param_name, env_key: _ } => {
            let key = source
                .auth
                .resolve_key()?
                .ok_or_else(|| anyhow::anyhow!("credential resolution returned nothing"))?;
            let client = UrlParam {
                inner: BasicClient::new(),
                param_name: param_name.clone(),
                key,
            };
            fetch_bytes(&client, &source.url).await
        }
    }
}

/// Polls every registered source concurrently, reconciling each round into
/// the shared pipeline and appending a stats snapshot per round.
#[tracing::instrument(fields(output_dir, concurrency, sample_rate, num_samples))]
async fn monitor(
    output_dir: &str,
    concurrency: usize,
    sample_rate: u64,
    num_samples: usize,
) -> Result<()> {
    let catalog = StaticCatalog::default();
    let sources = catalog.list_sources().await?;

    let mut pipeline = Pipeline::new();
    pipeline.dispatch(TransportEvent::Connect);

    // The monitor is itself a consumer: only kinds with at least one
    // registered interest get polled.
    for source in &sources {
        pipeline.subscriptions.subscribe(source.kind, "monitor");
    }

    pipeline.events.subscribe(Box::new(|snapshot| {
        debug!(events = snapshot.len(), "Events collection updated");
        Ok(())
    }));

    info!(source_count = sources.len(), "Sources ready for polling");

    if num_samples == 0 {
        info!(sample_rate, "Sampling infinitely. Press Ctrl+C to stop.");
    } else {
        info!(num_samples, sample_rate, "Starting sample collection");
    }

    std::fs::create_dir_all(output_dir)?;

    let semaphore = std::sync::Arc::new(tokio::sync::Semaphore::new(concurrency));
    // Sources older than two polling intervals count as stale.
    let max_age = Duration::seconds(2 * sample_rate as i64);

    let mut sample_count: u64 = 0;

    loop {
        if num_samples > 0 && sample_count >= num_samples as u64 {
            break;
        }

        sample_count += 1;

        info!(
            sample = sample_count,
            total = if num_samples == 0 {
                None
            } else {
                Some(num_samples)
            },
            "Starting sample round"
        );

        let mut tasks = vec![];

        for source in &sources {
            if !pipeline.subscriptions.is_engaged(source.kind) {
                continue;
            }

            let sem = semaphore.clone();
            let source = source.clone();

            let source_span = tracing::info_span!(
                "poll_source",
                source_id = %source.id,
                source_name = %source.name,
            );

            let task = tokio::spawn(
                async move {
                    let _permit = match sem.acquire().await {
                        Ok(permit) => permit,
                        Err(_) => return (source, Err(anyhow::anyhow!("semaphore closed"))),
                    };

                    let fetch_start = std::time::Instant::now();
                    let result = match fetch_source(&source).await {
                        Ok(bytes) => {
                            let elapsed = fetch_start.elapsed();
                            if elapsed.as_secs() > 15 {
                                warn!(elapsed_secs = elapsed.as_secs(), "Source fetch was slow");
                            }
                            debug!(bytes = bytes.len(), "Payload received, adapting");
                            match adapter_for(source.kind) {
                                Some(adapter) => adapter.adapt(&bytes),
                                None => Err(anyhow::anyhow!("no adapter for {}", source.kind)),
                            }
                        }
                        Err(e) => Err(e),
                    };

                    (source, result)
                }
                .instrument(source_span),
            );

            tasks.push(task);
        }

        // Reconcile serially in arrival order; the stores are single-writer.
        let date = Utc::now().format("%Y-%m-%d").to_string();
        let output_file = format!("{output_dir}/date={date}.csv");

        for task in tasks {
            let Ok((source, result)) = task.await else {
                continue;
            };

            match result {
                Ok(batch) => {
                    if batch.skipped_rows > 0 {
                        warn!(
                            source_id = %source.id,
                            skipped = batch.skipped_rows,
                            "Some rows could not be normalized"
                        );
                    }
                    let (merged, emitted) = pipeline.ingest_batch(source.kind, batch);
                    info!(
                        source_id = %source.id,
                        merged,
                        emitted,
                        "Source reconciled"
                    );
                }
                Err(e) => {
                    error!(source_id = %source.id, error = %e, "Source poll failed");
                    let error_stats = PipelineStats::from_error("poll_error", &e.to_string())
                        .with_round(sample_count);
                    let _ = append_record(&output_file, &error_stats);
                }
            }
        }

        let now = Utc::now();
        let aged = pipeline.age_predictions(now);
        if aged > 0 {
            info!(aged, "Predictions aged out");
        }

        for source in &sources {
            if !pipeline.health.is_healthy(source.kind, max_age, now) {
                warn!(feed = %source.kind, "Feed is stale or disconnected");
            }
        }

        let stats = PipelineStats::from_collections(
            &pipeline.events.snapshot(),
            &pipeline.predictions.snapshot(),
        )
        .with_round(sample_count);
        print_pretty(&stats);
        append_record(&output_file, &stats)?;

        // If not the last sample, wait before next iteration
        if num_samples == 0 || sample_count < num_samples as u64 {
            info!(sample_rate, "Waiting before next sample");
            tokio::select! {
                _ = tokio::time::sleep(tokio::time::Duration::from_secs(sample_rate)) => {}
                _ = tokio::signal::ctrl_c() => {
                    info!("Interrupt received, shutting down");
                    pipeline.dispatch(TransportEvent::Disconnect);
                    break;
                }
            }
        }
    }

    info!(output_dir, "Finished monitoring");
    Ok(())
}
