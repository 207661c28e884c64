//! Shot detection worker binary.
//!
//! Usage: `sceneit-worker <video>` where `<video>` is a local path or an
//! `s3://bucket/key` URI. The run report is printed to stdout as JSON.

use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use sceneit_worker::{metrics, ShotProcessor, WorkerConfig};

#[tokio::main]
async fn main() {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Colored output for dev, JSON for production; logs go to stderr so
    // stdout carries only the report
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env()
        .add_directive("sceneit=info".parse().unwrap())
        .add_directive("aws_config=warn".parse().unwrap())
        .add_directive("aws_smithy_runtime=warn".parse().unwrap());

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }

    let Some(video) = std::env::args().nth(1) else {
        eprintln!("usage: sceneit-worker <video-path-or-s3-uri>");
        std::process::exit(2);
    };

    let config = WorkerConfig::from_env();
    info!("Worker config: {:?}", config);

    let metrics_handle = config
        .metrics_path
        .as_ref()
        .and_then(|_| metrics::init_metrics());
    let metrics_path = config.metrics_path.clone();

    let processor = match ShotProcessor::new(config).await {
        Ok(p) => p,
        Err(e) => {
            error!("Failed to create processor: {}", e);
            std::process::exit(1);
        }
    };

    // Ctrl-C stops the run at the next frame
    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received shutdown signal");
            cancel_tx.send(true).ok();
        }
    });

    let result = processor.with_cancel(cancel_rx).process(&video).await;

    if let (Some(handle), Some(path)) = (&metrics_handle, &metrics_path) {
        if let Err(e) = metrics::write_snapshot(handle, path).await {
            warn!("Failed to write metrics snapshot to {}: {}", path.display(), e);
        }
    }

    let run = match result {
        Ok(run) => run,
        Err(e) => {
            error!("Shot detection failed: {}", e);
            std::process::exit(if e.is_cancelled() { 130 } else { 1 });
        }
    };

    match serde_json::to_string_pretty(&run) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            error!("Failed to serialize run report: {}", e);
            std::process::exit(1);
        }
    }
}
