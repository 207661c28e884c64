//! Prometheus snapshot of a worker run.
//!
//! The worker is a one-shot process, so instead of serving `/metrics` it
//! renders the recorder once the run is over and writes the text
//! exposition to a file for a node exporter textfile collector to pick up.

use std::path::Path;

use metrics::counter;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::warn;

use crate::error::WorkerResult;

/// Metric names as constants for consistency.
pub mod names {
    pub const RUNS_TOTAL: &str = "sceneit_worker_runs_total";
    pub const SOURCE_DOWNLOADS_TOTAL: &str = "sceneit_worker_source_downloads_total";
}

/// Install the Prometheus recorder.
///
/// Returns `None` (and logs) when a recorder is already installed.
pub fn init_metrics() -> Option<PrometheusHandle> {
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!("Failed to install Prometheus recorder: {}", e);
            None
        }
    }
}

/// Write the current metric values to `path`.
pub async fn write_snapshot(handle: &PrometheusHandle, path: &Path) -> WorkerResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, handle.render()).await?;
    Ok(())
}

/// Record a finished run.
pub fn record_run(outcome: &str) {
    counter!(names::RUNS_TOTAL, "outcome" => outcome.to_string()).increment(1);
}

/// Record a source fetched from object storage.
pub fn record_source_download() {
    counter!(names::SOURCE_DOWNLOADS_TOTAL).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_snapshot_contains_recorded_counters() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        metrics::with_local_recorder(&recorder, || {
            record_run("success");
            record_source_download();
        });

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("textfile").join("sceneit.prom");
        write_snapshot(&handle, &path).await.unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains(names::RUNS_TOTAL));
        assert!(text.contains("outcome=\"success\""));
        assert!(text.contains(names::SOURCE_DOWNLOADS_TOTAL));
    }
}
