//! Shot detection run orchestration.
//!
//! Resolves the source (local path or `s3://` URI), opens it through
//! FFmpeg, runs the pipeline with a storage-backed keyframe sink and
//! optionally attaches presigned URLs to the stored keyframes.

use std::path::PathBuf;

use sceneit_media::{FfmpegVideoSource, KeyframeSink, MediaError, ShotPipeline};
use sceneit_models::ShotRun;
use sceneit_storage::{is_s3_uri, parse_s3_uri, source_base_name, S3Client};
use tempfile::TempDir;
use tokio::sync::watch;
use tracing::Instrument;

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::logging::RunLogger;
use crate::metrics;
use crate::sink::StorageKeyframeSink;

/// A source video available on the local filesystem.
#[derive(Debug)]
struct ResolvedSource {
    path: PathBuf,
    /// Object key when the video came from storage
    source_key: Option<String>,
    /// Keeps the download directory alive until the run ends
    _workdir: Option<TempDir>,
}

/// Runs shot detection for one video at a time.
pub struct ShotProcessor {
    config: WorkerConfig,
    storage: Option<S3Client>,
    cancel_rx: Option<watch::Receiver<bool>>,
}

impl ShotProcessor {
    /// Create a processor, connecting to storage when it is configured.
    pub async fn new(config: WorkerConfig) -> WorkerResult<Self> {
        config.validate()?;
        let storage = match &config.storage {
            Some(storage_config) => Some(S3Client::new(storage_config.clone()).await?),
            None => None,
        };
        Ok(Self::with_storage(config, storage))
    }

    /// Create a processor around an existing storage client.
    pub fn with_storage(config: WorkerConfig, storage: Option<S3Client>) -> Self {
        Self {
            config,
            storage,
            cancel_rx: None,
        }
    }

    /// Set cancellation signal.
    pub fn with_cancel(mut self, cancel_rx: watch::Receiver<bool>) -> Self {
        self.cancel_rx = Some(cancel_rx);
        self
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Detect the shots of `video`, a local path or an `s3://bucket/key` URI.
    pub async fn process(&self, video: &str) -> WorkerResult<ShotRun> {
        let logger = RunLogger::new("shot_detection");
        let span = logger.create_span();
        logger.log_start(video);

        let result = tokio::time::timeout(
            self.config.job_timeout,
            self.process_inner(video, &logger).instrument(span),
        )
        .await
        .unwrap_or(Err(WorkerError::Timeout(self.config.job_timeout)));

        match &result {
            Ok(run) => {
                metrics::record_run("success");
                logger.log_completion(&format!(
                    "{} shots from {} frames",
                    run.shots.len(),
                    run.frame_count
                ));
            }
            Err(e) if e.is_cancelled() => {
                metrics::record_run("cancelled");
                logger.log_warning("cancelled");
            }
            Err(e) => {
                metrics::record_run("error");
                logger.log_error(&e.to_string());
            }
        }
        result
    }

    async fn process_inner(&self, video: &str, logger: &RunLogger) -> WorkerResult<ShotRun> {
        let resolved = self.resolve_source(video).await?;
        let source = FfmpegVideoSource::open(&resolved.path, self.config.decoder.clone()).await?;

        let sink = self.keyframe_sink(&resolved, logger);
        let mut pipeline = ShotPipeline::new(self.config.detection.clone());
        if let Some(cancel_rx) = &self.cancel_rx {
            pipeline = pipeline.with_cancel(cancel_rx.clone());
        }

        let mut run = pipeline
            .run(&source, sink.as_ref().map(|s| s as &dyn KeyframeSink))
            .await?;
        run.source = video.to_string();

        if run.stats.keyframe_store_failures > 0 {
            logger.log_warning(&format!(
                "{} keyframes could not be stored",
                run.stats.keyframe_store_failures
            ));
        }

        self.attach_keyframe_urls(&mut run, logger).await;
        Ok(run)
    }

    /// Make `video` available locally, downloading `s3://` sources into a
    /// temporary directory under the work directory.
    async fn resolve_source(&self, video: &str) -> WorkerResult<ResolvedSource> {
        if !is_s3_uri(video) {
            let path = PathBuf::from(video);
            if !tokio::fs::try_exists(&path).await? {
                return Err(MediaError::FileNotFound(path).into());
            }
            return Ok(ResolvedSource {
                path,
                source_key: None,
                _workdir: None,
            });
        }

        let location = parse_s3_uri(video)?;
        let storage = self.storage.as_ref().ok_or_else(|| {
            WorkerError::config_error(format!("{} requires S3_BUCKET to be configured", video))
        })?;

        tokio::fs::create_dir_all(&self.config.work_dir).await?;
        let workdir = tempfile::Builder::new()
            .prefix("sceneit-")
            .tempdir_in(&self.config.work_dir)?;
        let path = workdir.path().join(location.file_name());

        storage.download_file(&location, &path).await?;
        metrics::record_source_download();

        Ok(ResolvedSource {
            path,
            source_key: Some(location.key),
            _workdir: Some(workdir),
        })
    }

    fn keyframe_sink(
        &self,
        resolved: &ResolvedSource,
        logger: &RunLogger,
    ) -> Option<StorageKeyframeSink> {
        if !self.config.detection.save_frames {
            return None;
        }
        match &self.storage {
            Some(storage) => Some(StorageKeyframeSink::new(
                storage.clone(),
                base_name(resolved),
                self.config.jpeg_quality,
            )),
            None => {
                logger.log_warning("no bucket configured, keyframes will not be stored");
                None
            }
        }
    }

    async fn attach_keyframe_urls(&self, run: &mut ShotRun, logger: &RunLogger) {
        let (Some(expiry), Some(storage)) = (self.config.keyframe_url_expiry, &self.storage) else {
            return;
        };

        for shot in &mut run.shots {
            let Some(key) = &shot.keyframe_key else {
                continue;
            };
            match storage.presign_get(key, expiry).await {
                Ok(url) => shot.keyframe_url = Some(url),
                Err(e) => logger.log_warning(&format!(
                    "presign failed for shot {}: {}",
                    shot.shot_index, e
                )),
            }
        }
    }
}

fn base_name(resolved: &ResolvedSource) -> String {
    source_base_name(resolved.source_key.as_deref(), &resolved.path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn processor(storage: Option<S3Client>) -> ShotProcessor {
        ShotProcessor::with_storage(WorkerConfig::default(), storage)
    }

    #[tokio::test]
    async fn test_missing_local_file() {
        let err = processor(None)
            .process("/nonexistent/dir/video.mp4")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            WorkerError::Media(MediaError::FileNotFound(_))
        ));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_s3_source_without_storage() {
        let err = processor(None)
            .process("s3://media/uploads/clip.mp4")
            .await
            .unwrap_err();
        assert!(matches!(err, WorkerError::ConfigError(_)));
    }

    #[tokio::test]
    async fn test_malformed_s3_uri() {
        let err = processor(None).process("s3://media").await.unwrap_err();
        assert!(matches!(err, WorkerError::Storage(_)));
    }

    #[tokio::test]
    async fn test_new_rejects_invalid_config() {
        let mut config = WorkerConfig::default();
        config.jpeg_quality = 0;
        assert!(matches!(
            ShotProcessor::new(config).await,
            Err(WorkerError::ConfigError(_))
        ));
    }

    #[test]
    fn test_base_name_prefers_object_key() {
        let resolved = ResolvedSource {
            path: PathBuf::from("/tmp/sceneit-abc/clip.mp4"),
            source_key: Some("uploads/2024/clip.mp4".to_string()),
            _workdir: None,
        };
        assert_eq!(base_name(&resolved), "uploads_2024_clip");

        let local = ResolvedSource {
            path: PathBuf::from("/videos/holiday.mov"),
            source_key: None,
            _workdir: None,
        };
        assert_eq!(base_name(&local), "holiday");
    }
}
