//! Keyframe sink backed by object storage.

use async_trait::async_trait;
use sceneit_media::{encode_jpeg, Frame, KeyframeSink, MediaError, MediaResult};
use sceneit_models::Shot;
use sceneit_storage::{keyframe_key, S3Client};
use tracing::debug;

const JPEG_CONTENT_TYPE: &str = "image/jpeg";

/// Encodes keyframes as JPEG and uploads them under deterministic keys.
///
/// Keys depend only on the source base name, the shot index and the
/// keyframe time, so re-running a video overwrites its previous keyframes.
#[derive(Clone)]
pub struct StorageKeyframeSink {
    storage: S3Client,
    base: String,
    quality: u8,
}

impl StorageKeyframeSink {
    pub fn new(storage: S3Client, base: impl Into<String>, quality: u8) -> Self {
        Self {
            storage,
            base: base.into(),
            quality,
        }
    }

    /// Object key the keyframe of `shot` is stored under.
    pub fn key_for(&self, shot: &Shot) -> String {
        keyframe_key(
            self.storage.prefix(),
            &self.base,
            shot.shot_index,
            shot.keyframe_time_ms(),
        )
    }
}

#[async_trait]
impl KeyframeSink for StorageKeyframeSink {
    async fn store(&self, shot: &Shot, frame: &Frame) -> MediaResult<String> {
        let bytes = encode_jpeg(frame, self.quality)?;
        let key = self.key_for(shot);
        debug!(shot_index = shot.shot_index, key = %key, bytes = bytes.len(), "Uploading keyframe");

        self.storage
            .upload_bytes(bytes, &key, JPEG_CONTENT_TYPE)
            .await
            .map_err(|e| MediaError::sink(e.to_string()))?;

        Ok(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sceneit_storage::StorageConfig;

    async fn local_client(prefix: &str) -> S3Client {
        S3Client::new(StorageConfig {
            bucket: "keyframes".to_string(),
            prefix: prefix.to_string(),
            region: String::new(),
            endpoint_url: Some("http://localhost:9000".to_string()),
            access_key_id: Some("minio".to_string()),
            secret_access_key: Some("minio123".to_string()),
        })
        .await
        .unwrap()
    }

    fn shot(shot_index: usize, keyframe_time: f64) -> Shot {
        Shot {
            shot_index,
            start_frame: 0,
            end_frame: 10,
            start_time: 0.0,
            end_time: 1.0,
            keyframe_frame: 3,
            keyframe_time,
            keyframe_score: 0.9,
            keyframe_key: None,
            keyframe_url: None,
        }
    }

    #[tokio::test]
    async fn test_key_for_shot() {
        let sink = StorageKeyframeSink::new(local_client("sceneit/").await, "videos_day1_clip", 90);
        assert_eq!(
            sink.key_for(&shot(2, 4.9671)),
            "sceneit/frames/videos_day1_clip/shot_0002_t004967.jpg"
        );
    }

    #[tokio::test]
    async fn test_key_without_prefix() {
        let sink = StorageKeyframeSink::new(local_client("").await, "clip", 90);
        assert_eq!(sink.key_for(&shot(0, 0.0)), "frames/clip/shot_0000_t000000.jpg");
    }

    #[tokio::test]
    async fn test_invalid_frame_fails_before_upload() {
        let sink = StorageKeyframeSink::new(local_client("").await, "clip", 90);
        let frame = Frame::new(0, 4, 4, vec![0; 5]);
        let result = sink.store(&shot(0, 0.0), &frame).await;
        assert!(result.is_err());
    }
}
