//! Object locations and deterministic keyframe keys.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use url::Url;

use crate::error::{StorageError, StorageResult};

/// URI scheme for object storage sources.
pub const S3_SCHEME: &str = "s3";

/// A bucket and key pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct S3Location {
    pub bucket: String,
    pub key: String,
}

impl S3Location {
    /// Last path segment of the key.
    pub fn file_name(&self) -> &str {
        self.key.rsplit('/').next().unwrap_or(&self.key)
    }
}

impl fmt::Display for S3Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s3://{}/{}", self.bucket, self.key)
    }
}

/// Whether `source` looks like an `s3://` URI.
pub fn is_s3_uri(source: &str) -> bool {
    source.starts_with("s3://")
}

/// Parse `s3://bucket/key` into its parts.
pub fn parse_s3_uri(uri: &str) -> StorageResult<S3Location> {
    let url = Url::parse(uri).map_err(|e| StorageError::invalid_uri(format!("{}: {}", uri, e)))?;

    if url.scheme() != S3_SCHEME {
        return Err(StorageError::invalid_uri(format!(
            "{}: expected s3:// scheme",
            uri
        )));
    }

    let bucket = url
        .host_str()
        .filter(|h| !h.is_empty())
        .ok_or_else(|| StorageError::invalid_uri(format!("{}: missing bucket", uri)))?
        .to_string();

    let raw_key = url.path().trim_start_matches('/');
    let key = urlencoding::decode(raw_key)
        .map_err(|e| StorageError::invalid_uri(format!("{}: {}", uri, e)))?
        .into_owned();
    if key.is_empty() {
        return Err(StorageError::invalid_uri(format!("{}: missing key", uri)));
    }

    Ok(S3Location { bucket, key })
}

/// Base name used to group a video's keyframes.
///
/// Takes the object key (or the local file name), drops the last extension
/// and flattens `/` to `_`, so `videos/day1/clip.mp4` becomes
/// `videos_day1_clip`.
pub fn source_base_name(source_key: Option<&str>, local_path: &Path) -> String {
    let name = match source_key {
        Some(key) if !key.is_empty() => key.to_string(),
        _ => local_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default(),
    };
    let stem = match name.rsplit_once('.') {
        Some((stem, _)) => stem,
        None => name.as_str(),
    };
    stem.replace('/', "_")
}

/// Key of a shot's keyframe image:
/// `{prefix}frames/{base}/shot_{shot_index:04}_t{keyframe_ms:06}.jpg`.
pub fn keyframe_key(prefix: &str, base: &str, shot_index: usize, keyframe_ms: u64) -> String {
    format!(
        "{}frames/{}/shot_{:04}_t{:06}.jpg",
        prefix, base, shot_index, keyframe_ms
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_s3_uri() {
        let loc = parse_s3_uri("s3://media-bucket/uploads/2024/clip.mp4").unwrap();
        assert_eq!(loc.bucket, "media-bucket");
        assert_eq!(loc.key, "uploads/2024/clip.mp4");
        assert_eq!(loc.file_name(), "clip.mp4");
        assert_eq!(loc.to_string(), "s3://media-bucket/uploads/2024/clip.mp4");
    }

    #[test]
    fn test_parse_s3_uri_decodes_key() {
        let loc = parse_s3_uri("s3://bucket/my%20video.mp4").unwrap();
        assert_eq!(loc.key, "my video.mp4");
    }

    #[test]
    fn test_parse_s3_uri_rejects_bad_input() {
        assert!(matches!(
            parse_s3_uri("https://bucket/key.mp4"),
            Err(StorageError::InvalidUri(_))
        ));
        assert!(parse_s3_uri("s3://bucket").is_err());
        assert!(parse_s3_uri("s3://bucket/").is_err());
        assert!(parse_s3_uri("not a uri").is_err());
    }

    #[test]
    fn test_is_s3_uri() {
        assert!(is_s3_uri("s3://b/k"));
        assert!(!is_s3_uri("/tmp/video.mp4"));
    }

    #[test]
    fn test_source_base_name() {
        let local = Path::new("/tmp/work/input.mp4");
        assert_eq!(
            source_base_name(Some("videos/day1/clip.mp4"), local),
            "videos_day1_clip"
        );
        assert_eq!(source_base_name(None, local), "input");
        assert_eq!(source_base_name(None, Path::new("/tmp/noext")), "noext");
        assert_eq!(
            source_base_name(Some("a/archive.tar.gz"), local),
            "a_archive.tar"
        );
    }

    #[test]
    fn test_keyframe_key_format() {
        assert_eq!(
            keyframe_key("sceneit/", "videos_clip", 3, 4967),
            "sceneit/frames/videos_clip/shot_0003_t004967.jpg"
        );
        assert_eq!(
            keyframe_key("", "clip", 12, 0),
            "frames/clip/shot_0012_t000000.jpg"
        );
    }
}
