//! S3-compatible storage for shot detection.
//!
//! This crate provides:
//! - Source video download from `s3://bucket/key` URIs
//! - Keyframe upload with deterministic keys
//! - Presigned GET/PUT URL generation

pub mod client;
pub mod error;
pub mod keys;

pub use client::{S3Client, StorageConfig};
pub use error::{StorageError, StorageResult};
pub use keys::{is_s3_uri, keyframe_key, parse_s3_uri, source_base_name, S3Location};
