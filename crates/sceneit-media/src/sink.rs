//! Destination for selected keyframes.

use std::sync::Mutex;

use async_trait::async_trait;
use sceneit_models::Shot;

use crate::error::{MediaError, MediaResult};
use crate::frame::Frame;

/// Receives the keyframe of each emitted shot.
///
/// Implementations decide where the pixels go (object storage, disk,
/// memory) and return the key the keyframe can be found under. A failing
/// sink never aborts the run; the shot is kept without a key.
#[async_trait]
pub trait KeyframeSink: Send + Sync {
    async fn store(&self, shot: &Shot, frame: &Frame) -> MediaResult<String>;
}

/// Sink that keeps keyframes in memory.
#[derive(Debug, Default)]
pub struct MemoryKeyframeSink {
    stored: Mutex<Vec<(usize, Frame)>>,
}

impl MemoryKeyframeSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored `(shot_index, keyframe)` pairs in store order.
    pub fn stored(&self) -> Vec<(usize, Frame)> {
        self.stored
            .lock()
            .map(|stored| stored.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl KeyframeSink for MemoryKeyframeSink {
    async fn store(&self, shot: &Shot, frame: &Frame) -> MediaResult<String> {
        let mut stored = self
            .stored
            .lock()
            .map_err(|_| MediaError::sink("memory sink poisoned"))?;
        stored.push((shot.shot_index, frame.clone()));
        Ok(format!("memory/shot_{:04}", shot.shot_index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shot(shot_index: usize) -> Shot {
        Shot {
            shot_index,
            start_frame: 0,
            end_frame: 10,
            start_time: 0.0,
            end_time: 1.0,
            keyframe_frame: 3,
            keyframe_time: 0.3,
            keyframe_score: 1.0,
            keyframe_key: None,
            keyframe_url: None,
        }
    }

    #[test]
    fn test_memory_sink_keeps_order() {
        let sink = MemoryKeyframeSink::new();
        let frame = Frame::filled(3, 2, 2, [1, 2, 3]);

        let key = tokio_test::block_on(sink.store(&shot(4), &frame)).unwrap();
        tokio_test::block_on(sink.store(&shot(7), &frame)).unwrap();

        assert_eq!(key, "memory/shot_0004");
        let stored = sink.stored();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].0, 4);
        assert_eq!(stored[1].0, 7);
        assert_eq!(stored[1].1, frame);
    }
}
