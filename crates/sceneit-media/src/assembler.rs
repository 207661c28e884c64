//! Shot assembly: boundary pairs to shot records.

use sceneit_models::video::frame_time;
use sceneit_models::{RunStats, Shot};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::boundary::Boundary;
use crate::error::{MediaError, MediaResult};
use crate::keyframe::KeyframeSelector;
use crate::metrics;
use crate::sink::KeyframeSink;
use crate::source::SeekableFrameReader;

/// Turns consecutive boundaries into [`Shot`] records.
///
/// Each pair `(b[i], b[i+1])` becomes the half-open shot `[b[i], b[i+1])`
/// with `shot_index = i`. Shots that are empty or have no readable keyframe
/// candidate are dropped and counted in [`RunStats`]; the indices of the
/// remaining shots do not shift.
pub struct ShotAssembler<'a> {
    selector: KeyframeSelector,
    save_frames: bool,
    cancel: Option<&'a watch::Receiver<bool>>,
}

impl<'a> ShotAssembler<'a> {
    pub fn new(selector: KeyframeSelector, save_frames: bool) -> Self {
        Self {
            selector,
            save_frames,
            cancel: None,
        }
    }

    /// Set cancellation signal.
    pub fn with_cancel(mut self, cancel: Option<&'a watch::Receiver<bool>>) -> Self {
        self.cancel = cancel;
        self
    }

    /// Assemble shots, selecting a keyframe for each through `reader` and
    /// handing it to `sink` when saving is enabled.
    pub async fn assemble(
        &self,
        boundaries: &[Boundary],
        fps: f64,
        reader: &mut dyn SeekableFrameReader,
        sink: Option<&dyn KeyframeSink>,
        stats: &mut RunStats,
    ) -> MediaResult<Vec<Shot>> {
        let mut shots = Vec::with_capacity(boundaries.len().saturating_sub(1));

        for (shot_index, pair) in boundaries.windows(2).enumerate() {
            let (start, end) = (pair[0].frame, pair[1].frame);

            let choice = match self
                .selector
                .select(reader, start, end, fps, self.cancel)
                .await
            {
                Ok(choice) => choice,
                Err(MediaError::EmptyShot { .. }) => {
                    debug!(shot_index, start, end, "Dropping empty shot");
                    stats.empty_shots_dropped += 1;
                    metrics::record_shot_dropped("empty");
                    continue;
                }
                Err(e @ MediaError::NoKeyframe { .. }) => {
                    warn!(shot_index, start, end, "{}, dropping shot", e);
                    stats.no_keyframe_shots_dropped += 1;
                    metrics::record_shot_dropped("no_keyframe");
                    continue;
                }
                Err(e) => return Err(e),
            };

            let keyframe_frame = choice.index;
            let mut shot = Shot {
                shot_index,
                start_frame: start,
                end_frame: end,
                start_time: frame_time(start, fps),
                end_time: frame_time(end, fps),
                keyframe_frame,
                keyframe_time: frame_time(keyframe_frame, fps),
                keyframe_score: choice.score,
                keyframe_key: None,
                keyframe_url: None,
            };

            if self.save_frames {
                if let Some(sink) = sink {
                    match store_keyframe(reader, sink, &shot).await? {
                        Some(key) => shot.keyframe_key = Some(key),
                        None => {
                            stats.keyframe_store_failures += 1;
                            metrics::record_keyframe_store_failure();
                        }
                    }
                }
            }

            info!(
                shot_index,
                start_frame = start,
                end_frame = end,
                keyframe = keyframe_frame,
                score = format!("{:.3}", choice.score),
                candidates = choice.candidates,
                "Shot assembled"
            );
            shots.push(shot);
        }

        metrics::record_shots_emitted(shots.len());
        Ok(shots)
    }
}

/// Re-read the chosen frame and hand it to `sink`.
///
/// `Ok(None)` when the frame cannot be read back or the sink rejects it.
async fn store_keyframe(
    reader: &mut dyn SeekableFrameReader,
    sink: &dyn KeyframeSink,
    shot: &Shot,
) -> MediaResult<Option<String>> {
    let index = shot.keyframe_frame;
    let frame = match reader.seek_and_read(index).await {
        Ok(Some(frame)) => frame,
        Ok(None) => {
            warn!(
                shot_index = shot.shot_index,
                frame = index,
                "Keyframe could not be read back"
            );
            return Ok(None);
        }
        Err(e) if !e.is_fatal() => {
            warn!(
                shot_index = shot.shot_index,
                frame = index,
                error = %e,
                "Keyframe could not be read back"
            );
            return Ok(None);
        }
        Err(e) => return Err(e),
    };

    match sink.store(shot, &frame).await {
        Ok(key) => Ok(Some(key)),
        Err(e) => {
            warn!(shot_index = shot.shot_index, error = %e, "Failed to store keyframe");
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;

    use super::*;
    use crate::boundary::BoundaryKind;
    use crate::frame::Frame;
    use crate::sink::MemoryKeyframeSink;
    use crate::source::memory::MemoryVideo;
    use crate::source::FrameSource;

    fn boundary(frame: usize, kind: BoundaryKind) -> Boundary {
        Boundary {
            frame,
            time: frame as f64,
            score: 0.0,
            kind,
        }
    }

    struct FailingSink;

    #[async_trait]
    impl KeyframeSink for FailingSink {
        async fn store(&self, _shot: &Shot, _frame: &Frame) -> MediaResult<String> {
            Err(MediaError::sink("bucket unavailable"))
        }
    }

    #[tokio::test]
    async fn test_shots_are_contiguous() {
        let video = MemoryVideo::from_colors("mem", 1.0, 8, 8, vec![[40, 40, 40]; 10]);
        let mut reader = video.open_seekable().await.unwrap();
        let boundaries = vec![
            boundary(0, BoundaryKind::Start),
            boundary(4, BoundaryKind::Cut),
            boundary(9, BoundaryKind::Closing),
        ];
        let mut stats = RunStats::default();

        let shots = ShotAssembler::new(KeyframeSelector::new(1, None), false)
            .assemble(&boundaries, 1.0, reader.as_mut(), None, &mut stats)
            .await
            .unwrap();

        assert_eq!(shots.len(), 2);
        assert_eq!((shots[0].start_frame, shots[0].end_frame), (0, 4));
        assert_eq!((shots[1].start_frame, shots[1].end_frame), (4, 9));
        for shot in &shots {
            assert!(shot.keyframe_frame >= shot.start_frame);
            assert!(shot.keyframe_frame < shot.end_frame);
            assert!(shot.keyframe_key.is_none());
        }
        assert_eq!(stats, RunStats::default());
    }

    #[tokio::test]
    async fn test_unreadable_shot_is_dropped_without_shifting_indices() {
        let video = MemoryVideo::from_colors("mem", 1.0, 8, 8, vec![[40, 40, 40]; 9])
            .with_unseekable_frames(0..3);
        let mut reader = video.open_seekable().await.unwrap();
        let boundaries = vec![
            boundary(0, BoundaryKind::Start),
            boundary(3, BoundaryKind::Cut),
            boundary(8, BoundaryKind::Closing),
        ];
        let mut stats = RunStats::default();

        let shots = ShotAssembler::new(KeyframeSelector::new(1, None), false)
            .assemble(&boundaries, 1.0, reader.as_mut(), None, &mut stats)
            .await
            .unwrap();

        assert_eq!(shots.len(), 1);
        assert_eq!(shots[0].shot_index, 1);
        assert_eq!(stats.no_keyframe_shots_dropped, 1);
    }

    #[tokio::test]
    async fn test_keyframes_go_to_sink() {
        let video = MemoryVideo::from_colors("mem", 1.0, 8, 8, vec![[40, 40, 40]; 6]);
        let mut reader = video.open_seekable().await.unwrap();
        let boundaries = vec![
            boundary(0, BoundaryKind::Start),
            boundary(3, BoundaryKind::Cut),
            boundary(5, BoundaryKind::Closing),
        ];
        let sink = MemoryKeyframeSink::new();
        let mut stats = RunStats::default();

        let shots = ShotAssembler::new(KeyframeSelector::new(1, None), true)
            .assemble(&boundaries, 1.0, reader.as_mut(), Some(&sink), &mut stats)
            .await
            .unwrap();

        let stored = sink.stored();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[1].0, 1);
        assert_eq!(shots[0].keyframe_key.as_deref(), Some("memory/shot_0000"));
    }

    #[tokio::test]
    async fn test_sink_failure_keeps_shot() {
        let video = MemoryVideo::from_colors("mem", 1.0, 8, 8, vec![[40, 40, 40]; 6]);
        let mut reader = video.open_seekable().await.unwrap();
        let boundaries = vec![
            boundary(0, BoundaryKind::Start),
            boundary(5, BoundaryKind::Closing),
        ];
        let mut stats = RunStats::default();

        let shots = ShotAssembler::new(KeyframeSelector::new(1, None), true)
            .assemble(&boundaries, 1.0, reader.as_mut(), Some(&FailingSink), &mut stats)
            .await
            .unwrap();

        assert_eq!(shots.len(), 1);
        assert!(shots[0].keyframe_key.is_none());
        assert_eq!(stats.keyframe_store_failures, 1);
    }

    #[tokio::test]
    async fn test_empty_pair_is_dropped() {
        let video = MemoryVideo::from_colors("mem", 1.0, 8, 8, vec![[40, 40, 40]; 6]);
        let mut reader = video.open_seekable().await.unwrap();
        let boundaries = vec![
            boundary(0, BoundaryKind::Start),
            boundary(3, BoundaryKind::Cut),
            boundary(3, BoundaryKind::Cut),
            boundary(5, BoundaryKind::Closing),
        ];
        let mut stats = RunStats::default();

        let shots = ShotAssembler::new(KeyframeSelector::new(1, None), false)
            .assemble(&boundaries, 1.0, reader.as_mut(), None, &mut stats)
            .await
            .unwrap();

        assert_eq!(shots.len(), 2);
        assert_eq!(shots[1].shot_index, 2);
        assert_eq!(stats.empty_shots_dropped, 1);
    }

    /// Seekable reader that records every requested index.
    struct RecordingReader {
        inner: Box<dyn SeekableFrameReader>,
        requests: Arc<Mutex<Vec<usize>>>,
    }

    #[async_trait]
    impl SeekableFrameReader for RecordingReader {
        async fn seek_and_read(&mut self, index: usize) -> MediaResult<Option<Frame>> {
            self.requests.lock().unwrap().push(index);
            self.inner.seek_and_read(index).await
        }
    }

    #[tokio::test]
    async fn test_only_the_keyframe_is_read_again() {
        let colors = vec![[100, 100, 100], [250, 250, 250], [102, 102, 102], [101, 101, 101]];
        let video = MemoryVideo::from_colors("mem", 1.0, 8, 8, colors);
        let requests = Arc::new(Mutex::new(Vec::new()));
        let mut reader = RecordingReader {
            inner: video.open_seekable().await.unwrap(),
            requests: Arc::clone(&requests),
        };
        let boundaries = vec![
            boundary(0, BoundaryKind::Start),
            boundary(4, BoundaryKind::Closing),
        ];
        let sink = MemoryKeyframeSink::new();
        let mut stats = RunStats::default();

        let shots = ShotAssembler::new(KeyframeSelector::new(1, None), true)
            .assemble(&boundaries, 1.0, &mut reader, Some(&sink), &mut stats)
            .await
            .unwrap();

        assert_eq!(shots[0].keyframe_frame, 2);
        // one pass over the samples, then the winner alone
        assert_eq!(*requests.lock().unwrap(), vec![0, 1, 2, 3, 2]);
        assert_eq!(sink.stored()[0].1.index, 2);
    }

    #[tokio::test]
    async fn test_without_saving_no_frame_is_read_again() {
        let video = MemoryVideo::from_colors("mem", 1.0, 8, 8, vec![[40, 40, 40]; 3]);
        let requests = Arc::new(Mutex::new(Vec::new()));
        let mut reader = RecordingReader {
            inner: video.open_seekable().await.unwrap(),
            requests: Arc::clone(&requests),
        };
        let boundaries = vec![
            boundary(0, BoundaryKind::Start),
            boundary(2, BoundaryKind::Closing),
        ];
        let mut stats = RunStats::default();

        ShotAssembler::new(KeyframeSelector::new(1, None), false)
            .assemble(&boundaries, 1.0, &mut reader, None, &mut stats)
            .await
            .unwrap();

        assert_eq!(*requests.lock().unwrap(), vec![0, 1]);
    }
}
