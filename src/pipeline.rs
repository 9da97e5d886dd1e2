// THEORY:
// The `pipeline` module is the top-level API of the detector. It wires the layers
// into a single per-frame step:
//
//   frame -> segment statistics -> compare with previous -> recording tracker -> report
//
// The pipeline owns everything that must outlive one frame: the current
// configuration, the cached partition, the previous frame's statistics and the
// recording tracker. Nothing is global, so several independent sessions can run
// side by side.
//
// Configuration may change between any two frames. A changed segment count or a
// changed frame size invalidates the cached partition, and the next comparison is
// skipped because the statistics grids no longer line up. The current grid always
// becomes the baseline for the following frame.

use crate::config::Config;
use crate::core_modules::frame::Frame;
use crate::core_modules::motion_comparator::motion_comparator;
use crate::core_modules::recording_tracker::{RecordingState, RecordingStateTracker};
use crate::core_modules::segment_grid::SegmentPartition;
use crate::core_modules::segment_stats::SegmentStats;
use crate::error::Result;
use log::{debug, info, trace};
use std::time::Instant;

// Re-export key data structures for the public API.
pub use crate::core_modules::motion_comparator::{MotionResult, SegmentIndex};
pub use crate::core_modules::recording_tracker::RecordingStatus;
pub use crate::core_modules::segment_grid::SegmentRect;

/// The output of the pipeline for a single frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameReport {
    /// Zero-based position of the frame in this session.
    pub frame_index: u64,
    /// `None` when there was nothing to compare against (first frame, or the grid
    /// shape changed since the previous frame).
    pub motion: Option<MotionResult>,
    pub status: RecordingStatus,
}

impl FrameReport {
    pub fn motion_detected(&self) -> bool {
        self.motion.as_ref().is_some_and(|m| m.detected)
    }

    /// Flagged segments, empty when no comparison ran.
    pub fn segments(&self) -> &[SegmentIndex] {
        match &self.motion {
            Some(motion) => motion.segments.as_slice(),
            None => &[],
        }
    }
}

/// The main per-session motion detector.
pub struct MotionPipeline {
    config: Config,
    partition: Option<SegmentPartition>,
    previous: Option<SegmentStats>,
    tracker: RecordingStateTracker,
    session: SessionState,
}

/// Bookkeeping shared by the sequential and the parallel pipelines.
#[derive(Debug, Clone)]
pub(crate) struct SessionState {
    pub(crate) frames_processed: u64,
    pub(crate) last_status: Option<RecordingStatus>,
}

impl SessionState {
    pub(crate) fn new() -> Self {
        Self {
            frames_processed: 0,
            last_status: None,
        }
    }
}

impl MotionPipeline {
    pub fn new(config: Config) -> Result<Self> {
        Self::started_at(config, Instant::now())
    }

    /// A pipeline whose recording timer starts at `start`.
    pub fn started_at(config: Config, start: Instant) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            partition: None,
            previous: None,
            tracker: RecordingStateTracker::started_at(start),
            session: SessionState::new(),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Mutable access for live adjustment between frames.
    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    /// The partition used for the most recent frame, for mapping segments to pixels.
    pub fn partition(&self) -> Option<&SegmentPartition> {
        self.partition.as_ref()
    }

    pub fn recording_state(&self, now: Instant) -> RecordingState {
        self.tracker.state(now, self.config.delay())
    }

    /// Forgets the previous frame; the next frame only establishes a baseline.
    pub fn reset_baseline(&mut self) {
        self.previous = None;
    }

    pub fn motion_detected(&mut self, frame: &Frame<'_>) -> Result<bool> {
        Ok(self.process_frame(frame)?.motion_detected())
    }

    pub fn process_frame(&mut self, frame: &Frame<'_>) -> Result<FrameReport> {
        self.process_frame_at(frame, Instant::now())
    }

    /// Runs one frame through the pipeline using `now` as the clock reading.
    pub fn process_frame_at(&mut self, frame: &Frame<'_>, now: Instant) -> Result<FrameReport> {
        self.config.validate()?;
        let (partition, rebuilt) =
            refresh_partition(&mut self.partition, frame, self.config.segment_count)?;

        // Stage 1: Segment statistics
        let current = SegmentStats::compute(frame, partition)?;

        // Stage 2: Frame-to-frame comparison, skipped right after a geometry change
        let previous = if rebuilt { None } else { self.previous.as_ref() };
        let motion = compare_with_previous(previous, &current, self.config.threshold);
        self.previous = Some(current);

        // Stage 3: Hysteresis
        Ok(finish_frame(
            &mut self.tracker,
            &mut self.session,
            &self.config,
            motion,
            now,
        ))
    }
}

/// Returns the cached partition, rebuilding it if the frame size or segment count
/// changed. The flag is `true` when a rebuild happened.
pub(crate) fn refresh_partition<'p>(
    cached: &'p mut Option<SegmentPartition>,
    frame: &Frame<'_>,
    segment_count: usize,
) -> Result<(&'p SegmentPartition, bool)> {
    let (partition, rebuilt) = match cached.take() {
        Some(partition) if partition.matches(frame, segment_count) => (partition, false),
        _ => {
            debug!(
                "Rebuilding {segment_count}x{segment_count} partition for {}x{} frame",
                frame.width(),
                frame.height()
            );
            (SegmentPartition::for_frame(frame, segment_count)?, true)
        }
    };
    Ok((cached.insert(partition), rebuilt))
}

pub(crate) fn compare_with_previous(
    previous: Option<&SegmentStats>,
    current: &SegmentStats,
    threshold: f64,
) -> Option<MotionResult> {
    let previous = previous?;
    let motion = motion_comparator::compare(previous, current, threshold);
    if motion.is_none() {
        debug!(
            "Skipping comparison: grid changed from {0}x{0} to {1}x{1}",
            previous.segment_count(),
            current.segment_count()
        );
    }
    motion
}

/// Feeds the comparison into the tracker and builds the report.
pub(crate) fn finish_frame(
    tracker: &mut RecordingStateTracker,
    session: &mut SessionState,
    config: &Config,
    motion: Option<MotionResult>,
    now: Instant,
) -> FrameReport {
    if let Some(result) = &motion {
        trace!("{} segment(s) flagged", result.flagged_count());
        if result.detected {
            tracker.on_motion_detected(now);
        }
    }

    let status = tracker.status(now, config.delay());
    if session.last_status != Some(status) {
        info!("Recording status changed to {status}");
        session.last_status = Some(status);
    }

    let frame_index = session.frames_processed;
    session.frames_processed += 1;

    FrameReport {
        frame_index,
        motion,
        status,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn config(segment_count: usize) -> Config {
        Config {
            segment_count,
            threshold: 10.0,
            delay_seconds: 3.0,
        }
    }

    #[test]
    fn first_frame_only_sets_baseline() {
        let t0 = Instant::now();
        let mut pipeline = MotionPipeline::started_at(config(2), t0).unwrap();
        let buffer = vec![100u8; 16];
        let frame = Frame::new(4, 4, &buffer).unwrap();

        let report = pipeline.process_frame_at(&frame, t0).unwrap();
        assert_eq!(report.frame_index, 0);
        assert_eq!(report.motion, None);
        assert!(report.segments().is_empty());
        assert_eq!(report.status, RecordingStatus::Recording);

        let later = pipeline
            .process_frame_at(&frame, t0 + Duration::from_secs(3))
            .unwrap();
        assert_eq!(later.status, RecordingStatus::Idle);
    }

    #[test]
    fn reset_baseline_skips_the_next_comparison() {
        let mut pipeline = MotionPipeline::new(config(2)).unwrap();
        let dark = vec![0u8; 16];
        let bright = vec![255u8; 16];
        let dark_frame = Frame::new(4, 4, &dark).unwrap();
        let bright_frame = Frame::new(4, 4, &bright).unwrap();

        assert!(!pipeline.motion_detected(&dark_frame).unwrap());
        pipeline.reset_baseline();
        assert!(!pipeline.motion_detected(&bright_frame).unwrap());
        assert!(pipeline.motion_detected(&dark_frame).unwrap());
    }

    #[test]
    fn segment_count_change_skips_one_comparison() {
        let t0 = Instant::now();
        let mut pipeline = MotionPipeline::started_at(config(2), t0).unwrap();
        let buffer = vec![100u8; 64];
        let frame = Frame::new(8, 8, &buffer).unwrap();

        pipeline.process_frame_at(&frame, t0).unwrap();
        pipeline.config_mut().set_segment_count(4);

        let skipped = pipeline.process_frame_at(&frame, t0).unwrap();
        assert_eq!(skipped.motion, None);
        assert_eq!(pipeline.partition().map(|p| p.segment_count()), Some(4));

        let compared = pipeline.process_frame_at(&frame, t0).unwrap();
        assert_eq!(compared.motion, Some(MotionResult::none()));
    }

    #[test]
    fn frame_size_change_rebuilds_partition() {
        let t0 = Instant::now();
        let mut pipeline = MotionPipeline::started_at(config(2), t0).unwrap();
        let small = vec![0u8; 16];
        let large = vec![0u8; 36];

        pipeline
            .process_frame_at(&Frame::new(4, 4, &small).unwrap(), t0)
            .unwrap();
        let resized = pipeline
            .process_frame_at(&Frame::new(6, 6, &large).unwrap(), t0)
            .unwrap();
        assert_eq!(resized.motion, None);

        let report = pipeline
            .process_frame_at(&Frame::new(6, 6, &large).unwrap(), t0)
            .unwrap();
        assert_eq!(report.motion, Some(MotionResult::none()));

        let partition = pipeline.partition().unwrap();
        assert_eq!((partition.frame_width(), partition.frame_height()), (6, 6));
    }

    #[test]
    fn recording_follows_motion_then_expires() {
        let t0 = Instant::now();
        let mut pipeline = MotionPipeline::started_at(config(1), t0).unwrap();
        let dark = vec![0u8; 4];
        let bright = vec![200u8; 4];
        let dark_frame = Frame::new(2, 2, &dark).unwrap();
        let bright_frame = Frame::new(2, 2, &bright).unwrap();

        let start = t0 + Duration::from_secs(10);
        let baseline = pipeline.process_frame_at(&dark_frame, start).unwrap();
        assert_eq!(baseline.status, RecordingStatus::Idle);

        let moved = pipeline
            .process_frame_at(&bright_frame, start + Duration::from_secs(1))
            .unwrap();
        assert!(moved.motion_detected());
        assert_eq!(moved.status, RecordingStatus::Recording);

        let still = pipeline
            .process_frame_at(&bright_frame, start + Duration::from_secs(3))
            .unwrap();
        assert!(!still.motion_detected());
        assert_eq!(still.status, RecordingStatus::Recording);

        let expired = pipeline
            .process_frame_at(&bright_frame, start + Duration::from_secs(5))
            .unwrap();
        assert_eq!(expired.status, RecordingStatus::Idle);
        assert_eq!(expired.frame_index, 3);
    }

    #[test]
    fn invalid_live_config_is_reported() {
        let mut pipeline = MotionPipeline::new(config(2)).unwrap();
        pipeline.config_mut().segment_count = 0;
        let buffer = vec![0u8; 4];
        let frame = Frame::new(2, 2, &buffer).unwrap();
        assert!(pipeline.process_frame(&frame).is_err());
    }
}
