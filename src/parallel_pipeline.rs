// THEORY:
// The `parallel_pipeline` is the multi-core variant of `MotionPipeline`. Segment
// statistics have no cross-segment dependencies, so the grid's rows are split into
// contiguous blocks and each block is computed on tokio's blocking pool. The blocks
// come back in submission order and are concatenated, which keeps the grid
// row-major and byte-for-byte identical to the sequential result.
//
// Everything after the statistics (comparison, hysteresis, reporting) is cheap and
// strictly sequential, and is shared with the sequential pipeline. Frames are still
// processed one at a time: each step needs the previous frame's grid.
//
// Workers need owned data, so each frame is copied into a pooled buffer that is
// shared with the workers and recycled once they finish.

use crate::config::Config;
use crate::core_modules::frame::Frame;
use crate::core_modules::recording_tracker::{RecordingState, RecordingStateTracker};
use crate::core_modules::segment_grid::SegmentPartition;
use crate::core_modules::segment_stats::{SegmentStat, SegmentStats};
use crate::error::{MotionError, Result};
use crate::pipeline::{
    FrameReport, SessionState, compare_with_previous, finish_frame, refresh_partition,
};
use futures::future::try_join_all;
use log::debug;
use std::collections::VecDeque;
use std::ops::Range;
use std::sync::Arc;
use std::time::Instant;

const FRAME_POOL_SIZE: usize = 4;

pub struct ParallelPipeline {
    config: Config,
    workers: usize,
    frame_buffer_pool: VecDeque<Vec<u8>>,
    partition: Option<SegmentPartition>,
    previous: Option<SegmentStats>,
    tracker: RecordingStateTracker,
    session: SessionState,
}

impl ParallelPipeline {
    /// One worker per logical CPU.
    pub fn new(config: Config) -> Result<Self> {
        Self::with_workers(config, num_cpus::get(), Instant::now())
    }

    pub fn with_workers(config: Config, workers: usize, start: Instant) -> Result<Self> {
        config.validate()?;
        let workers = workers.max(1);
        debug!("Parallel pipeline using {workers} statistics worker(s)");
        Ok(Self {
            config,
            workers,
            frame_buffer_pool: VecDeque::with_capacity(FRAME_POOL_SIZE),
            partition: None,
            previous: None,
            tracker: RecordingStateTracker::started_at(start),
            session: SessionState::new(),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    pub fn partition(&self) -> Option<&SegmentPartition> {
        self.partition.as_ref()
    }

    pub fn recording_state(&self, now: Instant) -> RecordingState {
        self.tracker.state(now, self.config.delay())
    }

    pub async fn process_frame(&mut self, frame: &Frame<'_>) -> Result<FrameReport> {
        self.process_frame_at(frame, Instant::now()).await
    }

    pub async fn process_frame_at(
        &mut self,
        frame: &Frame<'_>,
        now: Instant,
    ) -> Result<FrameReport> {
        self.config.validate()?;
        let (partition, rebuilt) =
            refresh_partition(&mut self.partition, frame, self.config.segment_count)?;
        let partition = Arc::new(partition.clone());

        let current = self.compute_stats(frame, partition).await?;
        let previous = if rebuilt { None } else { self.previous.as_ref() };
        let motion = compare_with_previous(previous, &current, self.config.threshold);
        self.previous = Some(current);

        Ok(finish_frame(
            &mut self.tracker,
            &mut self.session,
            &self.config,
            motion,
            now,
        ))
    }

    async fn compute_stats(
        &mut self,
        frame: &Frame<'_>,
        partition: Arc<SegmentPartition>,
    ) -> Result<SegmentStats> {
        let (width, height) = (frame.width(), frame.height());
        let segment_count = partition.segment_count();

        let mut buffer = self.frame_buffer_pool.pop_front().unwrap_or_default();
        buffer.clear();
        buffer.extend_from_slice(frame.pixels());
        let shared = Arc::new(buffer);

        let tasks = row_blocks(segment_count, self.workers).into_iter().map(|rows| {
            let data = Arc::clone(&shared);
            let partition = Arc::clone(&partition);
            tokio::task::spawn_blocking(move || -> Result<Vec<SegmentStat>> {
                let frame = Frame::new(width, height, &data)?;
                SegmentStats::compute_rows(&frame, &partition, rows)
            })
        });

        let joined = try_join_all(tasks).await;
        self.return_frame_buffer(shared);
        let blocks = joined.map_err(|e| MotionError::Worker(e.to_string()))?;

        let mut cells = Vec::with_capacity(segment_count * segment_count);
        for block in blocks {
            cells.extend(block?);
        }

        SegmentStats::from_rows(segment_count, cells)
    }

    fn return_frame_buffer(&mut self, shared: Arc<Vec<u8>>) {
        if let Ok(buffer) = Arc::try_unwrap(shared) {
            if self.frame_buffer_pool.len() < FRAME_POOL_SIZE {
                self.frame_buffer_pool.push_back(buffer);
            }
        }
    }
}

/// Splits `0..segment_count` into at most `workers` contiguous, near-equal ranges.
fn row_blocks(segment_count: usize, workers: usize) -> Vec<Range<usize>> {
    let blocks = workers.clamp(1, segment_count.max(1));
    let base = segment_count / blocks;
    let extra = segment_count % blocks;

    let mut ranges = Vec::with_capacity(blocks);
    let mut start = 0;
    for i in 0..blocks {
        let len = base + usize::from(i < extra);
        ranges.push(start..start + len);
        start += len;
    }
    ranges
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::MotionPipeline;
    use std::time::Duration;

    #[test]
    fn row_blocks_cover_every_row_once() {
        assert_eq!(row_blocks(5, 2), vec![0..3, 3..5]);
        assert_eq!(row_blocks(2, 8), vec![0..1, 1..2]);
        assert_eq!(row_blocks(1, 1), vec![0..1]);
        for n in 1..40 {
            for w in 1..12 {
                let blocks = row_blocks(n, w);
                assert_eq!(blocks.first().map(|r| r.start), Some(0));
                assert_eq!(blocks.last().map(|r| r.end), Some(n));
                assert!(blocks.windows(2).all(|p| p[0].end == p[1].start));
            }
        }
    }

    fn textured(width: u32, height: u32, seed: u32) -> Vec<u8> {
        (0..width * height)
            .map(|i| ((i * 31 + seed * 17) % 256) as u8)
            .collect()
    }

    #[tokio::test]
    async fn matches_sequential_pipeline() {
        let t0 = Instant::now();
        let config = Config {
            segment_count: 7,
            threshold: 4.0,
            delay_seconds: 2.0,
        };
        let mut sequential = MotionPipeline::started_at(config.clone(), t0).unwrap();
        let mut parallel = ParallelPipeline::with_workers(config, 3, t0).unwrap();

        for seed in 0..5 {
            let buffer = textured(50, 38, seed);
            let frame = Frame::new(50, 38, &buffer).unwrap();
            let now = t0 + Duration::from_millis(500 * seed as u64);

            let expected = sequential.process_frame_at(&frame, now).unwrap();
            let actual = parallel.process_frame_at(&frame, now).await.unwrap();
            assert_eq!(actual, expected);
        }
    }

    #[tokio::test]
    async fn recycles_frame_buffers() {
        let mut pipeline =
            ParallelPipeline::with_workers(Config::default(), 2, Instant::now()).unwrap();
        let buffer = vec![9u8; 40 * 40];
        let frame = Frame::new(40, 40, &buffer).unwrap();

        pipeline.process_frame(&frame).await.unwrap();
        pipeline.process_frame(&frame).await.unwrap();
        assert_eq!(pipeline.frame_buffer_pool.len(), 1);
    }

    #[tokio::test]
    async fn failed_block_still_recycles_frame_buffer() {
        let mut pipeline =
            ParallelPipeline::with_workers(Config::default(), 2, Instant::now()).unwrap();
        let buffer = vec![9u8; 40 * 40];
        let frame = Frame::new(40, 40, &buffer).unwrap();
        let stale = Arc::new(crate::core_modules::segment_grid::partition(30, 30, 4).unwrap());

        let err = pipeline.compute_stats(&frame, stale).await.unwrap_err();
        assert!(matches!(err, MotionError::PartitionMismatch { .. }));
        assert_eq!(pipeline.frame_buffer_pool.len(), 1);
    }
}
