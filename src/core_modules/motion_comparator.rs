// THEORY:
// The `motion_comparator` is the decision layer. It holds two statistics grids side
// by side, the previous frame's and the current frame's, and flags every segment
// whose mean or standard deviation moved by more than the threshold.
//
// Key architectural principles:
// 1.  **Stateless Utility**: `compare` takes two grids and returns a verdict. It has
//     no memory; the pipeline owns the "previous" grid and the tracker owns time.
// 2.  **Strict Threshold**: A change exactly equal to the threshold is not motion.
// 3.  **No Smoothing**: One flagged segment is enough for `detected = true`.
//     Temporal smoothing is the recording tracker's job.
// 4.  **Shape Guard**: Grids of different shapes (the segment count changed between
//     frames) are not compared at all. The caller receives `None` and treats the
//     frame as "no motion data", not as an error.

use crate::core_modules::segment_stats::SegmentStats;

/// Grid position of a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SegmentIndex {
    pub row: usize,
    pub col: usize,
}

impl From<(usize, usize)> for SegmentIndex {
    fn from((row, col): (usize, usize)) -> Self {
        Self { row, col }
    }
}

/// The verdict for one frame-to-frame comparison.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MotionResult {
    pub detected: bool,
    /// Flagged segments in row-major order.
    pub segments: Vec<SegmentIndex>,
}

impl MotionResult {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn flagged_count(&self) -> usize {
        self.segments.len()
    }
}

pub mod motion_comparator {
    use super::*;

    /// Compares two statistics grids.
    ///
    /// Returns `None` when the grids have different shapes. A negative threshold
    /// flags every segment, since absolute differences are never negative.
    pub fn compare(
        previous: &SegmentStats,
        current: &SegmentStats,
        threshold: f64,
    ) -> Option<MotionResult> {
        if !previous.same_shape(current) {
            return None;
        }

        let segments: Vec<SegmentIndex> = previous
            .iter()
            .zip(current.iter())
            .filter(|((_, prev), (_, curr))| {
                let avg_diff = (prev.mean - curr.mean).abs();
                let std_diff = (prev.std_dev - curr.std_dev).abs();
                avg_diff > threshold || std_diff > threshold
            })
            .map(|((position, _), _)| SegmentIndex::from(position))
            .collect();

        Some(MotionResult {
            detected: !segments.is_empty(),
            segments,
        })
    }
}
