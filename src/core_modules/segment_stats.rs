// THEORY:
// The `segment_stats` module turns one grayscale frame into a compact statistical
// summary: for every cell of the segment grid, the mean intensity and the
// population standard deviation of the pixels inside it.
//
// Key architectural principles:
// 1.  **Spatial Pooling**: Summarising a band of pixels into two numbers smooths out
//     single-pixel noise and reduces the comparison workload from millions of
//     pixels to `segment_count^2` cells.
// 2.  **Row Independence**: No cell depends on another. `compute_rows` handles any
//     contiguous block of segment rows, which lets the parallel pipeline hand
//     blocks to workers and stitch the result back together in row-major order.
//     Sequential and parallel runs therefore produce identical grids.
// 3.  **Defined Degenerate Case**: A zero-area cell (more segments than pixels on
//     an axis) has no meaningful statistic. It reports `SegmentStat::EMPTY`, which
//     always compares equal to itself and so never triggers motion.

use crate::core_modules::frame::Frame;
use crate::core_modules::segment_grid::{Band, SegmentPartition};
use crate::error::{MotionError, Result};
use std::ops::Range;

/// Brightness statistics for a single segment.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SegmentStat {
    pub mean: f64,
    pub std_dev: f64,
}

impl SegmentStat {
    /// Sentinel reported for a segment that contains no pixels.
    pub const EMPTY: SegmentStat = SegmentStat {
        mean: 0.0,
        std_dev: 0.0,
    };
}

/// A `segment_count x segment_count` grid of statistics, stored row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentStats {
    segment_count: usize,
    cells: Vec<SegmentStat>,
}

impl SegmentStats {
    /// Statistics for every segment of `frame`.
    pub fn compute(frame: &Frame<'_>, partition: &SegmentPartition) -> Result<Self> {
        let cells = Self::compute_rows(frame, partition, 0..partition.segment_count())?;
        Ok(Self {
            segment_count: partition.segment_count(),
            cells,
        })
    }

    /// Statistics for segment rows `rows`, row-major.
    pub fn compute_rows(
        frame: &Frame<'_>,
        partition: &SegmentPartition,
        rows: Range<usize>,
    ) -> Result<Vec<SegmentStat>> {
        if !partition.fits(frame) {
            return Err(MotionError::PartitionMismatch {
                partition_width: partition.frame_width(),
                partition_height: partition.frame_height(),
                frame_width: frame.width(),
                frame_height: frame.height(),
            });
        }

        let row_bands = partition.rows().get(rows.clone()).ok_or_else(|| {
            MotionError::invalid_configuration(format!(
                "segment rows {rows:?} outside of a {}-segment grid",
                partition.segment_count()
            ))
        })?;

        let mut cells = Vec::with_capacity(row_bands.len() * partition.segment_count());
        for row_band in row_bands {
            for col_band in partition.cols() {
                cells.push(segment_stat(frame, *row_band, *col_band));
            }
        }
        Ok(cells)
    }

    /// Assembles a grid from row-major cells produced by `compute_rows`.
    pub fn from_rows(segment_count: usize, cells: Vec<SegmentStat>) -> Result<Self> {
        if cells.len() != segment_count * segment_count {
            return Err(MotionError::Worker(format!(
                "expected {} cells for a {segment_count}x{segment_count} grid, got {}",
                segment_count * segment_count,
                cells.len()
            )));
        }
        Ok(Self {
            segment_count,
            cells,
        })
    }

    pub fn segment_count(&self) -> usize {
        self.segment_count
    }

    pub fn get(&self, row: usize, col: usize) -> Option<&SegmentStat> {
        if row >= self.segment_count || col >= self.segment_count {
            return None;
        }
        self.cells.get(row * self.segment_count + col)
    }

    /// Cells with their `(row, col)` position, in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = ((usize, usize), &SegmentStat)> {
        let n = self.segment_count;
        self.cells
            .iter()
            .enumerate()
            .map(move |(i, stat)| ((i / n, i % n), stat))
    }

    pub fn same_shape(&self, other: &SegmentStats) -> bool {
        self.segment_count == other.segment_count && self.cells.len() == other.cells.len()
    }
}

/// Mean and population standard deviation of one rectangular region.
pub fn segment_stat(frame: &Frame<'_>, rows: Band, cols: Band) -> SegmentStat {
    if rows.is_empty() || cols.is_empty() {
        return SegmentStat::EMPTY;
    }

    let region = || {
        (rows.start..rows.end)
            .flat_map(move |y| frame.row(y)[cols.start as usize..cols.end as usize].iter())
    };

    let count = rows.len() as f64 * cols.len() as f64;
    let sum: u64 = region().map(|&p| p as u64).sum();
    let mean = sum as f64 / count;
    let variance = region()
        .map(|&p| (p as f64 - mean).powi(2))
        .sum::<f64>()
        / count;

    SegmentStat {
        mean,
        std_dev: variance.sqrt(),
    }
}
