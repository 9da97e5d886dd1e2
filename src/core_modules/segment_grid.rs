// THEORY:
// The `segment_grid` module is pure geometry. It slices a frame into an
// `segment_count x segment_count` grid of rectangular bands and is the single
// source of truth for where a segment lives in pixel space. The statistics layer
// uses it to pick pixels, and the presentation layer uses the very same partition
// to draw highlight rectangles, so the two can never disagree.
//
// Band sizes come from floor division. The last band on each axis always ends at
// the frame edge, absorbing whatever remainder the division left behind. When the
// segment count exceeds a dimension the leading bands collapse to zero width; that
// is a legal, if degenerate, partition.

use crate::core_modules::frame::Frame;
use crate::error::{MotionError, Result};

/// A half-open pixel range `[start, end)` along one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Band {
    pub start: u32,
    pub end: u32,
}

impl Band {
    pub fn len(&self) -> u32 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end == self.start
    }
}

/// A segment's footprint in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Row and column bands for one `(height, width, segment_count)` combination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentPartition {
    frame_height: u32,
    frame_width: u32,
    segment_count: usize,
    rows: Vec<Band>,
    cols: Vec<Band>,
}

/// Computes the partition for a frame of the given size.
pub fn partition(
    frame_height: u32,
    frame_width: u32,
    segment_count: usize,
) -> Result<SegmentPartition> {
    if segment_count == 0 {
        return Err(MotionError::invalid_configuration(
            "segment_count must be at least 1",
        ));
    }
    if frame_height == 0 || frame_width == 0 {
        return Err(MotionError::invalid_frame(
            frame_width,
            frame_height,
            "frame dimensions must be positive",
        ));
    }

    Ok(SegmentPartition {
        frame_height,
        frame_width,
        segment_count,
        rows: bands(frame_height, segment_count),
        cols: bands(frame_width, segment_count),
    })
}

fn bands(dimension: u32, segment_count: usize) -> Vec<Band> {
    let dimension = dimension as u64;
    let count = segment_count as u64;
    let size = dimension / count;

    (0..count)
        .map(|i| {
            let start = (i * size).min(dimension);
            let end = if i + 1 == count {
                dimension
            } else {
                ((i + 1) * size).min(dimension)
            };
            Band {
                start: start as u32,
                end: end as u32,
            }
        })
        .collect()
}

impl SegmentPartition {
    /// Partition sized for `frame`.
    pub fn for_frame(frame: &Frame<'_>, segment_count: usize) -> Result<Self> {
        partition(frame.height(), frame.width(), segment_count)
    }

    pub fn frame_height(&self) -> u32 {
        self.frame_height
    }

    pub fn frame_width(&self) -> u32 {
        self.frame_width
    }

    pub fn segment_count(&self) -> usize {
        self.segment_count
    }

    pub fn rows(&self) -> &[Band] {
        &self.rows
    }

    pub fn cols(&self) -> &[Band] {
        &self.cols
    }

    /// Whether this partition was built for `frame`'s dimensions and `segment_count`.
    pub fn matches(&self, frame: &Frame<'_>, segment_count: usize) -> bool {
        self.fits(frame) && self.segment_count == segment_count
    }

    /// Whether this partition was built for `frame`'s dimensions.
    pub fn fits(&self, frame: &Frame<'_>) -> bool {
        self.frame_height == frame.height() && self.frame_width == frame.width()
    }

    /// Pixel rectangle of segment `(row, col)`, or `None` when out of range.
    pub fn segment_rect(&self, row: usize, col: usize) -> Option<SegmentRect> {
        let row_band = self.rows.get(row)?;
        let col_band = self.cols.get(col)?;
        Some(SegmentRect {
            x: col_band.start,
            y: row_band.start,
            width: col_band.len(),
            height: row_band.len(),
        })
    }
}
