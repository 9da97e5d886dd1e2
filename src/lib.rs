// THEORY:
// This file is the main entry point for the `segmotion` library crate. It exposes
// `MotionPipeline` (and its tokio-backed sibling `ParallelPipeline`) as the
// high-level interface: feed grayscale frames in, get per-frame reports out, each
// carrying the flagged segments and the IDLE/RECORDING status.
//
// The algorithmic layers live in `core_modules` and can also be used on their own:
// `segment_grid` (geometry), `segment_stats` (per-segment brightness statistics),
// `motion_comparator` (frame-to-frame decision) and `recording_tracker`
// (hysteresis). Camera capture, color conversion and drawing are left to callers.

pub mod config;
pub mod core_modules;
pub mod error;
pub mod parallel_pipeline;
pub mod pipeline;

pub use config::Config;
pub use core_modules::frame::Frame;
pub use error::{MotionError, Result};
pub use parallel_pipeline::ParallelPipeline;
pub use pipeline::{FrameReport, MotionPipeline, MotionResult, RecordingStatus, SegmentIndex};
