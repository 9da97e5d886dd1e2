// THEORY:
// The `recording_tracker` adds hysteresis on top of the per-frame motion flag. A
// single timestamp, the moment motion was last seen, is the entire state. Status is
// derived on demand: the session is RECORDING while less than `delay` has elapsed
// since that timestamp, and IDLE otherwise. Short gaps between detections therefore
// do not make the banner flicker.
//
// The tracker is O(1) in time and space and is owned by exactly one pipeline; only
// the frame-processing sequence ever writes the timestamp.

use std::fmt;
use std::time::{Duration, Instant};

/// Observable recording status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordingStatus {
    Idle,
    Recording,
}

impl RecordingStatus {
    pub fn is_recording(&self) -> bool {
        matches!(self, RecordingStatus::Recording)
    }
}

impl fmt::Display for RecordingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordingStatus::Idle => f.write_str("IDLE"),
            RecordingStatus::Recording => f.write_str("RECORDING"),
        }
    }
}

/// A snapshot of the tracker for presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordingState {
    pub status: RecordingStatus,
    pub last_motion_timestamp: Instant,
}

/// Level-triggered recording timer.
#[derive(Debug, Clone)]
pub struct RecordingStateTracker {
    last_motion: Instant,
}

impl RecordingStateTracker {
    /// A tracker whose last motion is "now".
    pub fn new() -> Self {
        Self::started_at(Instant::now())
    }

    /// A tracker whose last motion is `start`.
    pub fn started_at(start: Instant) -> Self {
        Self { last_motion: start }
    }

    pub fn on_motion_detected(&mut self, now: Instant) {
        self.last_motion = now;
    }

    /// RECORDING iff less than `delay` has elapsed since the last motion.
    pub fn status(&self, now: Instant, delay: Duration) -> RecordingStatus {
        if now.saturating_duration_since(self.last_motion) < delay {
            RecordingStatus::Recording
        } else {
            RecordingStatus::Idle
        }
    }

    pub fn state(&self, now: Instant, delay: Duration) -> RecordingState {
        RecordingState {
            status: self.status(now, delay),
            last_motion_timestamp: self.last_motion,
        }
    }

    pub fn last_motion_timestamp(&self) -> Instant {
        self.last_motion
    }
}

impl Default for RecordingStateTracker {
    fn default() -> Self {
        Self::new()
    }
}
