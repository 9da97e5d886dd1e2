//! Error types for the motion detection core.

use thiserror::Error;

/// Result type for motion detection operations.
pub type Result<T> = std::result::Result<T, MotionError>;

/// Errors that can originate in the core.
///
/// A shape mismatch between consecutive statistics grids is deliberately not
/// represented here: it is reported as "no comparison this frame".
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MotionError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Invalid frame {width}x{height}: {reason}")]
    InvalidFrame {
        width: u32,
        height: u32,
        reason: String,
    },

    #[error(
        "Partition built for {partition_width}x{partition_height} \
         cannot be applied to a {frame_width}x{frame_height} frame"
    )]
    PartitionMismatch {
        partition_width: u32,
        partition_height: u32,
        frame_width: u32,
        frame_height: u32,
    },

    #[error("Statistics worker failed: {0}")]
    Worker(String),
}

impl MotionError {
    /// Create an invalid configuration error.
    pub fn invalid_configuration(message: impl Into<String>) -> Self {
        Self::InvalidConfiguration(message.into())
    }

    /// Create an invalid frame error.
    pub fn invalid_frame(width: u32, height: u32, reason: impl Into<String>) -> Self {
        Self::InvalidFrame {
            width,
            height,
            reason: reason.into(),
        }
    }
}
