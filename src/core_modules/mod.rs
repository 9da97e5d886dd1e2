pub mod frame;
pub mod motion_comparator;
pub mod recording_tracker;
pub mod segment_grid;
pub mod segment_stats;
