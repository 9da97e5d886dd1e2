//! Live-adjustable detector configuration.

use crate::error::{MotionError, Result};
use std::time::Duration;

pub const DEFAULT_SEGMENT_COUNT: usize = 20;
pub const DEFAULT_THRESHOLD: f64 = 10.0;
pub const DEFAULT_DELAY_SECONDS: f64 = 3.0;

pub const SEGMENTS_ENV: &str = "SEGMOTION_SEGMENTS";
pub const THRESHOLD_ENV: &str = "SEGMOTION_THRESHOLD";
pub const DELAY_ENV: &str = "SEGMOTION_DELAY";

/// Detector settings. May be changed between any two frames.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Segments per axis; the grid is `segment_count x segment_count`.
    pub segment_count: usize,
    /// Minimum change in mean or standard deviation that counts as motion (exclusive).
    pub threshold: f64,
    /// How long RECORDING persists after the last motion.
    pub delay_seconds: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            segment_count: DEFAULT_SEGMENT_COUNT,
            threshold: DEFAULT_THRESHOLD,
            delay_seconds: DEFAULT_DELAY_SECONDS,
        }
    }
}

impl Config {
    /// Defaults overridden by `SEGMOTION_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        if let Some(raw) = lookup(SEGMENTS_ENV) {
            config.set_segment_count(parse(SEGMENTS_ENV, &raw)?);
        }
        if let Some(raw) = lookup(THRESHOLD_ENV) {
            config.set_threshold(parse(THRESHOLD_ENV, &raw)?)?;
        }
        if let Some(raw) = lookup(DELAY_ENV) {
            config.set_delay_seconds(parse(DELAY_ENV, &raw)?)?;
        }
        Ok(config)
    }

    /// Values below 1 are clamped to 1.
    pub fn set_segment_count(&mut self, segment_count: usize) {
        self.segment_count = segment_count.max(1);
    }

    /// Rejects negative and non-finite thresholds.
    pub fn set_threshold(&mut self, threshold: f64) -> Result<()> {
        check_non_negative("threshold", threshold)?;
        self.threshold = threshold;
        Ok(())
    }

    /// Rejects negative and non-finite delays.
    pub fn set_delay_seconds(&mut self, delay_seconds: f64) -> Result<()> {
        check_non_negative("delay_seconds", delay_seconds)?;
        self.delay_seconds = delay_seconds;
        Ok(())
    }

    /// Checks a configuration assembled by hand.
    pub fn validate(&self) -> Result<()> {
        if self.segment_count == 0 {
            return Err(MotionError::invalid_configuration(
                "segment_count must be at least 1",
            ));
        }
        check_non_negative("threshold", self.threshold)?;
        check_non_negative("delay_seconds", self.delay_seconds)
    }

    /// `delay_seconds` as a `Duration`, saturating at `Duration::MAX`.
    pub fn delay(&self) -> Duration {
        Duration::try_from_secs_f64(self.delay_seconds).unwrap_or(Duration::MAX)
    }
}

fn check_non_negative(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(MotionError::invalid_configuration(format!(
            "{name} must be a non-negative number, got {value}"
        )))
    }
}

fn parse<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| {
            MotionError::invalid_configuration(format!("{key}={raw:?} is not a valid value"))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::recording_tracker::{RecordingStateTracker, RecordingStatus};
    use std::collections::HashMap;
    use std::time::Instant;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_reference_detector() {
        let config = Config::default();
        assert_eq!(config.segment_count, 20);
        assert_eq!(config.threshold, 10.0);
        assert_eq!(config.delay(), Duration::from_secs(3));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn segment_count_is_clamped() {
        let mut config = Config::default();
        config.set_segment_count(0);
        assert_eq!(config.segment_count, 1);
    }

    #[test]
    fn negative_values_are_rejected_and_preserved() {
        let mut config = Config::default();
        assert!(config.set_threshold(-1.0).is_err());
        assert!(config.set_delay_seconds(f64::NAN).is_err());
        assert_eq!(config, Config::default());
    }

    #[test]
    fn validate_catches_hand_built_values() {
        let config = Config {
            segment_count: 0,
            ..Config::default()
        };
        assert!(matches!(
            config.validate(),
            Err(MotionError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn environment_overrides() {
        let config = Config::from_lookup(lookup(&[
            (SEGMENTS_ENV, "5"),
            (THRESHOLD_ENV, " 12.5 "),
            (DELAY_ENV, "0"),
        ]))
        .unwrap();
        assert_eq!(config.segment_count, 5);
        assert_eq!(config.threshold, 12.5);
        assert_eq!(config.delay(), Duration::ZERO);
    }

    #[test]
    fn huge_delay_saturates_instead_of_vanishing() {
        let config = Config::from_lookup(lookup(&[(DELAY_ENV, "1e20")])).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.delay(), Duration::MAX);

        let t0 = Instant::now();
        let mut tracker = RecordingStateTracker::started_at(t0);
        tracker.on_motion_detected(t0);
        let status = tracker.status(t0 + Duration::from_secs(1), config.delay());
        assert_eq!(status, RecordingStatus::Recording);
    }

    #[test]
    fn malformed_environment_is_an_error() {
        assert!(Config::from_lookup(lookup(&[(SEGMENTS_ENV, "many")])).is_err());
        assert!(Config::from_lookup(lookup(&[(DELAY_ENV, "-2")])).is_err());
    }
}
