//! # Buffer Configuration
//!
//! Thresholds driving the buffering state machine. All values are seconds of
//! audio at the render clock's sample rate.

use serde::{Deserialize, Serialize};

use crate::error::{PlaybackError, Result};

/// Buffering thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BufferConfig {
    /// Audio required before the first start.
    ///
    /// Default: 0.5 s.
    #[serde(default = "default_pre_buffer_s")]
    pub pre_buffer_s: f64,

    /// Audio required before restarting after an underrun.
    ///
    /// Default: 1.5 s.
    #[serde(default = "default_re_buffer_s")]
    pub re_buffer_s: f64,

    /// Audio handed to the scheduler per refill.
    ///
    /// Default: 0.5 s.
    #[serde(default = "default_heal_target_s")]
    pub heal_target_s: f64,

    /// Scheduled audio at or below which a refill is triggered.
    ///
    /// Default: 0.6 s.
    #[serde(default = "default_low_watermark_s")]
    pub low_watermark_s: f64,

    /// Length of the sliding window used for the averaged buffer level.
    ///
    /// Default: 3 s.
    #[serde(default = "default_averaging_window_s")]
    pub averaging_window_s: f64,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            pre_buffer_s: default_pre_buffer_s(),
            re_buffer_s: default_re_buffer_s(),
            heal_target_s: default_heal_target_s(),
            low_watermark_s: default_low_watermark_s(),
            averaging_window_s: default_averaging_window_s(),
        }
    }
}

impl BufferConfig {
    /// Starts as early as possible at the cost of more underruns.
    pub fn low_latency() -> Self {
        Self {
            pre_buffer_s: 0.25,
            re_buffer_s: 0.75,
            heal_target_s: 0.25,
            low_watermark_s: 0.3,
            ..Default::default()
        }
    }

    /// Tolerates long network stalls.
    pub fn robust() -> Self {
        Self {
            pre_buffer_s: 1.0,
            re_buffer_s: 3.0,
            heal_target_s: 1.0,
            low_watermark_s: 1.2,
            averaging_window_s: 5.0,
        }
    }

    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("pre_buffer_s", self.pre_buffer_s),
            ("re_buffer_s", self.re_buffer_s),
            ("heal_target_s", self.heal_target_s),
            ("low_watermark_s", self.low_watermark_s),
            ("averaging_window_s", self.averaging_window_s),
        ];
        for (name, value) in fields {
            if !value.is_finite() || value < 0.0 {
                return Err(PlaybackError::InvalidConfig(format!(
                    "{} must be a finite, non-negative number of seconds",
                    name
                )));
            }
        }

        if self.heal_target_s == 0.0 {
            return Err(PlaybackError::InvalidConfig(
                "heal_target_s must be > 0".to_string(),
            ));
        }

        if self.re_buffer_s < self.pre_buffer_s {
            return Err(PlaybackError::InvalidConfig(
                "re_buffer_s cannot be smaller than pre_buffer_s".to_string(),
            ));
        }

        Ok(())
    }
}

fn default_pre_buffer_s() -> f64 {
    0.5
}

fn default_re_buffer_s() -> f64 {
    1.5
}

fn default_heal_target_s() -> f64 {
    0.5
}

fn default_low_watermark_s() -> f64 {
    0.6
}

fn default_averaging_window_s() -> f64 {
    3.0
}
