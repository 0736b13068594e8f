//! # Core Configuration
//!
//! Builder-based configuration for the player core.
//!
//! ## Overview
//!
//! [`CoreConfig`] holds the host collaborators and runtime settings shared by
//! the playback pipeline and the session. The builder fails fast when a
//! required bridge is missing so misconfiguration surfaces at startup rather
//! than on the first decoded chunk.
//!
//! ## Required Dependencies
//!
//! - `RenderOutput` - render clock and PCM scheduling
//!
//! ## Optional Dependencies
//!
//! - `LoggerSink` - host log forwarding
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//! use std::time::Duration;
//!
//! let config = CoreConfig::builder()
//!     .render_output(Arc::new(MyAudioEngine::new()))
//!     .update_interval(Duration::from_millis(100))
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use crate::events::DEFAULT_EVENT_BUFFER_SIZE;
use bridge_traits::{LoggerSink, RenderOutput};
use std::sync::Arc;
use std::time::Duration;

/// Default period of the buffer update timer.
pub const DEFAULT_UPDATE_INTERVAL: Duration = Duration::from_millis(200);

/// Runtime configuration shared by the player components.
#[derive(Clone)]
pub struct CoreConfig {
    /// Host audio output (required)
    pub render_output: Arc<dyn RenderOutput>,

    /// Host log sink (optional)
    pub logger_sink: Option<Arc<dyn LoggerSink>>,

    /// Events buffered per listener before it starts lagging
    pub event_buffer_size: usize,

    /// Period of the buffer update timer
    pub update_interval: Duration,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("render_output", &"RenderOutput { ... }")
            .field(
                "logger_sink",
                &self.logger_sink.as_ref().map(|_| "LoggerSink { ... }"),
            )
            .field("event_buffer_size", &self.event_buffer_size)
            .field("update_interval", &self.update_interval)
            .finish()
    }
}

impl CoreConfig {
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Checks settings that the builder cannot enforce through types.
    pub fn validate(&self) -> Result<()> {
        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than 0".to_string(),
            ));
        }

        if self.update_interval.is_zero() {
            return Err(Error::Config(
                "Update interval must be greater than 0".to_string(),
            ));
        }

        if self.render_output.sample_rate() == 0 {
            return Err(Error::Config(
                "Render output reports a sample rate of 0".to_string(),
            ));
        }

        Ok(())
    }
}

fn render_output_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "RenderOutput".to_string(),
        message: "A RenderOutput implementation is required to schedule audio. \
                 Inject the host audio engine adapter with .render_output()."
            .to_string(),
    }
}

/// Builder for [`CoreConfig`].
#[derive(Default)]
pub struct CoreConfigBuilder {
    render_output: Option<Arc<dyn RenderOutput>>,
    logger_sink: Option<Arc<dyn LoggerSink>>,
    event_buffer_size: Option<usize>,
    update_interval: Option<Duration>,
}

impl CoreConfigBuilder {
    pub fn render_output(mut self, output: Arc<dyn RenderOutput>) -> Self {
        self.render_output = Some(output);
        self
    }

    pub fn logger_sink(mut self, sink: Arc<dyn LoggerSink>) -> Self {
        self.logger_sink = Some(sink);
        self
    }

    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    pub fn update_interval(mut self, interval: Duration) -> Self {
        self.update_interval = Some(interval);
        self
    }

    /// Builds and validates the configuration.
    ///
    /// # Errors
    ///
    /// - [`Error::CapabilityMissing`] when no render output was supplied
    /// - [`Error::Config`] when a setting is out of range
    pub fn build(self) -> Result<CoreConfig> {
        let render_output = self.render_output.ok_or_else(render_output_missing_error)?;

        let config = CoreConfig {
            render_output,
            logger_sink: self.logger_sink,
            event_buffer_size: self.event_buffer_size.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
            update_interval: self.update_interval.unwrap_or(DEFAULT_UPDATE_INTERVAL),
        };

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::PcmBuffer;

    struct SilentOutput {
        rate: u32,
    }

    impl RenderOutput for SilentOutput {
        fn now_frames(&self) -> Option<u64> {
            Some(0)
        }

        fn sample_rate(&self) -> u32 {
            self.rate
        }

        fn schedule(&self, _pcm: PcmBuffer, _at_frame: u64) {}
    }

    fn output() -> Arc<dyn RenderOutput> {
        Arc::new(SilentOutput { rate: 48_000 })
    }

    #[test]
    fn missing_render_output_fails_fast() {
        let err = CoreConfig::builder().build().unwrap_err();
        match err {
            Error::CapabilityMissing { capability, .. } => assert_eq!(capability, "RenderOutput"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn defaults_are_applied() {
        let config = CoreConfig::builder().render_output(output()).build().unwrap();
        assert_eq!(config.event_buffer_size, DEFAULT_EVENT_BUFFER_SIZE);
        assert_eq!(config.update_interval, DEFAULT_UPDATE_INTERVAL);
        assert!(config.logger_sink.is_none());
    }

    #[test]
    fn zero_update_interval_is_rejected() {
        let result = CoreConfig::builder()
            .render_output(output())
            .update_interval(Duration::ZERO)
            .build();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn zero_sample_rate_is_rejected() {
        let result = CoreConfig::builder()
            .render_output(Arc::new(SilentOutput { rate: 0 }))
            .build();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn debug_output_hides_bridges() {
        let config = CoreConfig::builder()
            .render_output(output())
            .event_buffer_size(16)
            .build()
            .unwrap();
        let rendered = format!("{:?}", config);
        assert!(rendered.contains("RenderOutput { ... }"));
        assert!(rendered.contains("event_buffer_size: 16"));
    }
}
