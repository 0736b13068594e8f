//! Render output contract and PCM payload types.
//!
//! The host's audio engine owns the render graph. The core only needs two
//! things from it: the current position of the render clock, expressed in
//! frames, and a way to hand it PCM that should start at a given frame.

use crate::platform::PlatformSendSync;

/// Sample rate and channel layout of decoded PCM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PcmFormat {
    /// Frames per second.
    pub sample_rate: u32,
    /// Interleaved channels per frame.
    pub channels: u16,
}

impl PcmFormat {
    pub fn new(sample_rate: u32, channels: u16) -> Self {
        Self {
            sample_rate,
            channels,
        }
    }
}

/// Chunk of decoded, interleaved PCM.
#[derive(Debug, Clone, PartialEq)]
pub struct PcmBuffer {
    /// Interleaved samples in `[-1.0, 1.0]`.
    pub samples: Vec<f32>,
    /// Number of frames (samples per channel).
    pub frames: u64,
    pub format: PcmFormat,
}

impl PcmBuffer {
    /// Builds a buffer from interleaved samples, deriving the frame count.
    pub fn new(samples: Vec<f32>, format: PcmFormat) -> Self {
        let channels = u64::from(format.channels.max(1));
        let frames = samples.len() as u64 / channels;
        Self {
            samples,
            frames,
            format,
        }
    }

    /// Silent buffer of `frames` frames, mostly useful for hosts and tests.
    pub fn silence(frames: u64, format: PcmFormat) -> Self {
        let len = frames as usize * usize::from(format.channels.max(1));
        Self {
            samples: vec![0.0; len],
            frames,
            format,
        }
    }

    /// Duration in seconds at the buffer's own sample rate.
    pub fn duration_s(&self) -> f64 {
        if self.format.sample_rate == 0 {
            return 0.0;
        }
        self.frames as f64 / f64::from(self.format.sample_rate)
    }

    pub fn is_empty(&self) -> bool {
        self.frames == 0
    }
}

/// Host audio output driven by the playback scheduler.
///
/// Implementations are called from the update timer and decode callbacks
/// while the render thread is running, and must return without blocking.
pub trait RenderOutput: PlatformSendSync {
    /// Current render clock position in frames at [`sample_rate`](Self::sample_rate).
    ///
    /// Returns `None` while the engine is not running; the clock is then
    /// considered frozen.
    fn now_frames(&self) -> Option<u64>;

    /// Sample rate of the render clock.
    fn sample_rate(&self) -> u32;

    /// Queues `pcm` so that its first frame is rendered at `at_frame`.
    ///
    /// Never called while the player core holds one of its locks, so
    /// implementations may call back into the buffer.
    fn schedule(&self, pcm: PcmBuffer, at_frame: u64);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_are_derived_from_interleaved_samples() {
        let buffer = PcmBuffer::new(vec![0.0; 8], PcmFormat::new(44_100, 2));
        assert_eq!(buffer.frames, 4);
    }

    #[test]
    fn silence_has_expected_duration() {
        let buffer = PcmBuffer::silence(22_050, PcmFormat::new(44_100, 2));
        assert_eq!(buffer.samples.len(), 44_100);
        assert!((buffer.duration_s() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn zero_rate_has_zero_duration() {
        let buffer = PcmBuffer::silence(10, PcmFormat::new(0, 1));
        assert_eq!(buffer.duration_s(), 0.0);
    }
}
