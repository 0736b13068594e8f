//! # Playback Buffering & Scheduling
//!
//! Accumulates decoded audio, places it on the host render clock and fires
//! markers at the instant the audio in front of them has been rendered.
//!
//! ## Overview
//!
//! - [`PlaybackBuffer`] runs the Empty / Ready / Wait buffering state machine
//! - [`PlaybackScheduling`] maps chunks to render-clock frames
//! - [`CueTimer`] fires markers after the audio ahead of them
//! - [`Completion`] / [`CompletionHandle`] carry boolean outcomes to callers
//!
//! ## Usage
//!
//! ```ignore
//! use core_playback::{BufferConfig, Completion, PlaybackBuffer, PlaybackScheduling, TokioCueTimer};
//!
//! let (cue_tx, mut cue_rx) = core_async::sync::mpsc::unbounded_channel();
//! let scheduling = Arc::new(PlaybackScheduling::new(render_output.clone()));
//! let timer = Arc::new(TokioCueTimer::from_current().unwrap());
//! let buffer = PlaybackBuffer::new(BufferConfig::default(), scheduling, timer, cue_tx)?;
//!
//! buffer.put(decoded_pcm)?;
//! let (done, handle) = Completion::new();
//! buffer.put(done)?;
//! // `handle` resolves `true` once the audio put before it was rendered.
//! ```

pub mod buffer;
pub mod chunk;
pub mod completion;
pub mod config;
pub mod cue;
pub mod error;
pub mod metrics;
pub mod scheduling;

pub use buffer::{BufferState, PlaybackBuffer};
pub use chunk::{AudioChunk, Chunk, CuePoint};
pub use completion::{Completion, CompletionHandle};
pub use config::BufferConfig;
pub use cue::{CueEvent, CueTimer, ScheduledMarker, TokioCueTimer};
pub use error::{PlaybackError, Result};
pub use metrics::{BufferLevel, BufferMetrics, BufferStats};
pub use scheduling::{PlaybackScheduling, Placement};
