//! # Host Bridge Traits
//!
//! Contracts the player core requires from its host.
//!
//! ## Overview
//!
//! The core never touches the platform audio engine or the host logging
//! pipeline directly. Instead it talks to the traits in this crate and each
//! host ships an adapter for them.
//!
//! ## Traits
//!
//! ### Audio
//! - [`RenderOutput`](playback::RenderOutput) - Render clock plus push-style PCM scheduling
//!
//! ### Utilities
//! - [`LoggerSink`](logging::LoggerSink) - Forward structured logs to host logging
//!
//! ## Fail-Fast Strategy
//!
//! The core fails fast with a descriptive error when a required capability is
//! missing:
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//!
//! let config = CoreConfig::builder().build();
//! // Err(CapabilityMissing { capability: "RenderOutput", .. })
//! ```
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Adapters convert
//! platform errors into it and include enough context to act on.
//!
//! ## Thread Safety
//!
//! The render output is read from the real-time render callback, the update
//! timer and decode callbacks at once. Every trait therefore carries
//! [`PlatformSendSync`](platform::PlatformSendSync), and `RenderOutput`
//! implementations must never block.

pub mod error;
pub mod logging;
pub mod platform;
pub mod playback;

pub use error::BridgeError;

pub use playback::{PcmBuffer, PcmFormat, RenderOutput};
pub use logging::{ConsoleLogger, LogEntry, LogLevel, LoggerSink};
