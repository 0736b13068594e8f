//! Workspace umbrella crate.
//!
//! Re-exports the player core crates behind feature flags so host
//! applications can depend on `ybrid-player` alone:
//!
//! - `playback`: buffering and render-clock scheduling (`core-playback`)
//! - `session` (default): control-plane session, change-over handling and the
//!   playback pipeline (`core-session`, `core-runtime`)

#[cfg(feature = "playback")]
pub use core_playback as playback;

#[cfg(feature = "session")]
pub use core_runtime as runtime;

#[cfg(feature = "session")]
pub use core_session as session;
