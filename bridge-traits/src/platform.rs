//! Marker traits keeping bridge bounds in one place.
//!
//! Host adapters are shared between the render callback, decode callbacks and
//! async tasks, so every bridge trait requires `Send + Sync`.

/// Marker trait for `Send + Sync` bridge implementations.
pub trait PlatformSendSync: Send + Sync {}

impl<T> PlatformSendSync for T where T: Send + Sync {}
