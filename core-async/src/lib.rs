//! Async runtime abstraction layer for the player core.
//!
//! Every `core-*` crate depends on this crate instead of depending on Tokio
//! directly. It re-exports the runtime pieces the core needs and adds the
//! thread-safe containers shared between the network, decode, timer and
//! render contexts.
//!
//! # Modules
//!
//! - `task`: Task spawning
//! - `time`: Sleep, intervals, instants
//! - `sync`: Async primitives, channels, cancellation and the concurrent containers
//! - `runtime`: Runtime handles and `block_on`
//!
//! # Examples
//!
//! ```rust
//! use core_async::sync::ConcurrentQueue;
//!
//! let queue = ConcurrentQueue::new();
//! queue.put(1);
//! queue.put(2);
//! assert_eq!(queue.take(), Some(1));
//! ```

// Re-export the async entry-point/test macros so downstream crates never need
// direct Tokio dependencies.
pub use core_async_macros::{main, test};

pub mod containers;
pub mod runtime;
pub mod sync;
pub mod task;
pub mod time;

pub use task::spawn;
pub use time::{sleep, Duration, Instant};

/// Waits on multiple concurrent branches, returning when the first completes.
pub use tokio::select;
