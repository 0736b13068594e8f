//! Synchronization primitives.
//!
//! Async-aware primitives and channels come from `tokio::sync`; cancellation
//! comes from `tokio_util`. The blocking-free concurrent containers in
//! [`crate::containers`] are re-exported here so callers find every shared
//! state building block in one place.
//!
//! # Examples
//!
//! ```rust
//! use core_async::sync::{ConcurrentSet, Mutex};
//!
//! async fn example() {
//!     let mutex = Mutex::new(42);
//!     *mutex.lock().await += 1;
//!
//!     let set = ConcurrentSet::new();
//!     set.insert("metadata");
//!     assert!(set.contains(&"metadata"));
//! }
//! ```

pub use tokio::sync::{
    broadcast, mpsc, oneshot, watch, Mutex, MutexGuard, Notify, RwLock, RwLockReadGuard,
    RwLockWriteGuard,
};

pub use tokio_util::sync::CancellationToken;

pub use crate::containers::{ConcurrentMap, ConcurrentQueue, ConcurrentSet};
