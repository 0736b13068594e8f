//! Task spawning.
//!
//! Thin wrappers over Tokio so the player crates can spawn work without a
//! direct Tokio dependency. `spawn_on` is used by components that capture a
//! runtime [`Handle`](crate::runtime::Handle) at construction and later spawn
//! from threads that are not themselves inside the runtime (decode callbacks,
//! the render timer).

pub use tokio::task::{spawn_blocking, yield_now, JoinError, JoinHandle};

use crate::runtime::Handle;

/// Spawns a new asynchronous task on the current runtime.
///
/// # Panics
///
/// Panics when called outside of a runtime context. Use [`spawn_on`] from
/// foreign threads.
///
/// # Examples
///
/// ```rust
/// use core_async::task::spawn;
///
/// # async fn example() {
/// let handle = spawn(async { 42 });
/// assert_eq!(handle.await.unwrap(), 42);
/// # }
/// ```
pub fn spawn<F>(future: F) -> JoinHandle<F::Output>
where
    F: std::future::Future + Send + 'static,
    F::Output: Send + 'static,
{
    tokio::task::spawn(future)
}

/// Spawns a task on an explicit runtime handle.
///
/// Safe to call from any thread, including threads the runtime does not own.
pub fn spawn_on<F>(handle: &Handle, future: F) -> JoinHandle<F::Output>
where
    F: std::future::Future + Send + 'static,
    F::Output: Send + 'static,
{
    handle.spawn(future)
}

/// Result type for task operations.
pub type Result<T> = std::result::Result<T, JoinError>;
