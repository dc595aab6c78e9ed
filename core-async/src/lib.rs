//! Async runtime abstraction layer for the Murmur core crates.
//!
//! Every `core-*` crate depends on this crate instead of depending on Tokio
//! directly, so the executor, timers and synchronization primitives are
//! chosen in exactly one place.
//!
//! # Modules
//!
//! - `task`: task spawning
//! - `time`: sleeps, timeouts, instants
//! - `sync`: channels, async locks and cancellation
//! - `runtime`: blocking entry points used by the attribute macros
//!
//! # Examples
//!
//! ```rust
//! use core_async::sync::CancellationToken;
//! use core_async::time::{sleep, Duration};
//!
//! async fn example() {
//!     let token = CancellationToken::new();
//!     let child = token.child_token();
//!     let handle = core_async::spawn(async move { child.cancelled().await });
//!     sleep(Duration::from_millis(10)).await;
//!     token.cancel();
//!     let _ = handle.await;
//! }
//! ```

// Re-export the async entry-point/test macros so downstream crates never need
// direct Tokio dependencies.
pub use core_async_macros::{main, test};

pub mod runtime;
pub mod sync;
pub mod task;
pub mod time;

// Race helper re-exported for crates that select over several futures.
pub use tokio::select;

pub use task::spawn;
pub use time::{sleep, Duration, Instant};
