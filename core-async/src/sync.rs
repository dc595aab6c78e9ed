//! Synchronization primitives.
//!
//! All primitives are `Send + Sync` and async-aware; holding an async
//! [`Mutex`] guard across an `.await` does not block the executor.
//!
//! # Examples
//!
//! ```rust
//! use core_async::sync::{broadcast, Mutex};
//!
//! async fn example() {
//!     let mutex = Mutex::new(0u32);
//!     *mutex.lock().await += 1;
//!
//!     let (tx, mut rx) = broadcast::channel::<u32>(8);
//!     tx.send(1).unwrap();
//!     assert_eq!(rx.recv().await.unwrap(), 1);
//! }
//! ```

pub use tokio::sync::{
    broadcast, mpsc, oneshot, watch, Mutex, MutexGuard, Notify, RwLock, RwLockReadGuard,
    RwLockWriteGuard, Semaphore, SemaphorePermit,
};

pub use tokio_util::sync::{CancellationToken, DropGuard, WaitForCancellationFuture};
