//! Time-related abstractions backed by `tokio::time`.
//!
//! Under a paused runtime (see `runtime::block_on_paused`) these timers
//! advance virtually, which the playback tests rely on.

pub use tokio::time::{interval, sleep, sleep_until, timeout, Interval, Sleep, Timeout};

pub use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Monotonic instant that follows the runtime clock, paused or not.
pub use tokio::time::Instant;
