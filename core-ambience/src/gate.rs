//! # Generation Gate
//!
//! Admission control for the generation workflow: at most one run in flight,
//! and a minimum interval since the last successful run. Triggers that are
//! not admitted are dropped, never queued.

use bridge_traits::Clock;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Why a trigger was dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    NoItems,
    InProgress,
    /// The newest item is not from the user.
    AwaitingUser,
    TooFewItems { count: usize },
    Throttled { remaining: Duration },
    StillPlaying,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NoItems => write!(f, "conversation is empty"),
            SkipReason::InProgress => write!(f, "a generation is already in progress"),
            SkipReason::AwaitingUser => write!(f, "last item is not from the user"),
            SkipReason::TooFewItems { count } => {
                write!(f, "only {} conversation items", count)
            }
            SkipReason::Throttled { remaining } => {
                write!(f, "throttled for another {}s", remaining.as_secs())
            }
            SkipReason::StillPlaying => write!(f, "a generated clip is still playing"),
        }
    }
}

struct GateInner {
    in_progress: AtomicBool,
    last_success: Mutex<Option<DateTime<Utc>>>,
    min_interval: Duration,
    clock: Arc<dyn Clock>,
}

/// In-progress flag plus success throttle, shared by clones.
#[derive(Clone)]
pub struct GenerationGate {
    inner: Arc<GateInner>,
}

impl GenerationGate {
    pub fn new(min_interval: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(GateInner {
                in_progress: AtomicBool::new(false),
                last_success: Mutex::new(None),
                min_interval,
                clock,
            }),
        }
    }

    pub fn is_in_progress(&self) -> bool {
        self.inner.in_progress.load(Ordering::Acquire)
    }

    /// Time left before another run may start, if any.
    pub fn remaining_cooldown(&self) -> Option<Duration> {
        let last = (*self.inner.last_success.lock())?;
        let elapsed = (self.inner.clock.now() - last)
            .to_std()
            .unwrap_or(Duration::ZERO);

        self.inner
            .min_interval
            .checked_sub(elapsed)
            .filter(|remaining| !remaining.is_zero())
    }

    pub fn last_success(&self) -> Option<DateTime<Utc>> {
        *self.inner.last_success.lock()
    }

    pub fn record_success(&self) {
        *self.inner.last_success.lock() = Some(self.inner.clock.now());
    }

    /// Claim the in-progress flag. Released when the permit is dropped.
    pub fn try_acquire(&self) -> Option<GenerationPermit> {
        self.inner
            .in_progress
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;

        Some(GenerationPermit {
            gate: self.clone(),
        })
    }
}

impl fmt::Debug for GenerationGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerationGate")
            .field("in_progress", &self.is_in_progress())
            .field("last_success", &self.last_success())
            .field("min_interval", &self.inner.min_interval)
            .finish()
    }
}

/// Held for the duration of one generation run.
#[must_use]
pub struct GenerationPermit {
    gate: GenerationGate,
}

impl GenerationPermit {
    /// Record a successful run, then release the in-progress flag.
    ///
    /// The cooldown is in place before another caller can acquire.
    pub fn succeed(self) {
        self.gate.record_success();
    }
}

impl fmt::Debug for GenerationPermit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerationPermit").finish()
    }
}

impl Drop for GenerationPermit {
    fn drop(&mut self) {
        self.gate.inner.in_progress.store(false, Ordering::Release);
    }
}
