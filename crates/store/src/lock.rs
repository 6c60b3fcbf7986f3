//! Writer exclusivity, reader leases and retry pacing.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, RwLock, RwLockWriteGuard, TryLockError};
use std::thread;
use std::time::{Duration, Instant};

use crate::error::StoreError;

const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Pacing for retrying an operation that lost the writer race.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub multiplier: u32,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            multiplier: 2,
            max_delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// Delay to wait before the given 1-based attempt. The first
    /// attempt never waits; each later one doubles (by `multiplier`)
    /// up to `max_delay`.
    pub fn delay_before(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }
        let factor = self.multiplier.saturating_pow(attempt - 2);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// Mutual exclusion for state mutators.
///
/// Readers never take this lock; they read the shared state behind its
/// own `RwLock`. A mutator that cannot acquire exclusivity within its
/// deadline gets [`StoreError::LockTimeout`] and has had no effect.
#[derive(Debug, Default)]
pub struct WriterLock {
    inner: Mutex<()>,
    held_since: RwLock<Option<Instant>>,
}

impl WriterLock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn acquire(&self, timeout: Duration) -> Result<WriterGuard<'_>, StoreError> {
        let started = Instant::now();
        loop {
            match self.inner.try_lock() {
                Ok(guard) => return Ok(self.hold(guard)),
                Err(TryLockError::Poisoned(poisoned)) => {
                    // A prior writer panicked. Mutation happens on a
                    // private clone that is only swapped in after a
                    // successful save, so the shared state is intact.
                    return Ok(self.hold(poisoned.into_inner()));
                }
                Err(TryLockError::WouldBlock) => {
                    if started.elapsed() >= timeout {
                        return Err(StoreError::LockTimeout {
                            waited: started.elapsed(),
                            held: self.held_for(),
                        });
                    }
                    thread::sleep(POLL_INTERVAL);
                }
            }
        }
    }

    fn hold<'a>(&'a self, guard: MutexGuard<'a, ()>) -> WriterGuard<'a> {
        *write_lenient(&self.held_since) = Some(Instant::now());
        WriterGuard {
            lock: self,
            _guard: guard,
        }
    }

    /// How long the current holder has had the lock.
    fn held_for(&self) -> Duration {
        read_lenient(&self.held_since)
            .map(|since| since.elapsed())
            .unwrap_or(Duration::ZERO)
    }
}

/// Held for the duration of one mutation.
#[derive(Debug)]
pub struct WriterGuard<'a> {
    lock: &'a WriterLock,
    _guard: MutexGuard<'a, ()>,
}

impl Drop for WriterGuard<'_> {
    fn drop(&mut self) {
        *write_lenient(&self.lock.held_since) = None;
    }
}

fn read_lenient(slot: &RwLock<Option<Instant>>) -> Option<Instant> {
    *slot.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write_lenient(slot: &RwLock<Option<Instant>>) -> RwLockWriteGuard<'_, Option<Instant>> {
    slot.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Counts in-flight read leases so shutdown can tell whether readers
/// are still mid-query.
#[derive(Debug, Default)]
pub struct LeaseTracker {
    active: AtomicUsize,
}

impl LeaseTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&self) -> ReadLease<'_> {
        self.active.fetch_add(1, Ordering::SeqCst);
        ReadLease { tracker: self }
    }

    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }
}

/// Released when dropped.
#[derive(Debug)]
pub struct ReadLease<'a> {
    tracker: &'a LeaseTracker,
}

impl Drop for ReadLease<'_> {
    fn drop(&mut self) {
        self.tracker.active.fetch_sub(1, Ordering::SeqCst);
    }
}
