//! The single mutex guarding the cache map.
//!
//! A fetch task that panics while holding the guard poisons the mutex. Every
//! write under the guard is a complete `watch` send or map update, so the map
//! is still consistent and the lock is handed back with its poison cleared.

use std::sync::{Mutex, MutexGuard, PoisonError};

use metrics::counter;
use tracing::error;

const METRIC_LOCK_RECOVERED: &str = "libris_cache_lock_recovered_total";

pub(crate) struct MapLock<T> {
    inner: Mutex<T>,
}

impl<T> MapLock<T> {
    pub(crate) fn new(value: T) -> Self {
        Self {
            inner: Mutex::new(value),
        }
    }

    /// Lock for `op`, the cache operation name used in logs and metrics.
    pub(crate) fn acquire(&self, op: &'static str) -> MutexGuard<'_, T> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| self.recover(op, poisoned))
    }

    fn recover<'a>(
        &'a self,
        op: &'static str,
        poisoned: PoisonError<MutexGuard<'a, T>>,
    ) -> MutexGuard<'a, T> {
        counter!(METRIC_LOCK_RECOVERED, "op" => op).increment(1);
        error!(op, "Cache map lock was poisoned by a panicking task; clearing");
        self.inner.clear_poison();
        poisoned.into_inner()
    }

    #[cfg(test)]
    fn is_poisoned(&self) -> bool {
        self.inner.is_poisoned()
    }
}
