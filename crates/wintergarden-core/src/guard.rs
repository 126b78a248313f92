//! Recently-seen request filter.
//!
//! Chat transports redeliver messages after reconnects; the guard drops a
//! message id it has already processed. Suppression is best-effort: once
//! the set grows past its bound it is cleared wholesale, so an id seen
//! before the clear is accepted again afterwards.

use std::collections::HashSet;
use std::sync::Mutex;

use tracing::debug;

/// Set size that triggers a full clear.
pub const DEFAULT_GUARD_CAPACITY: usize = 1000;

/// Process-wide duplicate-request filter. Starts empty, never persisted.
#[derive(Debug)]
pub struct RequestGuard {
    seen: Mutex<HashSet<i64>>,
    capacity: usize,
}

impl Default for RequestGuard {
    fn default() -> Self {
        Self::new(DEFAULT_GUARD_CAPACITY)
    }
}

impl RequestGuard {
    pub fn new(capacity: usize) -> Self {
        Self {
            seen: Mutex::new(HashSet::new()),
            capacity,
        }
    }

    /// Whether `request_id` is in the current window.
    pub fn seen(&self, request_id: i64) -> bool {
        self.lock().contains(&request_id)
    }

    /// Remember `request_id`, clearing the window if it overflows.
    pub fn record(&self, request_id: i64) {
        let mut seen = self.lock();
        seen.insert(request_id);
        self.clear_if_full(&mut seen);
    }

    /// Check and record in one step. Returns `false` for a duplicate.
    pub fn admit(&self, request_id: i64) -> bool {
        let mut seen = self.lock();
        if !seen.insert(request_id) {
            debug!(request_id, "duplicate request dropped");
            return false;
        }
        self.clear_if_full(&mut seen);
        true
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn clear_if_full(&self, seen: &mut HashSet<i64>) {
        if seen.len() > self.capacity {
            debug!(size = seen.len(), "request window full, clearing");
            seen.clear();
        }
    }

    // The set stays consistent across a panic in another holder, so a
    // poisoned lock is recovered rather than propagated.
    fn lock(&self) -> std::sync::MutexGuard<'_, HashSet<i64>> {
        self.seen.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
