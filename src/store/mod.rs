mod memory;

pub use memory::MemoryStore;

/// Counter state for one client key within its current window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitEntry {
    /// Attempts seen in the window, admitted and rejected alike
    pub count: u32,
    /// Absolute end of the window, epoch milliseconds
    pub window_reset_at: i64,
}

/// Storage seam for rate-limit counters
///
/// The limiter talks only to this trait, so the in-memory map can be swapped
/// for an external time-indexed store. `increment` is the single mutating
/// step of a check and must be atomic per call, the same way INCR is on a
/// networked store.
pub trait RateLimitStore: Send + Sync {
    /// Read the entry for `key` without mutating it
    fn get(&self, key: &str) -> Option<RateLimitEntry>;

    /// Insert or replace the entry for `key`
    fn set(&self, key: &str, entry: RateLimitEntry);

    /// Remove the entry for `key`
    fn delete(&self, key: &str);

    /// Bump the counter for `key`, opening a fresh window when the current
    /// one has ended, and return the entry after the increment
    fn increment(&self, key: &str, window_ms: i64, now_ms: i64) -> RateLimitEntry;

    /// Drop every entry whose window ended at or before `now_ms`,
    /// returning how many were removed
    fn sweep_expired(&self, now_ms: i64) -> usize;

    /// Number of tracked keys
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
