use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use super::{RateLimitEntry, RateLimitStore};

/// In-memory rate-limit store
///
/// A process-wide map behind a single mutex. The lock is held for the whole
/// of `increment`, so concurrent checks for the same key are serialized and
/// cannot lose updates. State lives only for the process lifetime.
pub struct MemoryStore {
    entries: Mutex<HashMap<String, RateLimitEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, RateLimitEntry>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RateLimitStore for MemoryStore {
    fn get(&self, key: &str) -> Option<RateLimitEntry> {
        self.entries().get(key).copied()
    }

    fn set(&self, key: &str, entry: RateLimitEntry) {
        self.entries().insert(key.to_string(), entry);
    }

    fn delete(&self, key: &str) {
        self.entries().remove(key);
    }

    fn increment(&self, key: &str, window_ms: i64, now_ms: i64) -> RateLimitEntry {
        let mut entries = self.entries();
        let entry = entries.entry(key.to_string()).or_insert(RateLimitEntry {
            count: 0,
            window_reset_at: now_ms + window_ms,
        });

        // An ended window resets in place: full quota, new deadline
        if entry.window_reset_at <= now_ms {
            entry.count = 0;
            entry.window_reset_at = now_ms + window_ms;
        }

        entry.count = entry.count.saturating_add(1);
        *entry
    }

    fn sweep_expired(&self, now_ms: i64) -> usize {
        let mut entries = self.entries();
        let before = entries.len();
        entries.retain(|_, entry| entry.window_reset_at > now_ms);
        before - entries.len()
    }

    fn len(&self) -> usize {
        self.entries().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_set_delete_round_trip() {
        let store = MemoryStore::new();
        assert!(store.get("client-a").is_none());

        let entry = RateLimitEntry {
            count: 3,
            window_reset_at: 10_000,
        };
        store.set("client-a", entry);
        assert_eq!(store.get("client-a"), Some(entry));
        assert_eq!(store.len(), 1);

        store.delete("client-a");
        assert!(store.get("client-a").is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_increment_opens_fresh_window() {
        let store = MemoryStore::new();
        let entry = store.increment("client-a", 1000, 5000);

        assert_eq!(entry.count, 1);
        assert_eq!(entry.window_reset_at, 6000);
    }

    #[test]
    fn test_increment_accumulates_within_window() {
        let store = MemoryStore::new();
        store.increment("client-a", 1000, 5000);
        store.increment("client-a", 1000, 5100);
        let entry = store.increment("client-a", 1000, 5200);

        assert_eq!(entry.count, 3);
        // Deadline is set when the window opens and does not slide
        assert_eq!(entry.window_reset_at, 6000);
    }

    #[test]
    fn test_increment_resets_expired_window() {
        let store = MemoryStore::new();
        store.increment("client-a", 1000, 5000);
        store.increment("client-a", 1000, 5100);

        // At the deadline the old window has ended
        let entry = store.increment("client-a", 1000, 6000);
        assert_eq!(entry.count, 1);
        assert_eq!(entry.window_reset_at, 7000);
    }

    #[test]
    fn test_increment_saturates_at_counter_ceiling() {
        let store = MemoryStore::new();
        store.set(
            "client-a",
            RateLimitEntry {
                count: u32::MAX,
                window_reset_at: 10_000,
            },
        );

        // The window is still live, so the counter clamps instead of wrapping
        let entry = store.increment("client-a", 1000, 5000);
        assert_eq!(entry.count, u32::MAX);
        assert_eq!(entry.window_reset_at, 10_000);
    }

    #[test]
    fn test_sweep_removes_only_expired_entries() {
        let store = MemoryStore::new();
        store.set(
            "expired",
            RateLimitEntry {
                count: 4,
                window_reset_at: 1000,
            },
        );
        store.set(
            "live",
            RateLimitEntry {
                count: 1,
                window_reset_at: 9000,
            },
        );

        let removed = store.sweep_expired(5000);
        assert_eq!(removed, 1);
        assert!(store.get("expired").is_none());
        assert!(store.get("live").is_some());
    }

    #[test]
    fn test_sweep_empties_store_of_expired_keys() {
        let store = MemoryStore::new();
        for i in 0..100 {
            store.set(
                &format!("client-{}", i),
                RateLimitEntry {
                    count: 1,
                    window_reset_at: 1000 + i,
                },
            );
        }
        assert_eq!(store.len(), 100);

        let removed = store.sweep_expired(2000);
        assert_eq!(removed, 100);
        assert!(store.is_empty());
    }

    #[test]
    fn test_entry_expiring_exactly_now_is_swept() {
        let store = MemoryStore::new();
        store.set(
            "client-a",
            RateLimitEntry {
                count: 1,
                window_reset_at: 5000,
            },
        );

        assert_eq!(store.sweep_expired(5000), 1);
        assert!(store.is_empty());
    }
}
