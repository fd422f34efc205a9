// Rate Limit Store Integration Tests
//
// 测试限流服务与存储接缝的组合:可替换的后端、并发计数的完整性、
// 惰性窗口重置,以及后台清扫任务的内存回收

use chrono::Utc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use pmai_gateway::services::RateLimiterService;
use pmai_gateway::store::{RateLimitEntry, RateLimitStore};
use pmai_gateway::MemoryStore;

/// 委托给内存实现并统计调用次数的包装存储
///
/// 证明限流服务只通过 trait 与存储交互,后端可以整体替换
struct CountingStore {
    inner: MemoryStore,
    increments: AtomicUsize,
    sweeps: AtomicUsize,
}

impl CountingStore {
    fn new() -> Self {
        Self {
            inner: MemoryStore::new(),
            increments: AtomicUsize::new(0),
            sweeps: AtomicUsize::new(0),
        }
    }
}

impl RateLimitStore for CountingStore {
    fn get(&self, key: &str) -> Option<RateLimitEntry> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, entry: RateLimitEntry) {
        self.inner.set(key, entry)
    }

    fn delete(&self, key: &str) {
        self.inner.delete(key)
    }

    fn increment(&self, key: &str, window_ms: i64, now_ms: i64) -> RateLimitEntry {
        self.increments.fetch_add(1, Ordering::SeqCst);
        self.inner.increment(key, window_ms, now_ms)
    }

    fn sweep_expired(&self, now_ms: i64) -> usize {
        self.sweeps.fetch_add(1, Ordering::SeqCst);
        self.inner.sweep_expired(now_ms)
    }

    fn len(&self) -> usize {
        self.inner.len()
    }
}

#[test]
fn test_limiter_works_through_swapped_backend() {
    let store = Arc::new(CountingStore::new());
    let limiter = RateLimiterService::new(store.clone(), 2, 1_000);

    let now = Utc::now().timestamp_millis();
    assert!(limiter.check_at("client-a", now).allowed);
    assert!(limiter.check_at("client-a", now + 10).allowed);
    assert!(!limiter.check_at("client-a", now + 20).allowed);

    // 每次检查恰好一次存储写入,包括被拒绝的那次
    assert_eq!(store.increments.load(Ordering::SeqCst), 3);

    limiter.sweep();
    assert_eq!(store.sweeps.load(Ordering::SeqCst), 1);
}

#[test]
fn test_concurrent_checks_do_not_lose_counts() {
    let store: Arc<dyn RateLimitStore> = Arc::new(MemoryStore::new());
    let limiter = Arc::new(RateLimiterService::new(store.clone(), u32::MAX, 3_600_000));

    let now = Utc::now().timestamp_millis();
    let mut handles = Vec::new();

    for _ in 0..8 {
        let limiter = limiter.clone();
        handles.push(std::thread::spawn(move || {
            for _ in 0..500 {
                limiter.check_at("shared-client", now);
            }
        }));
    }

    for handle in handles {
        handle.join().expect("checking thread panicked");
    }

    // 读改写在同一把锁内完成,4000 次并发尝试一次不丢
    let entry = store.get("shared-client").expect("shared entry missing");
    assert_eq!(entry.count, 4_000);
}

#[test]
fn test_lazy_reset_restores_quota_without_sweeper() {
    let store: Arc<dyn RateLimitStore> = Arc::new(MemoryStore::new());
    let limiter = RateLimiterService::new(store.clone(), 1, 1_000);

    let now = Utc::now().timestamp_millis();
    assert!(limiter.check_at("client-b", now).allowed);
    assert!(!limiter.check_at("client-b", now + 500).allowed);

    // 没有任何清扫,窗口结束后下一次检查自行开新窗口
    let result = limiter.check_at("client-b", now + 1_000);
    assert!(result.allowed);
    assert_eq!(result.remaining, 0);
    assert_eq!(result.reset_at, now + 2_000);

    // 旧条目被原地复用,存储中仍然只有一个键
    assert_eq!(store.len(), 1);
}

#[test]
fn test_sweep_only_removes_expired_windows() {
    let store: Arc<dyn RateLimitStore> = Arc::new(MemoryStore::new());
    let limiter = RateLimiterService::new(store.clone(), 5, 60_000);

    let now = Utc::now().timestamp_millis();
    limiter.check_at("active", now);

    // 手工植入一个已结束的窗口
    store.set(
        "expired",
        RateLimitEntry {
            count: 3,
            window_reset_at: now - 1,
        },
    );

    let removed = store.sweep_expired(now);
    assert_eq!(removed, 1);
    assert!(store.get("expired").is_none());
    assert!(store.get("active").is_some());
}

#[tokio::test]
async fn test_background_sweeper_reclaims_expired_windows() {
    let store: Arc<dyn RateLimitStore> = Arc::new(MemoryStore::new());
    let limiter = Arc::new(RateLimiterService::new(store, 5, 20));

    // 50 个客户端各开一个 20ms 窗口
    for i in 0..50 {
        limiter.check(&format!("client-{}", i));
    }
    assert_eq!(limiter.tracked_keys(), 50);

    // 等窗口全部过期,再让清扫任务跑几轮
    tokio::time::sleep(Duration::from_millis(40)).await;
    let handle = limiter.spawn_sweeper(Duration::from_millis(25));
    tokio::time::sleep(Duration::from_millis(80)).await;

    assert_eq!(limiter.tracked_keys(), 0);

    // 清扫之后配额照常恢复
    let result = limiter.check("client-0");
    assert!(result.allowed);
    assert_eq!(result.remaining, 4);

    handle.abort();
}
