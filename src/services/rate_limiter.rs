use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::store::RateLimitStore;

/// 单次限流检查结果(瞬态,不落存储)
#[derive(Debug, Clone, Copy)]
pub struct RateLimitResult {
    /// 本次尝试是否放行
    pub allowed: bool,
    /// 当前窗口剩余可用次数
    pub remaining: u32,
    /// 当前窗口结束时间(epoch 毫秒)
    pub reset_at: i64,
}

/// 请求速率限制服务
///
/// 固定窗口计数:每个 client key 在一个窗口内最多 `limit` 次尝试。
/// 被拒绝的尝试同样占用槽位,超限的客户端无法零成本探测。
/// 过期窗口由 `check` 惰性重置,后台清扫只负责回收内存
pub struct RateLimiterService {
    store: Arc<dyn RateLimitStore>,
    limit: u32,
    window_ms: i64,
}

impl RateLimiterService {
    /// 创建限流服务
    ///
    /// `limit` 与 `window_ms` 必须为正,由配置校验保证
    pub fn new(store: Arc<dyn RateLimitStore>, limit: u32, window_ms: i64) -> Self {
        Self {
            store,
            limit,
            window_ms,
        }
    }

    /// 检查并记账一次尝试
    pub fn check(&self, client_key: &str) -> RateLimitResult {
        self.check_at(client_key, Utc::now().timestamp_millis())
    }

    /// 以调用方提供的时间戳检查并记账一次尝试
    pub fn check_at(&self, client_key: &str, now_ms: i64) -> RateLimitResult {
        let entry = self.store.increment(client_key, self.window_ms, now_ms);
        let allowed = entry.count <= self.limit;
        let remaining = self.limit.saturating_sub(entry.count);

        debug!(
            "🚦 Rate check for {}: count={} allowed={} remaining={}",
            client_key, entry.count, allowed, remaining
        );

        RateLimitResult {
            allowed,
            remaining,
            reset_at: entry.window_reset_at,
        }
    }

    /// 配置的窗口配额
    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// 清除所有已过期的窗口,返回清除数量
    pub fn sweep(&self) -> usize {
        self.store.sweep_expired(Utc::now().timestamp_millis())
    }

    /// 当前跟踪的 client key 数量
    pub fn tracked_keys(&self) -> usize {
        self.store.len()
    }

    /// 启动后台清扫任务
    ///
    /// 与请求处理解耦,按固定间隔回收过期窗口占用的内存
    pub fn spawn_sweeper(self: &Arc<Self>, every: Duration) -> tokio::task::JoinHandle<()> {
        let limiter = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            // interval 的首个 tick 立即完成,先消费掉
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let removed = limiter.sweep();
                if removed > 0 {
                    debug!("🧹 Swept {} expired rate limit window(s)", removed);
                }
            }
        })
    }
}
