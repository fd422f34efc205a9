use std::sync::RwLock;
use tracing::debug;

use crate::models::UsageStats;

/// AI 使用量追踪服务
///
/// 进程内累计 token 数与成功调用次数,并按固定单价把 token 推导为
/// 估算成本。`estimated_cost` 只在这里派生,成本护栏只读取快照
pub struct UsageTracker {
    totals: RwLock<Totals>,
    cost_per_1k_tokens: f64,
}

#[derive(Debug, Default, Clone, Copy)]
struct Totals {
    total_tokens: u64,
    request_count: u64,
}

impl UsageTracker {
    /// 创建使用量追踪服务
    pub fn new(cost_per_1k_tokens: f64) -> Self {
        Self {
            totals: RwLock::new(Totals::default()),
            cost_per_1k_tokens,
        }
    }

    /// 记录一次成功 AI 调用的用量
    pub fn record(&self, input_tokens: u32, output_tokens: u32) {
        let consumed = u64::from(input_tokens) + u64::from(output_tokens);

        let mut totals = self.totals.write().unwrap_or_else(|e| e.into_inner());
        totals.total_tokens += consumed;
        totals.request_count += 1;

        debug!(
            "📊 Usage recorded: +{} tokens ({} calls, {} tokens total)",
            consumed, totals.request_count, totals.total_tokens
        );
    }

    /// 当前累计用量快照
    pub fn stats(&self) -> UsageStats {
        let totals = *self.totals.read().unwrap_or_else(|e| e.into_inner());

        UsageStats {
            total_tokens: totals.total_tokens,
            request_count: totals.request_count,
            estimated_cost: self.estimate_cost(totals.total_tokens),
        }
    }

    fn estimate_cost(&self, total_tokens: u64) -> f64 {
        total_tokens as f64 / 1000.0 * self.cost_per_1k_tokens
    }
}
