use crate::models::UsageStats;

/// 预算检查结果
#[derive(Debug, Clone, Copy)]
pub struct BudgetStatus {
    /// 是否仍在预算内
    pub within_budget: bool,
    /// 剩余预算(美元),下限为 0
    pub remaining_budget: f64,
}

/// 成本护栏
///
/// 将累计估算成本与月度预算上限比较,达到或超过即否决新的付费调用。
/// 纯比较,不持有也不修改任何用量数据;用量的权威来源是使用量追踪服务
pub struct CostGuard {
    max_cost: f64,
}

impl CostGuard {
    /// 创建成本护栏
    ///
    /// `max_cost` 必须为正,由配置校验保证
    pub fn new(max_cost: f64) -> Self {
        Self { max_cost }
    }

    /// 检查当前用量是否仍在预算内
    ///
    /// 严格小于:恰好把用量推到上限的那次调用是最后一次放行,
    /// 之后的调用全部否决
    pub fn check(&self, usage: &UsageStats) -> BudgetStatus {
        BudgetStatus {
            within_budget: usage.estimated_cost < self.max_cost,
            remaining_budget: (self.max_cost - usage.estimated_cost).max(0.0),
        }
    }

    /// 配置的预算上限(美元)
    pub fn max_cost(&self) -> f64 {
        self.max_cost
    }
}
