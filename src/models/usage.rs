use serde::{Deserialize, Serialize};

/// AI 调用累计使用统计
///
/// 由使用量追踪服务独占更新;预算闸门只读比较,从不修改。
/// `estimated_cost` 始终由 `total_tokens` 按固定单价推导
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageStats {
    /// 累计 token 数
    pub total_tokens: u64,
    /// 累计成功调用次数
    pub request_count: u64,
    /// 估算累计成本(美元)
    pub estimated_cost: f64,
}
