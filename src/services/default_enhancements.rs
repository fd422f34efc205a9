use once_cell::sync::Lazy;
use std::collections::HashMap;

use crate::models::{EnhancementSet, RequestType};

/// 各请求类型的预置增强内容
static DEFAULT_SETS: Lazy<HashMap<RequestType, EnhancementSet>> = Lazy::new(|| {
    let mut sets = HashMap::new();

    sets.insert(
        RequestType::Feature,
        EnhancementSet {
            acceptance_criteria: vec![
                "Feature is reachable from the main navigation".to_string(),
                "Feature works for both new and existing accounts".to_string(),
                "Feature state persists across sessions".to_string(),
            ],
            edge_cases: vec![
                "User has no prior data for this feature".to_string(),
                "Feature is used concurrently from two devices".to_string(),
            ],
            suggested_labels: vec!["feature".to_string(), "needs-triage".to_string()],
        },
    );

    sets.insert(
        RequestType::Bug,
        EnhancementSet {
            acceptance_criteria: vec![
                "Reported behavior can no longer be reproduced".to_string(),
                "A regression test covers the failing scenario".to_string(),
            ],
            edge_cases: vec![
                "Bug only occurs on first use".to_string(),
                "Bug only occurs under slow network conditions".to_string(),
            ],
            suggested_labels: vec!["bug".to_string(), "needs-repro".to_string()],
        },
    );

    sets.insert(
        RequestType::Improvement,
        EnhancementSet {
            acceptance_criteria: vec![
                "Existing behavior is preserved for current users".to_string(),
                "Improvement is measurable against the current baseline".to_string(),
            ],
            edge_cases: vec![
                "Users mid-flow when the improvement ships".to_string(),
                "Improvement interacts with customized settings".to_string(),
            ],
            suggested_labels: vec!["improvement".to_string(), "ux".to_string()],
        },
    );

    sets
});

/// 预置增强服务
///
/// AI 上游未配置时的降级路径:按请求类型返回固定的增强内容,
/// 不消耗 tokens,也不经过准入管道
#[derive(Debug, Default)]
pub struct DefaultEnhancementService;

impl DefaultEnhancementService {
    pub fn new() -> Self {
        Self
    }

    /// 返回该请求类型的预置增强内容
    pub fn lookup(&self, request_type: RequestType) -> EnhancementSet {
        DEFAULT_SETS
            .get(&request_type)
            .cloned()
            .unwrap_or_default()
    }
}
