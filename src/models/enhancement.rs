use serde::{Deserialize, Serialize};

use crate::models::UsageStats;

/// 产品请求类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestType {
    #[default]
    Feature,
    Bug,
    Improvement,
}

impl RequestType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Feature => "feature",
            Self::Bug => "bug",
            Self::Improvement => "improvement",
        }
    }
}

/// 增强请求体
///
/// 客户端提交的自由格式产品请求,增强服务据此生成结构化建议
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnhanceRequest {
    /// 请求标题
    pub title: String,
    /// 请求描述
    pub description: String,
    /// 请求类型,缺省为 feature
    #[serde(default)]
    pub request_type: RequestType,
}

/// 增强结果集
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnhancementSet {
    /// 验收标准
    #[serde(default)]
    pub acceptance_criteria: Vec<String>,
    /// 边界情况
    #[serde(default)]
    pub edge_cases: Vec<String>,
    /// 建议标签
    #[serde(default)]
    pub suggested_labels: Vec<String>,
}

/// 增强响应体
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnhanceResponse {
    pub enhancements: EnhancementSet,
    pub usage: UsageStats,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_type_defaults_to_feature() {
        let json = r#"{"title": "Dark mode", "description": "Add a dark theme"}"#;
        let request: EnhanceRequest = serde_json::from_str(json).expect("Failed to deserialize");
        assert_eq!(request.request_type, RequestType::Feature);
    }

    #[test]
    fn test_request_type_parses_lowercase() {
        let json = r#"{"title": "Crash", "description": "App crashes", "requestType": "bug"}"#;
        let request: EnhanceRequest = serde_json::from_str(json).expect("Failed to deserialize");
        assert_eq!(request.request_type, RequestType::Bug);
        assert_eq!(request.request_type.as_str(), "bug");
    }

    #[test]
    fn test_enhancement_set_tolerates_missing_fields() {
        let json = r#"{"acceptanceCriteria": ["works offline"]}"#;
        let set: EnhancementSet = serde_json::from_str(json).expect("Failed to deserialize");
        assert_eq!(set.acceptance_criteria.len(), 1);
        assert!(set.edge_cases.is_empty());
        assert!(set.suggested_labels.is_empty());
    }
}
