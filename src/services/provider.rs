use async_trait::async_trait;

use crate::models::{EnhanceRequest, EnhancementSet};
use crate::utils::error::Result;

/// 单次增强调用的结果
#[derive(Debug, Clone)]
pub struct ProviderResult {
    /// 生成的增强内容
    pub enhancements: EnhancementSet,
    /// 输入 tokens
    pub input_tokens: u32,
    /// 输出 tokens
    pub output_tokens: u32,
}

impl ProviderResult {
    /// 本次调用消耗的总 tokens
    pub fn total_tokens(&self) -> u32 {
        self.input_tokens + self.output_tokens
    }
}

/// AI 增强服务 Trait
///
/// 准入管道通过该接口调用上游模型;上游拒绝(凭证无效、服务不可用、
/// 输入不合法)时以类型化错误返回
#[async_trait]
pub trait EnhancementProvider: Send + Sync {
    /// 是否配置了可用的上游凭证
    fn is_configured(&self) -> bool;

    /// 为一条产品请求生成增强内容
    async fn enhance(&self, request: &EnhanceRequest) -> Result<ProviderResult>;
}
