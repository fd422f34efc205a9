use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::config::Settings;
use crate::models::{EnhanceRequest, EnhancementSet};
use crate::services::provider::{EnhancementProvider, ProviderResult};
use crate::utils::{AppError, Result};

/// Claude API 请求体(messages 补全)
#[derive(Debug, Clone, Serialize)]
struct CompletionRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<CompletionMessage>,
}

#[derive(Debug, Clone, Serialize)]
struct CompletionMessage {
    role: String,
    content: String,
}

/// Claude API 响应体
#[derive(Debug, Clone, Deserialize)]
struct CompletionResponse {
    content: Vec<ContentBlock>,
    usage: CompletionUsage,
}

#[derive(Debug, Clone, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    content_type: String,
    #[serde(default)]
    text: String,
}

#[derive(Debug, Clone, Deserialize)]
struct CompletionUsage {
    input_tokens: u32,
    output_tokens: u32,
}

/// AI 增强服务配置
#[derive(Debug, Clone)]
pub struct AiEnhancementConfig {
    pub api_url: String,
    pub api_version: String,
    pub api_key: String,
    pub model: String,
    pub max_tokens: u32,
    pub timeout_ms: u64,
}

impl Default for AiEnhancementConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.anthropic.com".to_string(),
            api_version: "2023-06-01".to_string(),
            api_key: String::new(),
            model: "claude-3-5-haiku-20241022".to_string(),
            max_tokens: 1024,
            timeout_ms: 30_000,
        }
    }
}

impl AiEnhancementConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            api_url: settings.ai.api_url.clone(),
            api_version: settings.ai.api_version.clone(),
            api_key: settings.ai.api_key.clone(),
            model: settings.ai.model.clone(),
            max_tokens: settings.ai.max_tokens,
            timeout_ms: settings.ai.timeout_ms,
        }
    }
}

/// AI 增强服务
///
/// 调用 Claude API,将自由格式的产品请求扩展为结构化的验收标准、
/// 边界情况和建议标签。模型被要求只输出 JSON,解析失败视为上游错误
pub struct AiEnhancementService {
    config: AiEnhancementConfig,
    http_client: Arc<Client>,
}

impl AiEnhancementService {
    /// 创建新的 AI 增强服务实例
    pub fn new(config: AiEnhancementConfig, http_client: Arc<Client>) -> Self {
        Self {
            config,
            http_client,
        }
    }

    fn system_prompt() -> String {
        "You are a product management assistant. Given a product request, \
         respond with ONLY a JSON object, no prose and no markdown fences, \
         with exactly these keys: \"acceptanceCriteria\" (array of strings), \
         \"edgeCases\" (array of strings), \"suggestedLabels\" (array of strings)."
            .to_string()
    }

    fn user_prompt(request: &EnhanceRequest) -> String {
        format!(
            "Request type: {}\nTitle: {}\nDescription: {}",
            request.request_type.as_str(),
            request.title,
            request.description
        )
    }

    /// 执行 Claude API HTTP 请求
    async fn make_completion_request(
        &self,
        request_body: &CompletionRequest,
    ) -> Result<CompletionResponse> {
        let url = format!("{}/v1/messages", self.config.api_url);

        let request_builder = self
            .http_client
            .post(&url)
            .header("Content-Type", "application/json")
            .header("anthropic-version", &self.config.api_version)
            .header("x-api-key", &self.config.api_key)
            .json(request_body);

        // 执行请求(带超时)
        let response = timeout(
            Duration::from_millis(self.config.timeout_ms),
            request_builder.send(),
        )
        .await
        .context("AI request timed out")?
        .map_err(|e| {
            warn!("HTTP request to AI provider failed: {:?}", e);
            AppError::UpstreamError(format!("Failed to reach AI provider: {}", e))
        })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .context("Failed to read AI provider response body")?;

        if !status.is_success() {
            let snippet: String = body.chars().take(500).collect();
            warn!("AI provider returned status {}: {}", status, snippet);
            return Err(AppError::UpstreamError(format!(
                "AI provider returned status {}",
                status.as_u16()
            )));
        }

        serde_json::from_str::<CompletionResponse>(&body).map_err(|e| {
            warn!("Failed to parse AI provider response: {}", e);
            AppError::UpstreamError(format!("Malformed AI provider response: {}", e))
        })
    }

    /// 解析模型输出的增强内容
    ///
    /// 模型偶尔会忽略指令,把 JSON 包在 markdown 代码块里,解析前先剥掉
    fn parse_enhancements(text: &str) -> Result<EnhancementSet> {
        let cleaned = Self::strip_code_fences(text);
        serde_json::from_str::<EnhancementSet>(cleaned).map_err(|e| {
            AppError::UpstreamError(format!("AI response was not valid enhancement JSON: {}", e))
        })
    }

    fn strip_code_fences(text: &str) -> &str {
        let trimmed = text.trim();
        let without_open = trimmed
            .strip_prefix("```json")
            .or_else(|| trimmed.strip_prefix("```"))
            .unwrap_or(trimmed);
        without_open
            .strip_suffix("```")
            .unwrap_or(without_open)
            .trim()
    }
}

#[async_trait]
impl EnhancementProvider for AiEnhancementService {
    fn is_configured(&self) -> bool {
        !self.config.api_key.trim().is_empty()
    }

    async fn enhance(&self, request: &EnhanceRequest) -> Result<ProviderResult> {
        if !self.is_configured() {
            return Err(AppError::ConfigError(
                "AI provider API key is not configured".to_string(),
            ));
        }

        let completion_request = CompletionRequest {
            model: self.config.model.clone(),
            max_tokens: self.config.max_tokens,
            system: Some(Self::system_prompt()),
            messages: vec![CompletionMessage {
                role: "user".to_string(),
                content: Self::user_prompt(request),
            }],
        };

        info!(
            "📤 Requesting enhancement from model {} for request type {}",
            self.config.model,
            request.request_type.as_str()
        );

        let completion = self.make_completion_request(&completion_request).await?;

        // 拼接所有文本块(正常情况只有一个)
        let text: String = completion
            .content
            .iter()
            .filter(|block| block.content_type == "text")
            .map(|block| block.text.as_str())
            .collect();

        if text.is_empty() {
            return Err(AppError::UpstreamError(
                "AI provider returned no text content".to_string(),
            ));
        }

        let enhancements = Self::parse_enhancements(&text)?;

        debug!(
            "AI enhancement complete: input_tokens={}, output_tokens={}",
            completion.usage.input_tokens, completion.usage.output_tokens
        );

        Ok(ProviderResult {
            enhancements,
            input_tokens: completion.usage.input_tokens,
            output_tokens: completion.usage.output_tokens,
        })
    }
}
