// 增强 API 路由
//
// 实现 AI 增强的准入管道,包括:
// - POST /enhance - 生成增强内容 (限流 + 预算检查 + AI 调用 + 用量记账)
// - GET /enhance - 准入状态查询 (消耗一次限流槽位)
//
// 注意:这些路由会被 nest 到 /api 前缀下,形成最终路径:
// - /api/enhance

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::middleware::client_key::{resolve_client_key, ClientKeyExtractor};
use crate::models::{EnhanceRequest, EnhanceResponse, UsageStats};
use crate::services::{
    CostGuard, DefaultEnhancementService, EnhancementProvider, RateLimitResult, RateLimiterService,
    UsageTracker,
};
use crate::utils::error::{AppError, Result};

/// 标题长度上限(字符)
const MAX_TITLE_CHARS: usize = 256;
/// 描述长度上限(字符)
const MAX_DESCRIPTION_CHARS: usize = 4000;

/// 增强路由器状态
#[derive(Clone)]
pub struct EnhanceState {
    pub rate_limiter: Arc<RateLimiterService>,
    pub cost_guard: Arc<CostGuard>,
    pub usage_tracker: Arc<UsageTracker>,
    pub provider: Arc<dyn EnhancementProvider>,
    pub defaults: Arc<DefaultEnhancementService>,
}

/// 创建增强路由
pub fn create_enhance_router(state: EnhanceState) -> Router {
    Router::new()
        .route(
            "/enhance",
            post(handle_enhance).get(handle_enhance_status),
        )
        // 解析客户端限流键
        .layer(middleware::from_fn(resolve_client_key))
        .with_state(state)
}

/// 准入状态响应体
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusResponse {
    rate_limit: RateLimitSnapshot,
    budget: BudgetSnapshot,
    usage: UsageStats,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RateLimitSnapshot {
    limit: u32,
    remaining: u32,
    reset_at: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BudgetSnapshot {
    max_cost: f64,
    remaining_budget: f64,
    within_budget: bool,
}

/// POST /api/enhance - 生成增强内容
///
/// 准入管道短路求值:限流在前,预算其次,都放行才调用 AI。
/// 被任一关卡拒绝的请求不会触达上游,也不产生费用
async fn handle_enhance(
    State(state): State<EnhanceState>,
    ClientKeyExtractor(client_key): ClientKeyExtractor,
    payload: std::result::Result<Json<EnhanceRequest>, JsonRejection>,
) -> Result<Response> {
    let request_id = Uuid::new_v4();

    // 1. 解析并校验请求体
    let Json(request) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;
    validate_enhance_request(&request)?;

    info!(
        "📨 [{}] Enhance request from {}: type={} title_len={}",
        request_id,
        client_key.as_str(),
        request.request_type.as_str(),
        request.title.chars().count()
    );

    // 2. AI 上游未配置时直接返回预置内容,不占限流槽位也不检查预算
    if !state.provider.is_configured() {
        info!(
            "🔁 [{}] AI provider not configured, serving default enhancements",
            request_id
        );
        let response = EnhanceResponse {
            enhancements: state.defaults.lookup(request.request_type),
            usage: state.usage_tracker.stats(),
        };
        return Ok((StatusCode::OK, Json(response)).into_response());
    }

    // 3. 限流关卡(无论放行与否,本次尝试都已记账)
    let rate = state.rate_limiter.check(client_key.as_str());
    if !rate.allowed {
        warn!(
            "🚦 [{}] Rate limit exceeded for {}, window resets at {}",
            request_id,
            client_key.as_str(),
            rate.reset_at
        );
        return Err(AppError::RateLimitExceeded {
            limit: state.rate_limiter.limit(),
            remaining: rate.remaining,
            reset_at: rate.reset_at,
        });
    }

    // 过了限流关卡的响应一律携带窗口状态 headers
    let headers = rate_limit_headers(state.rate_limiter.limit(), &rate);

    // 4. 预算关卡
    let usage = state.usage_tracker.stats();
    let budget = state.cost_guard.check(&usage);
    if !budget.within_budget {
        warn!(
            "💰 [{}] Budget exhausted: estimated cost ${:.4} >= ceiling ${:.2}",
            request_id,
            usage.estimated_cost,
            state.cost_guard.max_cost()
        );
        let error = AppError::BudgetExceeded {
            max_cost: state.cost_guard.max_cost(),
            usage,
        };
        let mut response = error.into_response();
        response.headers_mut().extend(headers);
        return Ok(response);
    }

    // 5. 调用 AI 上游(失败时已消耗的限流槽位不退还)
    let result = match state.provider.enhance(&request).await {
        Ok(result) => result,
        Err(e) => {
            warn!("❌ [{}] Enhancement failed: {}", request_id, e);
            let mut response = e.into_response();
            response.headers_mut().extend(headers);
            return Ok(response);
        }
    };

    // 6. 记账本次用量
    state
        .usage_tracker
        .record(result.input_tokens, result.output_tokens);

    info!(
        "✅ [{}] Enhanced: tokens={} remaining_quota={}",
        request_id,
        result.total_tokens(),
        rate.remaining
    );

    // 7. 返回响应
    let response_body = EnhanceResponse {
        enhancements: result.enhancements,
        usage: state.usage_tracker.stats(),
    };
    let mut response = (StatusCode::OK, Json(response_body)).into_response();
    response.headers_mut().extend(headers);
    Ok(response)
}

/// GET /api/enhance - 准入状态查询
///
/// 与 POST 共享同一个限流键空间,查询本身消耗一次槽位。
/// 预算只读取不拦截,超限的预算在响应体里体现
async fn handle_enhance_status(
    State(state): State<EnhanceState>,
    ClientKeyExtractor(client_key): ClientKeyExtractor,
) -> Result<Response> {
    let rate = state.rate_limiter.check(client_key.as_str());
    if !rate.allowed {
        return Err(AppError::RateLimitExceeded {
            limit: state.rate_limiter.limit(),
            remaining: rate.remaining,
            reset_at: rate.reset_at,
        });
    }

    let usage = state.usage_tracker.stats();
    let budget = state.cost_guard.check(&usage);

    let body = StatusResponse {
        rate_limit: RateLimitSnapshot {
            limit: state.rate_limiter.limit(),
            remaining: rate.remaining,
            reset_at: rate.reset_at,
        },
        budget: BudgetSnapshot {
            max_cost: state.cost_guard.max_cost(),
            remaining_budget: budget.remaining_budget,
            within_budget: budget.within_budget,
        },
        usage,
    };

    let mut response = (StatusCode::OK, Json(body)).into_response();
    response
        .headers_mut()
        .extend(rate_limit_headers(state.rate_limiter.limit(), &rate));
    Ok(response)
}

// ============================================================================
// 辅助函数
// ============================================================================

/// 构造限流响应 headers
fn rate_limit_headers(limit: u32, rate: &RateLimitResult) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert("x-ratelimit-limit", HeaderValue::from(limit));
    headers.insert("x-ratelimit-remaining", HeaderValue::from(rate.remaining));
    headers.insert("x-ratelimit-reset", HeaderValue::from(rate.reset_at));
    headers
}

/// 校验增强请求体
fn validate_enhance_request(request: &EnhanceRequest) -> Result<()> {
    if request.title.trim().is_empty() {
        return Err(AppError::ValidationError("title 不能为空".to_string()));
    }

    if request.description.trim().is_empty() {
        return Err(AppError::ValidationError(
            "description 不能为空".to_string(),
        ));
    }

    if request.title.chars().count() > MAX_TITLE_CHARS {
        return Err(AppError::ValidationError(format!(
            "title 不能超过 {} 个字符",
            MAX_TITLE_CHARS
        )));
    }

    if request.description.chars().count() > MAX_DESCRIPTION_CHARS {
        return Err(AppError::ValidationError(format!(
            "description 不能超过 {} 个字符",
            MAX_DESCRIPTION_CHARS
        )));
    }

    Ok(())
}

// ============================================================================
// 单元测试
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RequestType;

    fn request(title: &str, description: &str) -> EnhanceRequest {
        EnhanceRequest {
            title: title.to_string(),
            description: description.to_string(),
            request_type: RequestType::Feature,
        }
    }

    #[test]
    fn test_validate_accepts_normal_request() {
        let valid = request("Dark mode", "Add a dark theme toggle to settings");
        assert!(validate_enhance_request(&valid).is_ok());
    }

    #[test]
    fn test_validate_rejects_blank_title() {
        let invalid = request("   ", "Add a dark theme toggle to settings");
        assert!(validate_enhance_request(&invalid).is_err());
    }

    #[test]
    fn test_validate_rejects_blank_description() {
        let invalid = request("Dark mode", "");
        assert!(validate_enhance_request(&invalid).is_err());
    }

    #[test]
    fn test_validate_rejects_oversized_title() {
        let invalid = request(&"x".repeat(MAX_TITLE_CHARS + 1), "desc");
        assert!(validate_enhance_request(&invalid).is_err());
    }

    #[test]
    fn test_validate_rejects_oversized_description() {
        let invalid = request("Dark mode", &"x".repeat(MAX_DESCRIPTION_CHARS + 1));
        assert!(validate_enhance_request(&invalid).is_err());
    }

    #[test]
    fn test_rate_limit_headers_echo_window_state() {
        let rate = RateLimitResult {
            allowed: true,
            remaining: 7,
            reset_at: 1_700_000_123_456,
        };
        let headers = rate_limit_headers(20, &rate);
        assert_eq!(headers.get("x-ratelimit-limit").unwrap(), &HeaderValue::from(20u32));
        assert_eq!(
            headers.get("x-ratelimit-remaining").unwrap(),
            &HeaderValue::from(7u32)
        );
        assert_eq!(
            headers.get("x-ratelimit-reset").unwrap(),
            &HeaderValue::from(1_700_000_123_456i64)
        );
    }
}
