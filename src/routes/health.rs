use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::services::RateLimiterService;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub rate_limiter: Arc<RateLimiterService>,
    pub ai_configured: bool,
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub components: HealthComponents,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthComponents {
    pub rate_limit_store: ComponentStatus,
    pub ai_provider: ComponentStatus,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ComponentStatus {
    pub status: String,
    pub message: Option<String>,
}

/// Health check handler
pub async fn health_check(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<HealthResponse>) {
    let store_status = ComponentStatus {
        status: "healthy".to_string(),
        message: Some(format!(
            "{} client windows tracked",
            state.rate_limiter.tracked_keys()
        )),
    };

    let ai_status = if state.ai_configured {
        ComponentStatus {
            status: "configured".to_string(),
            message: None,
        }
    } else {
        ComponentStatus {
            status: "fallback".to_string(),
            message: Some("AI provider not configured, serving default enhancements".to_string()),
        }
    };

    let response = HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        components: HealthComponents {
            rate_limit_store: store_status,
            ai_provider: ai_status,
        },
    };

    (StatusCode::OK, Json(response))
}

/// Simple ping handler
pub async fn ping() -> &'static str {
    "pong"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_response_serialization() {
        let response = HealthResponse {
            status: "healthy".to_string(),
            version: "1.0.0".to_string(),
            components: HealthComponents {
                rate_limit_store: ComponentStatus {
                    status: "healthy".to_string(),
                    message: Some("0 client windows tracked".to_string()),
                },
                ai_provider: ComponentStatus {
                    status: "fallback".to_string(),
                    message: None,
                },
            },
        };

        let json = serde_json::to_string(&response).expect("Failed to serialize");
        assert!(json.contains("healthy"));
        assert!(json.contains("1.0.0"));
        assert!(json.contains("fallback"));
    }
}
