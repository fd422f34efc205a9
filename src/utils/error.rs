use axum::{
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;

use crate::models::UsageStats;

/// Application error type
#[derive(Debug)]
pub enum AppError {
    // Configuration errors
    ConfigError(String),
    ValidationError(String),

    // Request errors
    BadRequest(String),

    // Admission control errors
    RateLimitExceeded {
        limit: u32,
        remaining: u32,
        reset_at: i64,
    },
    BudgetExceeded {
        max_cost: f64,
        usage: UsageStats,
    },

    // External service errors
    UpstreamError(String),

    // Internal errors
    InternalError(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
            Self::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            Self::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            Self::RateLimitExceeded { reset_at, .. } => {
                write!(f, "Rate limit exceeded: retry after {}", reset_at)
            }
            Self::BudgetExceeded { max_cost, .. } => {
                write!(
                    f,
                    "Budget exceeded: monthly cost ceiling of ${:.2} reached",
                    max_cost
                )
            }
            Self::UpstreamError(msg) => write!(f, "Upstream error: {}", msg),
            Self::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            Self::RateLimitExceeded {
                limit,
                remaining,
                reset_at,
            } => {
                let status = StatusCode::TOO_MANY_REQUESTS;
                let body = Json(json!({
                    "error": {
                        "message": format!("Rate limit exceeded, retry after {}", reset_at),
                        "type": "rate_limit_exceeded",
                        "status": status.as_u16(),
                    },
                    "resetAt": reset_at,
                }));

                let mut response = (status, body).into_response();
                let headers = response.headers_mut();
                headers.insert("x-ratelimit-limit", HeaderValue::from(limit));
                headers.insert("x-ratelimit-remaining", HeaderValue::from(remaining));
                headers.insert("x-ratelimit-reset", HeaderValue::from(reset_at));
                response
            }
            Self::BudgetExceeded { max_cost, usage } => {
                let status = StatusCode::TOO_MANY_REQUESTS;
                let body = Json(json!({
                    "error": {
                        "message": format!(
                            "Monthly AI budget of ${:.2} reached, enhancement is paused",
                            max_cost
                        ),
                        "type": "budget_exceeded",
                        "status": status.as_u16(),
                    },
                    "usage": usage,
                }));

                (status, body).into_response()
            }
            other => {
                let (status, error_message, error_type) = match &other {
                    Self::ConfigError(msg) => (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        msg.clone(),
                        "config_error",
                    ),
                    Self::ValidationError(msg) => {
                        (StatusCode::BAD_REQUEST, msg.clone(), "validation_error")
                    }
                    Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone(), "bad_request"),
                    Self::UpstreamError(msg) => (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        msg.clone(),
                        "upstream_error",
                    ),
                    Self::InternalError(msg) => (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        msg.clone(),
                        "internal_error",
                    ),
                    // Handled in the outer match
                    Self::RateLimitExceeded { .. } | Self::BudgetExceeded { .. } => unreachable!(),
                };

                let body = Json(json!({
                    "error": {
                        "message": error_message,
                        "type": error_type,
                        "status": status.as_u16(),
                    }
                }));

                (status, body).into_response()
            }
        }
    }
}

// Conversion implementations for common error types
impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::ConfigError(err.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        Self::UpstreamError(err.to_string())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::InternalError(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::InternalError(format!("JSON serialization error: {}", err))
    }
}

/// Result type alias for application errors
pub type Result<T> = std::result::Result<T, AppError>;
