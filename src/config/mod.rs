use config::{Config, ConfigError, File};
use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub rate_limit: RateLimitSettings,
    pub budget: BudgetSettings,
    pub ai: AiSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub request_timeout: u64, // milliseconds
}

#[derive(Debug, Deserialize, Clone)]
pub struct RateLimitSettings {
    pub requests_per_window: u32,
    pub window_ms: i64,
    pub sweep_interval_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BudgetSettings {
    pub max_monthly_cost_usd: f64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AiSettings {
    pub api_url: String,
    pub api_key: String,
    pub api_version: String,
    pub model: String,
    pub max_tokens: u32,
    pub timeout_ms: u64,
    pub cost_per_1k_tokens_usd: f64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingSettings {
    pub level: String,
    pub format: String, // "json" or "pretty"
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let mut builder = Config::builder()
            // Start with default values
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default("server.request_timeout", 30000)?
            .set_default("rate_limit.requests_per_window", 20)?
            .set_default("rate_limit.window_ms", 3_600_000)? // 1 hour
            .set_default("rate_limit.sweep_interval_secs", 300)?
            .set_default("budget.max_monthly_cost_usd", 10.0)?
            .set_default("ai.api_url", "https://api.anthropic.com")?
            .set_default("ai.api_key", "")?
            .set_default("ai.api_version", "2023-06-01")?
            .set_default("ai.model", "claude-3-5-haiku-20241022")?
            .set_default("ai.max_tokens", 1024)?
            .set_default("ai.timeout_ms", 30000)?
            .set_default("ai.cost_per_1k_tokens_usd", 0.003)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            // Load config file if exists
            .add_source(File::with_name("config/config").required(false))
            .add_source(File::with_name(&format!("config/config.{}", run_mode)).required(false));

        // Manually override with environment variables (workaround for case sensitivity issues)
        // Server settings
        if let Ok(val) = env::var("PMAI_SERVER__HOST") {
            builder = builder.set_override("server.host", val)?;
        }
        if let Ok(val) = env::var("PMAI_SERVER__PORT") {
            builder = builder.set_override("server.port", val)?;
        }
        if let Ok(val) = env::var("PMAI_SERVER__REQUEST_TIMEOUT") {
            builder = builder.set_override("server.request_timeout", val)?;
        }

        // Rate limit settings
        if let Ok(val) = env::var("PMAI_RATE_LIMIT__REQUESTS_PER_WINDOW") {
            builder = builder.set_override("rate_limit.requests_per_window", val)?;
        }
        if let Ok(val) = env::var("PMAI_RATE_LIMIT__WINDOW_MS") {
            builder = builder.set_override("rate_limit.window_ms", val)?;
        }
        if let Ok(val) = env::var("PMAI_RATE_LIMIT__SWEEP_INTERVAL_SECS") {
            builder = builder.set_override("rate_limit.sweep_interval_secs", val)?;
        }

        // Budget settings
        if let Ok(val) = env::var("PMAI_BUDGET__MAX_MONTHLY_COST_USD") {
            builder = builder.set_override("budget.max_monthly_cost_usd", val)?;
        }

        // AI settings
        if let Ok(val) = env::var("PMAI_AI__API_URL") {
            builder = builder.set_override("ai.api_url", val)?;
        }
        if let Ok(val) = env::var("PMAI_AI__API_KEY") {
            builder = builder.set_override("ai.api_key", val)?;
        }
        if let Ok(val) = env::var("PMAI_AI__API_VERSION") {
            builder = builder.set_override("ai.api_version", val)?;
        }
        if let Ok(val) = env::var("PMAI_AI__MODEL") {
            builder = builder.set_override("ai.model", val)?;
        }
        if let Ok(val) = env::var("PMAI_AI__MAX_TOKENS") {
            builder = builder.set_override("ai.max_tokens", val)?;
        }
        if let Ok(val) = env::var("PMAI_AI__TIMEOUT_MS") {
            builder = builder.set_override("ai.timeout_ms", val)?;
        }
        if let Ok(val) = env::var("PMAI_AI__COST_PER_1K_TOKENS_USD") {
            builder = builder.set_override("ai.cost_per_1k_tokens_usd", val)?;
        }

        // Logging settings
        if let Ok(val) = env::var("PMAI_LOGGING__LEVEL") {
            builder = builder.set_override("logging.level", val)?;
        }
        if let Ok(val) = env::var("PMAI_LOGGING__FORMAT") {
            builder = builder.set_override("logging.format", val)?;
        }

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Validate configuration
    ///
    /// The admission gates are only defined for positive bounds, so bad
    /// values are rejected here instead of producing an undefined policy.
    pub fn validate(&self) -> Result<(), String> {
        if self.rate_limit.requests_per_window == 0 {
            return Err("rate_limit.requests_per_window must be greater than 0".to_string());
        }

        if self.rate_limit.window_ms <= 0 {
            return Err("rate_limit.window_ms must be greater than 0".to_string());
        }

        if self.rate_limit.sweep_interval_secs == 0 {
            return Err("rate_limit.sweep_interval_secs must be greater than 0".to_string());
        }

        if !self.budget.max_monthly_cost_usd.is_finite() || self.budget.max_monthly_cost_usd <= 0.0
        {
            return Err("budget.max_monthly_cost_usd must be greater than 0".to_string());
        }

        if !self.ai.cost_per_1k_tokens_usd.is_finite() || self.ai.cost_per_1k_tokens_usd < 0.0 {
            return Err("ai.cost_per_1k_tokens_usd must not be negative".to_string());
        }

        if self.ai.max_tokens == 0 {
            return Err("ai.max_tokens must be greater than 0".to_string());
        }

        // Validate logging level
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(format!(
                "Invalid logging level '{}'. Must be one of: {}",
                self.logging.level,
                valid_levels.join(", ")
            ));
        }

        Ok(())
    }

    /// Get server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
