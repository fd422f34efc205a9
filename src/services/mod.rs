pub mod cost_guard;
pub mod default_enhancements;
pub mod enhancement;
pub mod provider;
pub mod rate_limiter;
pub mod usage_tracker;

pub use cost_guard::{BudgetStatus, CostGuard};
pub use default_enhancements::DefaultEnhancementService;
pub use enhancement::{AiEnhancementConfig, AiEnhancementService};
pub use provider::{EnhancementProvider, ProviderResult};
pub use rate_limiter::{RateLimitResult, RateLimiterService};
pub use usage_tracker::UsageTracker;
