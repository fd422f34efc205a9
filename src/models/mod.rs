pub mod enhancement;
pub mod usage;

pub use enhancement::{EnhanceRequest, EnhanceResponse, EnhancementSet, RequestType};
pub use usage::UsageStats;
