pub mod enhance;
pub mod health;

pub use enhance::{create_enhance_router, EnhanceState};
pub use health::{health_check, ping, AppState};
