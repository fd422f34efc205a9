pub mod config;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod store;
pub mod utils;

pub use config::Settings;
pub use store::MemoryStore;
