use reqwest::Client;
use std::time::Duration;

use crate::config::Settings;
use crate::utils::{AppError, Result};

/// HTTP client wrapper for outbound AI calls
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Create a new HTTP client with timeouts from settings
    pub fn new(settings: &Settings) -> Result<Self> {
        let timeout = Duration::from_millis(settings.server.request_timeout);

        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(10)
            .build()
            .map_err(|e| AppError::InternalError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    /// Get the underlying reqwest client
    pub fn client(&self) -> &Client {
        &self.client
    }
}
