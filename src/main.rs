use anyhow::Result;
use axum::{routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use pmai_gateway::routes::{create_enhance_router, health_check, ping, AppState, EnhanceState};
use pmai_gateway::services::{
    AiEnhancementConfig, AiEnhancementService, CostGuard, DefaultEnhancementService,
    EnhancementProvider, RateLimiterService, UsageTracker,
};
use pmai_gateway::store::RateLimitStore;
use pmai_gateway::utils::{init_logger, HttpClient};
use pmai_gateway::{MemoryStore, Settings};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present, otherwise rely on environment variables
    dotenvy::dotenv().ok();

    // Load configuration first (needed for logger initialization)
    let settings = Settings::new()?;

    // Initialize logging system
    init_logger(&settings)?;

    info!("🚀 PMAI Gateway starting...");
    info!("📋 Configuration loaded");

    // Validate configuration
    if let Err(e) = settings.validate() {
        error!("❌ Configuration validation failed: {}", e);
        return Err(anyhow::anyhow!("Invalid configuration: {}", e));
    }
    info!("✅ Configuration validated");

    // Initialize rate-limit store and limiter
    let store: Arc<dyn RateLimitStore> = Arc::new(MemoryStore::new());
    let rate_limiter = Arc::new(RateLimiterService::new(
        store,
        settings.rate_limit.requests_per_window,
        settings.rate_limit.window_ms,
    ));
    info!(
        "🚦 Rate limiter initialized: {} requests per {}ms window",
        settings.rate_limit.requests_per_window, settings.rate_limit.window_ms
    );

    // Start the background sweeper that reclaims expired windows
    let _sweeper = rate_limiter.spawn_sweeper(Duration::from_secs(
        settings.rate_limit.sweep_interval_secs,
    ));
    info!(
        "🧹 Window sweeper running every {}s",
        settings.rate_limit.sweep_interval_secs
    );

    // Initialize cost guard and usage tracker
    let cost_guard = Arc::new(CostGuard::new(settings.budget.max_monthly_cost_usd));
    let usage_tracker = Arc::new(UsageTracker::new(settings.ai.cost_per_1k_tokens_usd));
    info!(
        "💰 Cost guard initialized: ${:.2} monthly ceiling",
        settings.budget.max_monthly_cost_usd
    );

    // Initialize HTTP client
    let http_client = HttpClient::new(&settings)?;
    info!("🌐 HTTP client initialized");

    // Get the underlying reqwest Client for the AI enhancement service
    let reqwest_client = Arc::new(http_client.client().clone());

    let ai_service = Arc::new(AiEnhancementService::new(
        AiEnhancementConfig::from_settings(&settings),
        reqwest_client,
    ));
    let provider: Arc<dyn EnhancementProvider> = ai_service;
    let ai_configured = provider.is_configured();
    if ai_configured {
        info!("🤖 AI enhancement service initialized");
    } else {
        warn!("⚠️  AI provider not configured, serving default enhancements");
    }

    let defaults = Arc::new(DefaultEnhancementService::new());

    // Create shared application states
    let health_state = Arc::new(AppState {
        rate_limiter: rate_limiter.clone(),
        ai_configured,
    });

    let enhance_state = EnhanceState {
        rate_limiter,
        cost_guard,
        usage_tracker,
        provider,
        defaults,
    };

    // Build router
    let app = Router::new()
        .route("/health", get(health_check))
        .route("/ping", get(ping))
        .with_state(health_state)
        .nest("/api", create_enhance_router(enhance_state))
        .layer(TraceLayer::new_for_http());

    // Get bind address
    let bind_addr = settings.bind_address();

    // Start server
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", bind_addr, e))?;

    info!("🚀 Server ready on http://{}", bind_addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    info!("👋 Shutting down...");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Signal received, starting graceful shutdown");
}
