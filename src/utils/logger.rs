use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Settings;

/// Initialize the logging system
pub fn init_logger(settings: &Settings) -> anyhow::Result<()> {
    let log_level = &settings.logging.level;
    let log_format = &settings.logging.format;

    // Environment filter with fallback to the configured level
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_target(false).with_level(true))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    fmt::layer()
                        .with_target(false)
                        .with_level(true)
                        .with_ansi(true),
                )
                .init();
        }
    }

    Ok(())
}
