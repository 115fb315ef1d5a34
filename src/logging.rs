// src/logging.rs
use crate::config::Config;

/// Default filter when RUST_LOG is unset
pub fn default_filter() -> &'static str {
    if cfg!(debug_assertions) {
        "debug,clearview=trace,reqwest=info,hyper=info,hyper_util=info,tower_http=info"
    } else {
        "info,clearview=info,reqwest=warn,hyper=warn,hyper_util=warn,tower_http=warn"
    }
}

pub fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| default_filter().to_string());

    let env_filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&log_level))?;

    let fmt_layer = if std::env::var("LOG_FORMAT").as_deref() == Ok("json") {
        fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .with_target(true)
            .boxed()
    } else {
        fmt::layer()
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    tracing::info!("🧽 ClearView starting up...");
    tracing::info!("Version: {}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        "Build mode: {}",
        if cfg!(debug_assertions) { "development" } else { "production" }
    );
    tracing::info!("Log level: {}", log_level);

    Ok(())
}

/// Which pieces of configuration are present; never logs the key itself
pub fn log_configuration(config: &Config) {
    tracing::info!(
        "Configuration - API key: {}, base URL: {}, image model: {}, video model: {}, poll interval: {}s",
        if config.api_key.is_some() { "✅" } else { "❌ (select one in the page)" },
        config.base_url,
        config.image_model,
        config.video_model,
        config.poll_interval.as_secs()
    );
}
