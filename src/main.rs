use std::sync::Arc;

use clearview::{build_router, logging, AppState, Config};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    if let Err(e) = logging::init_logging() {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("❌ {}", e);
            std::process::exit(1);
        }
    };
    logging::log_configuration(&config);

    let state = match AppState::from_config(config) {
        Ok(state) => Arc::new(state),
        Err(e) => {
            tracing::error!("❌ Failed to initialize: {}", e);
            std::process::exit(1);
        }
    };

    let app = build_router(state.clone());

    let listener = match tokio::net::TcpListener::bind(&state.config.bind_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("❌ Failed to bind {}: {}", state.config.bind_addr, e);
            std::process::exit(1);
        }
    };
    match listener.local_addr() {
        Ok(addr) => tracing::info!("listening on http://{}", addr),
        Err(_) => tracing::info!("listening on {}", state.config.bind_addr),
    }

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
