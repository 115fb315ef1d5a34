// lib.rs - ClearView: watermark removal and reference-frame video generation
pub mod capability;
pub mod config;
pub mod credentials;
pub mod error;
pub mod gemini_client;
pub mod handlers;
pub mod logging;
pub mod media;
pub mod middleware;
pub mod models;
pub mod workflow;

use std::sync::Arc;

use axum::{Extension, Router};
use tower_http::cors::CorsLayer;

pub use capability::{CapabilityClient, ClientSettings};
pub use config::Config;
pub use credentials::{CredentialProvider, SessionCredentials, StaticCredentials};
pub use error::{AppError, Result};
pub use gemini_client::{GenerativeBackend, HttpBackend};
pub use media::{EncodedMedia, MediaHandle, MediaStore};
pub use workflow::{Mode, ProcessingStatus, ResultKind, Session, Workflow};

/// Everything the HTTP handlers share: one session per process
pub struct AppState {
    pub config: Config,
    pub workflow: Workflow,
    pub credentials: Arc<SessionCredentials>,
    pub store: MediaStore,
}

impl AppState {
    /// Wire the real HTTP backend, session credentials and media store
    pub fn from_config(config: Config) -> Result<Self> {
        let backend: Arc<dyn GenerativeBackend> = Arc::new(HttpBackend::new(&config)?);
        Ok(Self::with_backend(config, backend))
    }

    pub fn with_backend(config: Config, backend: Arc<dyn GenerativeBackend>) -> Self {
        let credentials = Arc::new(SessionCredentials::new(config.api_key.clone()));
        let store = MediaStore::new();
        let client = CapabilityClient::new(
            backend,
            credentials.clone(),
            store.clone(),
            ClientSettings::from_config(&config),
        );

        Self {
            workflow: Workflow::new(client),
            credentials,
            store,
            config,
        }
    }
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(handlers::ui::ui_routes())
        .merge(handlers::session::session_routes(state.config.max_upload_bytes))
        .merge(handlers::media::media_routes())
        .layer(axum::middleware::from_fn(middleware::logging::request_logging_middleware))
        .layer(CorsLayer::permissive())
        .layer(Extension(state))
}
