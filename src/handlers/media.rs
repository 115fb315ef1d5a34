// src/handlers/media.rs
//! Serving preview/result blobs and the processed-artifact download

use axum::{
    extract::{Extension, Path},
    http::{header, StatusCode},
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::credentials::CredentialProvider;
use crate::workflow::download_file_name;
use crate::AppState;

pub fn media_routes() -> Router {
    Router::new()
        .route("/media/:media_id", get(get_media))
        .route("/api/download", get(download_result))
        .route("/api/status", get(api_status))
}

/// GET /media/:media_id - bytes of a live handle; 404 once released
pub async fn get_media(
    Path(media_id): Path<Uuid>,
    Extension(state): Extension<Arc<AppState>>,
) -> impl IntoResponse {
    match state.store.get(&media_id) {
        Some((bytes, mime_type)) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, mime_type),
                (header::CACHE_CONTROL, "no-store".to_string()),
            ],
            bytes.to_vec(),
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "Media not found").into_response(),
    }
}

/// GET /api/download - the processed artifact, named by kind
pub async fn download_result(Extension(state): Extension<Arc<AppState>>) -> impl IntoResponse {
    let session = state.workflow.session().lock().await;
    let Some(result) = session.result() else {
        return (StatusCode::NOT_FOUND, "No processed result available").into_response();
    };
    let Some(processed) = result.processed.as_ref() else {
        return (StatusCode::NOT_FOUND, "No processed result available").into_response();
    };

    let file_name = download_file_name(result.kind);
    tracing::info!("⬇️ Download requested: {} ({} bytes)", file_name, processed.bytes().len());
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, processed.mime_type().to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file_name),
            ),
        ],
        processed.bytes().to_vec(),
    )
        .into_response()
}

/// GET /api/status
pub async fn api_status(Extension(state): Extension<Arc<AppState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "clearview",
        "version": env!("CARGO_PKG_VERSION"),
        "credential_configured": state.credentials.api_key().is_some(),
        "image_model": state.config.image_model,
        "video_model": state.config.video_model,
        "live_media": state.store.live_count(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::tests::{finished, FakeBackend};
    use crate::config::Config;
    use crate::workflow::Mode;

    #[tokio::test]
    async fn test_download_names_video_by_kind() {
        let backend = Arc::new(FakeBackend::with_operations(vec![finished(
            "operations/v",
            Some("https://files.test/result.webm"),
        )]));
        let state = Arc::new(AppState::with_backend(
            Config {
                api_key: Some("key".to_string()),
                ..Config::default()
            },
            backend,
        ));
        state.workflow.switch_mode(Mode::Video).await;
        state
            .workflow
            .accept_upload("frame.jpg", vec![9], "image/jpeg")
            .await
            .unwrap();
        state.workflow.set_prompt("a river".to_string()).await;
        assert!(state.workflow.launch().await.unwrap());

        let response = download_result(Extension(state.clone())).await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"clearview-processed.mp4\""
        );
        assert_eq!(response.headers()[header::CONTENT_TYPE], "video/mp4");
    }

    #[tokio::test]
    async fn test_download_without_result_is_not_found() {
        let state = Arc::new(AppState::with_backend(
            Config::default(),
            Arc::new(FakeBackend::default()),
        ));
        let response = download_result(Extension(state)).await.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_released_media_is_gone() {
        let state = Arc::new(AppState::with_backend(
            Config::default(),
            Arc::new(FakeBackend::default()),
        ));
        let handle = state.store.register(b"img".to_vec(), "image/png");
        let id = handle.id();

        let response = get_media(Path(id), Extension(state.clone())).await.into_response();
        assert_eq!(response.status(), StatusCode::OK);

        handle.release();
        let response = get_media(Path(id), Extension(state)).await.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
