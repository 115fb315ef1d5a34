// src/handlers/session.rs
//! Session endpoints: the events the page sends into the state machine

use axum::{
    extract::{multipart::Multipart, DefaultBodyLimit, Extension},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use std::path::Path;
use std::sync::Arc;

use crate::credentials::CredentialProvider;
use crate::error::AppError;
use crate::media::mime_from_path;
use crate::models::{ActionResponse, CredentialRequest, ModeRequest, PromptRequest, SessionView};
use crate::workflow::LaunchRefusal;
use crate::AppState;

pub fn session_routes(max_upload_bytes: usize) -> Router {
    let upload = Router::new()
        .route("/api/upload", post(upload_file).delete(clear_file))
        .layer(DefaultBodyLimit::max(max_upload_bytes));

    Router::new()
        .route("/api/state", get(get_state))
        .route("/api/mode", post(switch_mode))
        .route("/api/prompt", post(set_prompt))
        .route("/api/launch", post(launch))
        .route("/api/reset", post(reset))
        .route("/api/credential", post(select_credential))
        .merge(upload)
}

pub(crate) async fn snapshot(state: &AppState) -> SessionView {
    let has_credential = state.credentials.api_key().is_some();
    let session = state.workflow.session().lock().await;
    SessionView::from_session(&session, has_credential)
}

async fn respond(state: &AppState, status: StatusCode, message: impl Into<String>) -> axum::response::Response {
    let response = ActionResponse {
        success: status.is_success(),
        message: message.into(),
        state: snapshot(state).await,
    };
    (status, Json(response)).into_response()
}

/// GET /api/state
pub async fn get_state(Extension(state): Extension<Arc<AppState>>) -> impl IntoResponse {
    Json(snapshot(&state).await)
}

/// POST /api/mode
pub async fn switch_mode(
    Extension(state): Extension<Arc<AppState>>,
    Json(request): Json<ModeRequest>,
) -> impl IntoResponse {
    state.workflow.switch_mode(request.mode).await;
    respond(&state, StatusCode::OK, format!("Switched to {:?} mode", request.mode)).await
}

/// POST /api/upload - one image file, multipart field "file"
pub async fn upload_file(
    Extension(state): Extension<Arc<AppState>>,
    mut multipart: Multipart,
) -> impl IntoResponse {
    state.workflow.begin_upload().await;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                tracing::error!("Failed to parse multipart field: {}", e);
                let err = AppError::Encoding(e.body_text());
                state.workflow.upload_failed(&err).await;
                return respond(&state, StatusCode::BAD_REQUEST, err.user_message()).await;
            }
        };

        let Some(file_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let mime_type = field
            .content_type()
            .map(str::to_string)
            .filter(|m| !m.is_empty() && m != "application/octet-stream")
            .unwrap_or_else(|| mime_from_path(Path::new(&file_name)).to_string());

        let data = match field.bytes().await {
            Ok(data) => data,
            Err(e) => {
                tracing::error!("Failed to read uploaded file '{}': {}", file_name, e);
                let err = AppError::Encoding(e.body_text());
                state.workflow.upload_failed(&err).await;
                return respond(&state, StatusCode::BAD_REQUEST, err.user_message()).await;
            }
        };

        tracing::info!("Received upload '{}' ({}, {} bytes)", file_name, mime_type, data.len());
        return match state
            .workflow
            .accept_upload(&file_name, data.to_vec(), &mime_type)
            .await
        {
            Ok(()) => respond(&state, StatusCode::OK, "File ready").await,
            Err(e) => respond(&state, StatusCode::BAD_REQUEST, e.user_message()).await,
        };
    }

    let err = AppError::Validation("No file received".to_string());
    state.workflow.upload_failed(&err).await;
    respond(&state, StatusCode::BAD_REQUEST, err.user_message()).await
}

/// DELETE /api/upload
pub async fn clear_file(Extension(state): Extension<Arc<AppState>>) -> impl IntoResponse {
    state.workflow.clear_file().await;
    respond(&state, StatusCode::OK, "Selection cleared").await
}

/// POST /api/prompt
pub async fn set_prompt(
    Extension(state): Extension<Arc<AppState>>,
    Json(request): Json<PromptRequest>,
) -> impl IntoResponse {
    state.workflow.set_prompt(request.prompt).await;
    respond(&state, StatusCode::OK, "Prompt updated").await
}

/// POST /api/launch - starts processing in the background; poll /api/state
pub async fn launch(Extension(state): Extension<Arc<AppState>>) -> impl IntoResponse {
    match state.workflow.spawn_launch().await {
        Ok(_task) => respond(&state, StatusCode::ACCEPTED, "Processing started").await,
        Err(refusal) => {
            let status = match refusal {
                LaunchRefusal::MissingPrompt => StatusCode::BAD_REQUEST,
                LaunchRefusal::MissingAsset | LaunchRefusal::AlreadyProcessing => {
                    StatusCode::CONFLICT
                }
            };
            tracing::debug!("Launch refused: {:?}", refusal);
            respond(&state, status, refusal.message()).await
        }
    }
}

/// POST /api/reset - "process new file"
pub async fn reset(Extension(state): Extension<Arc<AppState>>) -> impl IntoResponse {
    state.workflow.reset().await;
    respond(&state, StatusCode::OK, "Ready for a new file").await
}

/// POST /api/credential - interactive key selection
pub async fn select_credential(
    Extension(state): Extension<Arc<AppState>>,
    Json(request): Json<CredentialRequest>,
) -> impl IntoResponse {
    match state.credentials.select(request.api_key) {
        Ok(()) => respond(&state, StatusCode::OK, "API key selected").await,
        Err(e) => respond(&state, StatusCode::BAD_REQUEST, e.user_message()).await,
    }
}
