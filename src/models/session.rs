// src/models/session.rs
//! JSON shapes exchanged with the page

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::workflow::{download_file_name, Mode, ProcessingStatus, ResultKind, Session};

/// Snapshot of everything the page renders
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionView {
    pub mode: Mode,
    pub status: ProcessingStatus,
    pub file_name: Option<String>,
    pub preview_url: Option<String>,
    pub prompt: String,
    pub error: Option<String>,
    pub result: Option<ResultView>,
    pub has_credential: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ResultView {
    pub kind: ResultKind,
    pub original_url: String,
    pub processed_url: Option<String>,
    pub download_name: String,
    pub completed_at: DateTime<Utc>,
}

impl SessionView {
    pub fn from_session(session: &Session, has_credential: bool) -> Self {
        let asset = session.asset();
        Self {
            mode: session.mode(),
            status: session.status(),
            file_name: asset.map(|a| a.file_name.clone()),
            preview_url: asset.map(|a| a.preview.reference()),
            prompt: session.prompt().to_string(),
            error: session.error().map(str::to_string),
            result: session.result().map(|r| ResultView {
                kind: r.kind,
                original_url: r.original.reference(),
                processed_url: r.processed.as_ref().map(|p| p.reference()),
                download_name: download_file_name(r.kind),
                completed_at: r.completed_at,
            }),
            has_credential,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ModeRequest {
    pub mode: Mode,
}

#[derive(Debug, Deserialize)]
pub struct PromptRequest {
    pub prompt: String,
}

#[derive(Debug, Deserialize)]
pub struct CredentialRequest {
    pub api_key: String,
}

#[derive(Debug, Serialize)]
pub struct ActionResponse {
    pub success: bool,
    pub message: String,
    pub state: SessionView,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::{prepare_upload, MediaStore};

    #[test]
    fn test_view_of_completed_session() {
        let store = MediaStore::new();
        let mut session = Session::new();
        session.select_file(prepare_upload(&store, "cat.png", vec![1], "image/png").unwrap());
        let ticket = session.begin_launch().unwrap();
        session.finish(ticket, Ok(store.register(vec![2], "image/png")));

        let view = SessionView::from_session(&session, true);
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["mode"], "image");
        assert_eq!(json["status"], "completed");
        assert_eq!(json["file_name"], "cat.png");
        assert_eq!(json["result"]["kind"], "image");
        assert_eq!(json["result"]["download_name"], "clearview-processed.png");
        assert_eq!(json["result"]["original_url"], json["preview_url"]);
        assert!(json["result"]["processed_url"]
            .as_str()
            .unwrap()
            .starts_with("/media/"));
    }

    #[test]
    fn test_mode_request_parses_lowercase() {
        let req: ModeRequest = serde_json::from_str(r#"{"mode":"video"}"#).unwrap();
        assert_eq!(req.mode, Mode::Video);
        assert!(serde_json::from_str::<ModeRequest>(r#"{"mode":"audio"}"#).is_err());
    }
}
