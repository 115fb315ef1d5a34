// src/workflow/state.rs
//! Session state machine: idle -> processing -> completed | error, per mode

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::error::{AppError, Result};
use crate::media::{EncodedMedia, MediaHandle, PreparedUpload};

pub const MISSING_PROMPT_MESSAGE: &str = "Please provide a prompt to describe the video.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Image,
    Video,
}

impl Mode {
    pub fn result_kind(self) -> ResultKind {
        match self {
            Mode::Image => ResultKind::Image,
            Mode::Video => ResultKind::Video,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingStatus {
    #[default]
    Idle,
    /// File bytes are still being received
    Uploading,
    Processing,
    Completed,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultKind {
    Image,
    Video,
}

impl ResultKind {
    pub fn file_extension(self) -> &'static str {
        match self {
            ResultKind::Image => "png",
            ResultKind::Video => "mp4",
        }
    }
}

/// Name offered when saving a processed artifact. Depends only on the kind,
/// not on what the bytes actually are.
pub fn download_file_name(kind: ResultKind) -> String {
    format!("clearview-processed.{}", kind.file_extension())
}

#[derive(Debug, Clone)]
pub struct SourceAsset {
    pub file_name: String,
    pub encoded: EncodedMedia,
    pub preview: MediaHandle,
}

impl From<PreparedUpload> for SourceAsset {
    fn from(upload: PreparedUpload) -> Self {
        Self {
            file_name: upload.file_name,
            encoded: upload.encoded,
            preview: upload.preview,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProcessedResult {
    pub original: MediaHandle,
    pub processed: Option<MediaHandle>,
    pub kind: ResultKind,
    pub completed_at: DateTime<Utc>,
}

/// Everything an in-flight operation needs, captured at launch
#[derive(Debug, Clone)]
pub struct LaunchTicket {
    pub generation: u64,
    pub mode: Mode,
    pub source: EncodedMedia,
    pub original: MediaHandle,
    pub prompt: String,
    pub cancel: CancellationToken,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchRefusal {
    MissingAsset,
    MissingPrompt,
    AlreadyProcessing,
}

impl LaunchRefusal {
    pub fn message(self) -> &'static str {
        match self {
            LaunchRefusal::MissingAsset => "Select an image first.",
            LaunchRefusal::MissingPrompt => MISSING_PROMPT_MESSAGE,
            LaunchRefusal::AlreadyProcessing => "A file is already being processed.",
        }
    }
}

#[derive(Debug, Default)]
pub struct Session {
    mode: Mode,
    status: ProcessingStatus,
    asset: Option<SourceAsset>,
    prompt: String,
    result: Option<ProcessedResult>,
    error: Option<String>,
    /// Bumped by every event that supersedes an in-flight operation
    generation: u64,
    in_flight: Option<CancellationToken>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn status(&self) -> ProcessingStatus {
        self.status
    }

    pub fn asset(&self) -> Option<&SourceAsset> {
        self.asset.as_ref()
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn result(&self) -> Option<&ProcessedResult> {
        self.result.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_processing(&self) -> bool {
        self.status == ProcessingStatus::Processing
    }

    /// Cancel whatever is in flight so its outcome can never be applied
    fn supersede(&mut self) {
        if let Some(token) = self.in_flight.take() {
            token.cancel();
            tracing::info!("⏹️ Cancelled in-flight operation (generation {})", self.generation);
        }
        self.generation += 1;
    }

    /// A new file is arriving. The current selection stays until the new one
    /// has been accepted by `select_file`.
    pub fn begin_upload(&mut self) {
        self.supersede();
        self.error = None;
        self.status = ProcessingStatus::Uploading;
    }

    pub fn select_file(&mut self, upload: PreparedUpload) {
        self.supersede();
        tracing::info!("📁 Selected {} ({})", upload.file_name, upload.encoded.mime_type);
        self.asset = Some(upload.into());
        self.result = None;
        self.error = None;
        self.status = ProcessingStatus::Idle;
    }

    pub fn upload_failed(&mut self, error: &AppError) {
        self.supersede();
        tracing::warn!("Upload failed: {}", error);
        self.error = Some(error.user_message());
        self.status = ProcessingStatus::Error;
    }

    pub fn clear_file(&mut self) {
        self.supersede();
        self.asset = None;
        self.result = None;
        self.error = None;
        self.status = ProcessingStatus::Idle;
    }

    /// Every mode switch starts from a clean session
    pub fn switch_mode(&mut self, mode: Mode) {
        self.supersede();
        self.mode = mode;
        self.status = ProcessingStatus::Idle;
        self.asset = None;
        self.prompt.clear();
        self.result = None;
        self.error = None;
        tracing::info!("🔀 Switched to {:?} mode", mode);
    }

    pub fn set_prompt(&mut self, prompt: impl Into<String>) {
        self.prompt = prompt.into();
    }

    /// Enter Processing and hand out what the operation needs. Refusals leave
    /// the status untouched; a missing prompt also shows the inline message.
    pub fn begin_launch(&mut self) -> std::result::Result<LaunchTicket, LaunchRefusal> {
        if self.is_processing() {
            return Err(LaunchRefusal::AlreadyProcessing);
        }
        let asset = self.asset.as_ref().ok_or(LaunchRefusal::MissingAsset)?;
        if self.mode == Mode::Video && self.prompt.trim().is_empty() {
            self.error = Some(MISSING_PROMPT_MESSAGE.to_string());
            return Err(LaunchRefusal::MissingPrompt);
        }

        let ticket = LaunchTicket {
            generation: self.generation,
            mode: self.mode,
            source: asset.encoded.clone(),
            original: asset.preview.clone(),
            prompt: self.prompt.trim().to_string(),
            cancel: CancellationToken::new(),
        };

        self.in_flight = Some(ticket.cancel.clone());
        self.result = None;
        self.error = None;
        self.status = ProcessingStatus::Processing;
        tracing::info!(
            "🚀 Launching {:?} processing for {} (generation {})",
            ticket.mode,
            asset.file_name,
            ticket.generation
        );
        Ok(ticket)
    }

    /// Apply an operation's outcome. Returns false, and drops the outcome,
    /// when the ticket was superseded in the meantime.
    pub fn finish(&mut self, ticket: LaunchTicket, outcome: Result<MediaHandle>) -> bool {
        if ticket.generation != self.generation || !self.is_processing() {
            tracing::info!(
                "Discarding stale {:?} outcome (generation {}, session at {})",
                ticket.mode,
                ticket.generation,
                self.generation
            );
            return false;
        }
        self.in_flight = None;

        match outcome {
            Ok(processed) => {
                self.result = Some(ProcessedResult {
                    original: ticket.original,
                    processed: Some(processed),
                    kind: ticket.mode.result_kind(),
                    completed_at: Utc::now(),
                });
                self.error = None;
                self.status = ProcessingStatus::Completed;
                tracing::info!("✅ {:?} processing completed", ticket.mode);
            }
            Err(AppError::Cancelled) => {
                self.status = ProcessingStatus::Idle;
                tracing::info!("{:?} processing cancelled", ticket.mode);
            }
            Err(e) => {
                tracing::error!("❌ {:?} processing failed: {}", ticket.mode, e);
                self.result = None;
                self.error = Some(e.user_message());
                self.status = ProcessingStatus::Error;
            }
        }
        true
    }

    /// "Process new file": back to Idle with nothing selected
    pub fn reset(&mut self) {
        self.supersede();
        self.asset = None;
        self.result = None;
        self.error = None;
        self.status = ProcessingStatus::Idle;
    }
}
