// src/workflow/runner.rs
//! Drives one launch at a time: take a ticket under the session lock, run the
//! remote operation without holding it, then apply the outcome.

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::capability::CapabilityClient;
use crate::error::{AppError, Result};
use crate::media::{prepare_upload, MediaHandle};
use crate::workflow::state::{LaunchRefusal, LaunchTicket, Mode, Session};

pub type SharedSession = Arc<Mutex<Session>>;

#[derive(Clone)]
pub struct Workflow {
    session: SharedSession,
    client: CapabilityClient,
}

impl Workflow {
    pub fn new(client: CapabilityClient) -> Self {
        Self {
            session: Arc::new(Mutex::new(Session::new())),
            client,
        }
    }

    pub fn session(&self) -> &SharedSession {
        &self.session
    }

    pub fn client(&self) -> &CapabilityClient {
        &self.client
    }

    pub async fn begin_upload(&self) {
        self.session.lock().await.begin_upload();
    }

    /// Encode received bytes and make them the session's source asset
    pub async fn accept_upload(&self, file_name: &str, bytes: Vec<u8>, mime_type: &str) -> Result<()> {
        let prepared = prepare_upload(self.client.store(), file_name, bytes, mime_type);
        let mut session = self.session.lock().await;
        match prepared {
            Ok(upload) => {
                session.select_file(upload);
                Ok(())
            }
            Err(e) => {
                session.upload_failed(&e);
                Err(e)
            }
        }
    }

    pub async fn upload_failed(&self, error: &AppError) {
        self.session.lock().await.upload_failed(error);
    }

    pub async fn clear_file(&self) {
        self.session.lock().await.clear_file();
    }

    pub async fn switch_mode(&self, mode: Mode) {
        self.session.lock().await.switch_mode(mode);
    }

    pub async fn set_prompt(&self, prompt: String) {
        self.session.lock().await.set_prompt(prompt);
    }

    pub async fn reset(&self) {
        self.session.lock().await.reset();
    }

    /// Launch and wait for the outcome to be applied. Returns whether it was
    /// applied (false when superseded while in flight).
    pub async fn launch(&self) -> std::result::Result<bool, LaunchRefusal> {
        let ticket = self.session.lock().await.begin_launch()?;
        Ok(self.run(ticket).await)
    }

    /// Launch on a background task; the caller observes progress through the
    /// session state.
    pub async fn spawn_launch(&self) -> std::result::Result<JoinHandle<bool>, LaunchRefusal> {
        let ticket = self.session.lock().await.begin_launch()?;
        let workflow = self.clone();
        Ok(tokio::spawn(async move { workflow.run(ticket).await }))
    }

    async fn run(&self, ticket: LaunchTicket) -> bool {
        let outcome = self.perform(&ticket).await;
        if let Err(e) = &outcome {
            if !e.is_cancelled() {
                tracing::warn!("{:?} operation failed: {}", ticket.mode, e);
            }
        }
        self.session.lock().await.finish(ticket, outcome)
    }

    async fn perform(&self, ticket: &LaunchTicket) -> Result<MediaHandle> {
        match ticket.mode {
            Mode::Image => self.client.edit_image(&ticket.source, &ticket.cancel).await,
            Mode::Video => {
                self.client
                    .generate_video(&ticket.source, &ticket.prompt, &ticket.cancel)
                    .await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::tests::{
        fast_settings, finished, image_part, pending, text_part, FakeBackend,
    };
    use crate::credentials::StaticCredentials;
    use crate::media::MediaStore;
    use crate::workflow::state::{ProcessingStatus, ResultKind};
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    fn workflow_with(backend: Arc<FakeBackend>) -> (Workflow, MediaStore) {
        let store = MediaStore::new();
        let client = CapabilityClient::new(
            backend,
            Arc::new(StaticCredentials(Some("key".to_string()))),
            store.clone(),
            fast_settings(),
        );
        (Workflow::new(client), store)
    }

    async fn upload_image(workflow: &Workflow) {
        workflow.begin_upload().await;
        workflow
            .accept_upload("photo.jpg", b"jpegbytes".to_vec(), "image/jpeg")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_image_run_completes() {
        let backend = Arc::new(FakeBackend::with_parts(vec![
            text_part("done"),
            image_part("Y2xlYW4="),
        ]));
        let (workflow, _store) = workflow_with(backend);
        upload_image(&workflow).await;

        assert!(workflow.launch().await.unwrap());

        let session = workflow.session().lock().await;
        assert_eq!(session.status(), ProcessingStatus::Completed);
        let result = session.result().unwrap();
        assert_eq!(result.kind, ResultKind::Image);
        assert_eq!(result.processed.as_ref().unwrap().bytes(), b"clean");
        assert_eq!(result.original.bytes(), b"jpegbytes");
    }

    #[tokio::test]
    async fn test_image_without_inline_part_ends_in_error() {
        let backend = Arc::new(FakeBackend::with_parts(vec![text_part("sorry")]));
        let (workflow, _store) = workflow_with(backend);
        upload_image(&workflow).await;

        assert!(workflow.launch().await.unwrap());

        let session = workflow.session().lock().await;
        assert_eq!(session.status(), ProcessingStatus::Error);
        assert_eq!(session.error(), Some("No image data returned from the model."));
    }

    #[tokio::test]
    async fn test_video_run_completes_with_video_kind() {
        let backend = Arc::new(FakeBackend::with_operations(vec![
            pending("operations/v"),
            pending("operations/v"),
            finished("operations/v", Some("https://files.test/v?alt=media")),
        ]));
        let (workflow, _store) = workflow_with(backend.clone());
        workflow.switch_mode(Mode::Video).await;
        upload_image(&workflow).await;
        workflow.set_prompt("a foggy forest".to_string()).await;

        assert!(workflow.launch().await.unwrap());

        let session = workflow.session().lock().await;
        assert_eq!(session.status(), ProcessingStatus::Completed);
        assert_eq!(session.result().unwrap().kind, ResultKind::Video);
        assert_eq!(backend.fetch_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_video_without_prompt_never_calls_provider() {
        let backend = Arc::new(FakeBackend::with_operations(vec![pending("operations/v")]));
        let (workflow, _store) = workflow_with(backend.clone());
        workflow.switch_mode(Mode::Video).await;
        upload_image(&workflow).await;

        assert_eq!(workflow.launch().await.unwrap_err(), LaunchRefusal::MissingPrompt);
        assert_eq!(backend.submit_calls.load(Ordering::SeqCst), 0);
        assert_eq!(
            workflow.session().lock().await.status(),
            ProcessingStatus::Idle
        );
    }

    #[tokio::test]
    async fn test_second_launch_while_processing_is_refused() {
        let backend = Arc::new(FakeBackend::with_operations(vec![pending("operations/v")]));
        let (workflow, _store) = workflow_with(backend.clone());
        workflow.switch_mode(Mode::Video).await;
        upload_image(&workflow).await;
        workflow.set_prompt("scene".to_string()).await;

        let task = workflow.spawn_launch().await.unwrap();
        assert_eq!(
            workflow.spawn_launch().await.unwrap_err(),
            LaunchRefusal::AlreadyProcessing
        );

        workflow.reset().await;
        assert!(!task.await.unwrap());
        assert!(backend.submit_calls.load(Ordering::SeqCst) <= 1);
    }

    #[tokio::test]
    async fn test_mode_switch_cancels_and_discards_in_flight_video() {
        let backend = Arc::new(FakeBackend::with_operations(vec![pending("operations/v")]));
        let (workflow, store) = workflow_with(backend.clone());
        workflow.switch_mode(Mode::Video).await;
        upload_image(&workflow).await;
        workflow.set_prompt("scene".to_string()).await;

        let task = workflow.spawn_launch().await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(backend.poll_calls.load(Ordering::SeqCst) > 0);

        workflow.switch_mode(Mode::Image).await;
        let applied = task.await.unwrap();
        assert!(!applied);

        let polls = backend.poll_calls.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(backend.poll_calls.load(Ordering::SeqCst), polls);

        let session = workflow.session().lock().await;
        assert_eq!(session.mode(), Mode::Image);
        assert_eq!(session.status(), ProcessingStatus::Idle);
        assert!(session.result().is_none());
        assert!(session.error().is_none());
        assert_eq!(store.live_count(), 0);
    }

    #[tokio::test]
    async fn test_rejected_upload_moves_to_error() {
        let backend = Arc::new(FakeBackend::default());
        let (workflow, store) = workflow_with(backend);
        workflow.begin_upload().await;

        let err = workflow
            .accept_upload("movie.mp4", vec![0; 4], "video/mp4")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(
            workflow.session().lock().await.status(),
            ProcessingStatus::Error
        );
        assert_eq!(store.live_count(), 0);
    }

    #[tokio::test]
    async fn test_reset_after_completion_releases_handles() {
        let backend = Arc::new(FakeBackend::with_parts(vec![image_part("QQ==")]));
        let (workflow, store) = workflow_with(backend);
        upload_image(&workflow).await;
        workflow.launch().await.unwrap();
        assert_eq!(store.live_count(), 2);

        workflow.reset().await;
        assert_eq!(store.live_count(), 0);
        assert_eq!(
            workflow.session().lock().await.status(),
            ProcessingStatus::Idle
        );
    }
}
