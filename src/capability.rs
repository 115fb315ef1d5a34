// src/capability.rs
//! Capability client: the two remote operations the app offers
//! (watermark removal and reference-image video generation)

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::credentials::CredentialProvider;
use crate::error::{AppError, Result};
use crate::gemini_client::{
    Content, GenerateContentRequest, GenerativeBackend, InlineData, Part,
    PredictLongRunningRequest, ReferenceImage, VideoInstance, VideoParameters,
};
use crate::media::{decode_base64, EncodedMedia, MediaHandle, MediaStore};

pub const WATERMARK_INSTRUCTION: &str = "Remove all watermarks, text, and logos overlaying this image. Restore the background seamlessly where the watermarks were removed. Return only the cleaned image.";

pub const VIDEO_RESOLUTION: &str = "720p";
pub const VIDEO_ASPECT_RATIO: &str = "16:9";

/// Wrap the user's scene description in the fixed quality directive
pub fn video_prompt(scene: &str) -> String {
    format!(
        "High quality, clean video. {}. No watermarks, no text overlays, cinematic lighting.",
        scene.trim()
    )
}

#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub image_model: String,
    pub video_model: String,
    pub poll_interval: Duration,
}

impl ClientSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            image_model: config.image_model.clone(),
            video_model: config.video_model.clone(),
            poll_interval: config.poll_interval,
        }
    }
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

#[derive(Clone)]
pub struct CapabilityClient {
    backend: Arc<dyn GenerativeBackend>,
    credentials: Arc<dyn CredentialProvider>,
    store: MediaStore,
    settings: ClientSettings,
}

impl CapabilityClient {
    pub fn new(
        backend: Arc<dyn GenerativeBackend>,
        credentials: Arc<dyn CredentialProvider>,
        store: MediaStore,
        settings: ClientSettings,
    ) -> Self {
        Self {
            backend,
            credentials,
            store,
            settings,
        }
    }

    pub fn store(&self) -> &MediaStore {
        &self.store
    }

    pub fn credentials(&self) -> &Arc<dyn CredentialProvider> {
        &self.credentials
    }

    /// Single round trip: ask the image model to erase overlays and return the
    /// first inline image it sends back.
    pub async fn edit_image(
        &self,
        source: &EncodedMedia,
        cancel: &CancellationToken,
    ) -> Result<MediaHandle> {
        let api_key = self.credentials.api_key().ok_or_else(|| {
            AppError::Credential("set GEMINI_API_KEY or select a key first".to_string())
        })?;

        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![
                    Part::InlineData {
                        inline_data: InlineData {
                            mime_type: source.mime_type.clone(),
                            data: source.data.clone(),
                        },
                    },
                    Part::Text {
                        text: WATERMARK_INSTRUCTION.to_string(),
                    },
                ],
                role: None,
            }],
        };

        tracing::info!(
            "🧽 Requesting watermark removal from {} ({})",
            self.settings.image_model,
            source.mime_type
        );
        let response = until_cancelled(
            cancel,
            self.backend
                .generate_content(&self.settings.image_model, &request, &api_key),
        )
        .await?;

        let inline = find_inline_image(response.first_candidate_parts()).ok_or_else(|| {
            tracing::warn!("Image model returned no inline image data");
            AppError::NoResult("No image data returned from the model.".to_string())
        })?;

        let bytes = decode_base64(&inline.data)?;
        let mime_type = if inline.mime_type.is_empty() {
            "image/png"
        } else {
            inline.mime_type.as_str()
        };
        tracing::info!("✅ Received cleaned image ({} bytes)", bytes.len());
        Ok(self.store.register(bytes, mime_type))
    }

    /// Submit a video job seeded by the reference image, poll it until it is
    /// done, then download the generated clip.
    pub async fn generate_video(
        &self,
        reference: &EncodedMedia,
        scene: &str,
        cancel: &CancellationToken,
    ) -> Result<MediaHandle> {
        if !self.credentials.has_credential().await {
            tracing::info!("No API key selected, waiting for key selection before video generation");
            until_cancelled(cancel, self.credentials.request_credential()).await?;
        }
        let api_key = self.credentials.api_key().ok_or_else(|| {
            AppError::Credential("key selection finished without a key".to_string())
        })?;

        let request = PredictLongRunningRequest {
            instances: vec![VideoInstance {
                prompt: video_prompt(scene),
                image: ReferenceImage {
                    bytes_base64_encoded: reference.data.clone(),
                    mime_type: reference.mime_type.clone(),
                },
            }],
            parameters: VideoParameters {
                sample_count: 1,
                resolution: VIDEO_RESOLUTION.to_string(),
                aspect_ratio: VIDEO_ASPECT_RATIO.to_string(),
            },
        };

        let mut operation = until_cancelled(
            cancel,
            self.backend
                .submit_video(&self.settings.video_model, &request, &api_key),
        )
        .await?;
        tracing::info!("🎬 Submitted video job {}", operation.name);

        let mut polls = 0usize;
        while !operation.done {
            until_cancelled(cancel, async {
                tokio::time::sleep(self.settings.poll_interval).await;
                Ok(())
            })
            .await?;

            operation = until_cancelled(
                cancel,
                self.backend.get_operation(&operation.name, &api_key),
            )
            .await?;
            polls += 1;
            tracing::debug!(
                "Video job {} poll #{}: done={}",
                operation.name,
                polls,
                operation.done
            );
        }

        if let Some(error) = &operation.error {
            return Err(AppError::Transport(format!(
                "Video generation failed: {} (code {})",
                error.message, error.code
            )));
        }

        let uri = operation.video_uri().ok_or_else(|| {
            AppError::NoResult("Video generation failed or returned no URI.".to_string())
        })?;

        tracing::info!("⬇️ Video job finished after {} polls, downloading result", polls);
        let bytes = until_cancelled(
            cancel,
            self.backend.fetch_bytes(&with_key_param(uri, &api_key)),
        )
        .await?;

        tracing::info!("✅ Downloaded generated video ({} bytes)", bytes.len());
        Ok(self.store.register(bytes, "video/mp4"))
    }
}

/// First part carrying non-empty inline image bytes, wherever it sits
pub fn find_inline_image(parts: &[Part]) -> Option<&InlineData> {
    parts.iter().find_map(|part| match part {
        Part::InlineData { inline_data }
            if !inline_data.data.is_empty()
                && (inline_data.mime_type.is_empty()
                    || inline_data.mime_type.starts_with("image/")) =>
        {
            Some(inline_data)
        }
        _ => None,
    })
}

/// Append the credential as a `key` query parameter
pub fn with_key_param(uri: &str, api_key: &str) -> String {
    let separator = if uri.contains('?') { '&' } else { '?' };
    format!("{}{}key={}", uri, separator, urlencoding::encode(api_key))
}

/// Resolve `fut`, or stop with `Cancelled` as soon as the token fires.
/// A cancelled future is dropped, so its response is never observed.
async fn until_cancelled<T, F>(cancel: &CancellationToken, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(AppError::Cancelled),
        result = fut => result,
    }
}
