// src/gemini_client.rs
//! Wire types and HTTP transport for the Generative Language API
//! (image editing via generateContent, video generation via predictLongRunning)

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::Config;
use crate::error::{AppError, Result};

#[derive(Debug, Serialize, Deserialize)]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Content {
    #[serde(default)]
    pub parts: Vec<Part>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(untagged)]
pub enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
    /// Any part kind this client does not use (function calls, thoughts, ...)
    Other(Value),
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct InlineData {
    #[serde(rename = "mimeType", default)]
    pub mime_type: String,
    #[serde(default)]
    pub data: String, // base64 encoded data
}

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(rename = "promptFeedback", skip_serializing_if = "Option::is_none")]
    pub prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Candidate {
    pub content: Option<Content>,
    #[serde(rename = "finishReason", skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PromptFeedback {
    #[serde(rename = "blockReason")]
    pub block_reason: Option<String>,
}

impl GenerateContentResponse {
    /// Parts of the first candidate, in the order the provider returned them
    pub fn first_candidate_parts(&self) -> &[Part] {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|c| c.parts.as_slice())
            .unwrap_or(&[])
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PredictLongRunningRequest {
    pub instances: Vec<VideoInstance>,
    pub parameters: VideoParameters,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VideoInstance {
    pub prompt: String,
    pub image: ReferenceImage,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReferenceImage {
    #[serde(rename = "bytesBase64Encoded")]
    pub bytes_base64_encoded: String,
    #[serde(rename = "mimeType")]
    pub mime_type: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VideoParameters {
    #[serde(rename = "sampleCount")]
    pub sample_count: u32,
    pub resolution: String,
    #[serde(rename = "aspectRatio")]
    pub aspect_ratio: String,
}

/// Long-running operation returned by predictLongRunning and by each poll
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct VideoOperation {
    pub name: String,
    #[serde(default)]
    pub done: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<VideoOperationResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<OperationError>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct VideoOperationResponse {
    #[serde(rename = "generateVideoResponse", skip_serializing_if = "Option::is_none")]
    pub generate_video_response: Option<GenerateVideoResponse>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GenerateVideoResponse {
    #[serde(rename = "generatedSamples", default)]
    pub generated_samples: Vec<GeneratedSample>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GeneratedSample {
    pub video: Option<VideoRef>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct VideoRef {
    pub uri: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationError {
    #[serde(default)]
    pub code: i32,
    #[serde(default)]
    pub message: String,
}

impl VideoOperation {
    /// Locator of the first generated video, if the job produced one
    pub fn video_uri(&self) -> Option<&str> {
        self.response
            .as_ref()?
            .generate_video_response
            .as_ref()?
            .generated_samples
            .first()?
            .video
            .as_ref()?
            .uri
            .as_deref()
            .filter(|uri| !uri.is_empty())
    }
}

/// The remote generative service, as seen by the capability client
#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    async fn generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest,
        api_key: &str,
    ) -> Result<GenerateContentResponse>;

    async fn submit_video(
        &self,
        model: &str,
        request: &PredictLongRunningRequest,
        api_key: &str,
    ) -> Result<VideoOperation>;

    async fn get_operation(&self, name: &str, api_key: &str) -> Result<VideoOperation>;

    /// Plain GET of result bytes; the URL already carries any credential
    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>>;
}

#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.http_timeout)
            .build()
            .map_err(|e| AppError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
        })
    }

    async fn read_json<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
        what: &str,
    ) -> Result<T> {
        let status = response.status();
        let response_text = response.text().await?;

        if !status.is_success() {
            return Err(AppError::Transport(format!(
                "{} API error ({}): {}",
                what,
                status,
                api_error_message(&response_text)
            )));
        }

        tracing::debug!(
            "{} response (truncated): {}...",
            what,
            truncate(&response_text, 500)
        );

        match serde_json::from_str::<T>(&response_text) {
            Ok(result) => Ok(result),
            Err(parse_error) => {
                tracing::error!("Failed to parse {} response: {}", what, parse_error);
                Err(parse_error.into())
            }
        }
    }
}

#[async_trait]
impl GenerativeBackend for HttpBackend {
    async fn generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest,
        api_key: &str,
    ) -> Result<GenerateContentResponse> {
        let url = format!("{}/models/{}:generateContent", self.base_url, model);
        tracing::debug!("POST {} ({} contents)", url, request.contents.len());

        let response = self
            .client
            .post(&url)
            .query(&[("key", api_key)])
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await?;

        Self::read_json(response, "Gemini").await
    }

    async fn submit_video(
        &self,
        model: &str,
        request: &PredictLongRunningRequest,
        api_key: &str,
    ) -> Result<VideoOperation> {
        let url = format!("{}/models/{}:predictLongRunning", self.base_url, model);
        tracing::debug!("POST {}", url);

        let response = self
            .client
            .post(&url)
            .query(&[("key", api_key)])
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await?;

        Self::read_json(response, "Veo").await
    }

    async fn get_operation(&self, name: &str, api_key: &str) -> Result<VideoOperation> {
        let url = format!("{}/{}", self.base_url, name.trim_start_matches('/'));

        let response = self
            .client
            .get(&url)
            .query(&[("key", api_key)])
            .send()
            .await?;

        Self::read_json(response, "Veo operation").await
    }

    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.client.get(url).send().await.map_err(download_error)?;

        if !response.status().is_success() {
            let status = response.status();
            tracing::error!("Video download failed with status {}", status);
            return Err(AppError::Fetch(format!(
                "Failed to download generated video ({}).",
                status
            )));
        }

        let bytes = response.bytes().await.map_err(download_error)?;
        Ok(bytes.to_vec())
    }
}

/// The download URL carries the key; only the cause is kept
fn download_error(err: reqwest::Error) -> AppError {
    let err = err.without_url();
    tracing::error!("Video download failed: {}", err);
    AppError::Fetch(format!("Failed to download generated video: {}", err))
}

/// Pull `error.message` out of a Google API error body, else the raw body
fn api_error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| truncate(body, 300).to_string())
}

fn truncate(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}
