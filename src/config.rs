// src/config.rs
//! Runtime configuration, read from the environment (and an optional .env file)

use std::time::Duration;

use crate::error::{AppError, Result};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_IMAGE_MODEL: &str = "gemini-2.5-flash-image";
pub const DEFAULT_VIDEO_MODEL: &str = "veo-3.1-fast-generate-preview";

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub api_key: Option<String>,
    pub base_url: String,
    pub image_model: String,
    pub video_model: String,
    pub poll_interval: Duration,
    pub http_timeout: Duration,
    pub max_upload_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".to_string(),
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            image_model: DEFAULT_IMAGE_MODEL.to_string(),
            video_model: DEFAULT_VIDEO_MODEL.to_string(),
            poll_interval: Duration::from_secs(5),
            http_timeout: Duration::from_secs(120),
            max_upload_bytes: 20 * 1024 * 1024,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable source; `from_env` passes `std::env::var`
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let api_key = non_empty("GEMINI_API_KEY").or_else(|| non_empty("API_KEY"));

        let poll_secs = parse_number(&lookup, "CLEARVIEW_POLL_INTERVAL_SECS")?
            .unwrap_or(defaults.poll_interval.as_secs());
        let timeout_secs = parse_number(&lookup, "CLEARVIEW_HTTP_TIMEOUT_SECS")?
            .unwrap_or(defaults.http_timeout.as_secs());
        let max_upload_bytes = match parse_number(&lookup, "CLEARVIEW_MAX_UPLOAD_MB")? {
            Some(mb) => usize::try_from(mb)
                .ok()
                .and_then(|mb| mb.checked_mul(1024 * 1024))
                .ok_or_else(|| {
                    AppError::Config(format!("CLEARVIEW_MAX_UPLOAD_MB is too large ({} MB)", mb))
                })?,
            None => defaults.max_upload_bytes,
        };

        if timeout_secs == 0 {
            return Err(AppError::Config(
                "CLEARVIEW_HTTP_TIMEOUT_SECS must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            bind_addr: non_empty("CLEARVIEW_BIND").unwrap_or(defaults.bind_addr),
            api_key,
            base_url: non_empty("GEMINI_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.base_url),
            image_model: non_empty("CLEARVIEW_IMAGE_MODEL").unwrap_or(defaults.image_model),
            video_model: non_empty("CLEARVIEW_VIDEO_MODEL").unwrap_or(defaults.video_model),
            poll_interval: Duration::from_secs(poll_secs),
            http_timeout: Duration::from_secs(timeout_secs),
            max_upload_bytes,
        })
    }
}

fn parse_number<F>(lookup: &F, name: &str) -> Result<Option<u64>>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|e| AppError::Config(format!("{} must be a whole number ({})", name, e))),
        _ => Ok(None),
    }
}
