// src/error.rs
//! Error taxonomy shared by the encoder, the capability client and the workflow

use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    /// Local file could not be read or encoded
    #[error("Failed to read the selected file: {0}")]
    Encoding(String),

    /// Input missing before launch (handled inline, never enters Processing)
    #[error("{0}")]
    Validation(String),

    /// Network or provider-side fault
    #[error("Request to the generation service failed: {0}")]
    Transport(String),

    /// Provider answered without usable output
    #[error("{0}")]
    NoResult(String),

    /// Result bytes could not be downloaded
    #[error("{0}")]
    Fetch(String),

    #[error("No API key selected: {0}")]
    Credential(String),

    /// Superseded by a newer session event
    #[error("Operation was cancelled")]
    Cancelled,

    #[error("Configuration error: {0}")]
    Config(String),
}

impl AppError {
    /// Text stored in the session's Error state
    pub fn user_message(&self) -> String {
        self.to_string()
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, AppError::Cancelled)
    }
}

/// Request URLs carry the API key as a query parameter, so the URL is
/// stripped before the error is formatted.
impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        let err = err.without_url();
        if err.is_timeout() {
            AppError::Transport(format!("request timed out: {}", err))
        } else {
            AppError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Transport(format!("error decoding response body: {}", err))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Encoding(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_messages() {
        let err = AppError::NoResult("No image data returned from the model.".to_string());
        assert_eq!(err.user_message(), "No image data returned from the model.");

        let err = AppError::Transport("503 Service Unavailable".to_string());
        assert!(err.user_message().contains("503"));
    }

    #[test]
    fn test_io_error_maps_to_encoding() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.png");
        let err: AppError = io.into();
        assert!(matches!(err, AppError::Encoding(_)));
        assert!(!err.is_cancelled());
        assert!(AppError::Cancelled.is_cancelled());
    }

    #[test]
    fn test_json_error_maps_to_transport() {
        let bad = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: AppError = bad.into();
        assert!(matches!(err, AppError::Transport(_)));
    }
}
