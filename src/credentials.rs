// src/credentials.rs
//! API key capability injected into the capability client

use std::sync::RwLock;

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::error::{AppError, Result};

#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn has_credential(&self) -> bool;

    /// Wait until the user has selected a key
    async fn request_credential(&self) -> Result<()>;

    fn api_key(&self) -> Option<String>;
}

/// Key held for the lifetime of the session. Seeded from configuration and
/// replaced when the user selects one on the page.
#[derive(Default)]
pub struct SessionCredentials {
    key: RwLock<Option<String>>,
    selected: Notify,
}

impl SessionCredentials {
    pub fn new(initial: Option<String>) -> Self {
        Self {
            key: RwLock::new(initial.filter(|k| !k.trim().is_empty())),
            selected: Notify::new(),
        }
    }

    pub fn select(&self, api_key: String) -> Result<()> {
        let api_key = api_key.trim().to_string();
        if api_key.is_empty() {
            return Err(AppError::Validation("API key must not be empty".to_string()));
        }
        *self.key.write().unwrap_or_else(|e| e.into_inner()) = Some(api_key);
        self.selected.notify_waiters();
        tracing::info!("🔑 API key selected for this session");
        Ok(())
    }
}

#[async_trait]
impl CredentialProvider for SessionCredentials {
    async fn has_credential(&self) -> bool {
        self.api_key().is_some()
    }

    async fn request_credential(&self) -> Result<()> {
        loop {
            // Register interest before checking so a concurrent select is not missed
            let notified = self.selected.notified();
            if self.api_key().is_some() {
                return Ok(());
            }
            tracing::info!("Waiting for an API key to be selected...");
            notified.await;
        }
    }

    fn api_key(&self) -> Option<String> {
        self.key.read().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

/// Fixed key, or none at all
pub struct StaticCredentials(pub Option<String>);

#[async_trait]
impl CredentialProvider for StaticCredentials {
    async fn has_credential(&self) -> bool {
        self.0.is_some()
    }

    async fn request_credential(&self) -> Result<()> {
        if self.0.is_some() {
            Ok(())
        } else {
            Err(AppError::Credential("no interactive key selection available".to_string()))
        }
    }

    fn api_key(&self) -> Option<String> {
        self.0.clone()
    }
}
