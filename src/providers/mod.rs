//! Provider adapters: one contract, one implementation per backend.
//!
//! Every backend implements [`VisionProvider`]. An adapter owns its wire
//! request shape and its credential precondition, and hands back the model's
//! raw text for [`crate::pipeline::decode`] to interpret:
//!
//! | Adapter | Endpoint | Images sent as |
//! |---------|----------|----------------|
//! | [`OpenAiProvider`] | `POST /chat/completions` | `data:image/png;base64,…` URIs |
//! | [`GeminiProvider`] | `POST /models/{model}:generateContent` | `inlineData` parts with sniffed MIME |
//!
//! The credential check runs before any body is built or byte is sent, so
//! an unconfigured backend fails fast with
//! [`ProviderError::MissingCredential`]. Everything else that can go wrong on
//! the way to and from the provider becomes [`ProviderError::CallFailed`].
//! There are no retries: one failure is one error for the caller.
//!
//! Adding a backend means one new file implementing [`VisionProvider`] plus a
//! [`ProviderKind`] variant.

mod gemini;
mod openai;

pub use gemini::GeminiProvider;
pub use openai::OpenAiProvider;

use crate::config::{GeneratorConfig, ProviderKind};
use crate::error::{ConfigError, ProviderError};
use crate::pipeline::encode::VisionRequest;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// A multimodal backend that turns a [`VisionRequest`] into raw model text.
#[async_trait]
pub trait VisionProvider: Send + Sync {
    /// Which backend this adapter talks to.
    fn kind(&self) -> ProviderKind;

    /// Run one request and return the model's text reply verbatim.
    async fn generate(&self, request: &VisionRequest) -> Result<String, ProviderError>;
}

/// One adapter per [`ProviderKind`], selected at request time.
#[derive(Clone)]
pub struct ProviderSet {
    openai: Arc<dyn VisionProvider>,
    gemini: Arc<dyn VisionProvider>,
}

impl fmt::Debug for ProviderSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderSet")
            .field("openai", &"<dyn VisionProvider>")
            .field("gemini", &"<dyn VisionProvider>")
            .finish()
    }
}

impl ProviderSet {
    /// Build the real adapters, sharing one HTTP client with the configured timeout.
    pub fn from_config(config: &GeneratorConfig) -> Result<Self, ConfigError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| ConfigError(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            openai: Arc::new(OpenAiProvider::new(http.clone(), config)),
            gemini: Arc::new(GeminiProvider::new(http, config)),
        })
    }

    /// Replace the adapter registered for `provider.kind()`.
    pub fn with_provider(mut self, provider: Arc<dyn VisionProvider>) -> Self {
        match provider.kind() {
            ProviderKind::OpenAi => self.openai = provider,
            ProviderKind::Gemini => self.gemini = provider,
        }
        self
    }

    pub fn get(&self, kind: ProviderKind) -> &Arc<dyn VisionProvider> {
        match kind {
            ProviderKind::OpenAi => &self.openai,
            ProviderKind::Gemini => &self.gemini,
        }
    }
}

// ── Shared helpers ───────────────────────────────────────────────────────

/// `Some(key)` when the credential is present and not blank.
pub(crate) fn require_key(
    key: Option<&str>,
    provider: ProviderKind,
) -> Result<&str, ProviderError> {
    key.filter(|k| !k.trim().is_empty())
        .ok_or(ProviderError::MissingCredential { provider })
}

pub(crate) fn call_failed(provider: ProviderKind, message: impl Into<String>) -> ProviderError {
    ProviderError::CallFailed {
        provider,
        message: message.into(),
    }
}

/// Human-readable text for a transport-level `reqwest` failure.
pub(crate) fn transport_message(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        "request timed out".to_string()
    } else if err.is_connect() {
        format!("could not connect: {err}")
    } else {
        err.to_string()
    }
}

/// Send `request` and return the body of a successful response.
///
/// Non-2xx statuses become `CallFailed` carrying the status and the
/// provider's own error message when the body has one.
pub(crate) async fn send(
    provider: ProviderKind,
    request: reqwest::RequestBuilder,
) -> Result<String, ProviderError> {
    let response = request
        .send()
        .await
        .map_err(|e| call_failed(provider, transport_message(&e)))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| call_failed(provider, format!("failed to read response: {}", transport_message(&e))))?;

    if !status.is_success() {
        return Err(call_failed(
            provider,
            format!("HTTP {}: {}", status.as_u16(), error_message(&body)),
        ));
    }
    Ok(body)
}

/// Both OpenAI and Gemini report failures as `{"error": {"message": ...}}`.
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| {
            let trimmed = body.trim();
            if trimmed.chars().count() > 200 {
                format!("{}…", trimmed.chars().take(200).collect::<String>())
            } else if trimmed.is_empty() {
                "empty response body".to_string()
            } else {
                trimmed.to_string()
            }
        })
}
