//! Configuration types for workflow generation.
//!
//! Everything the pipeline needs from its environment (upload limits,
//! provider credentials, model names, endpoints) lives in one immutable
//! [`GeneratorConfig`]. It is built once at startup and shared behind an
//! `Arc`, so concurrent requests read it without locking and tests can inject
//! their own values instead of touching process-wide state.
//!
//! Build one with [`GeneratorConfig::builder()`], or read the same variables
//! the service has always used with [`GeneratorConfig::from_env()`].

use crate::error::{ConfigError, ValidationError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One mebibyte, the unit of `MAX_UPLOAD_MB`.
pub const MIB: usize = 1024 * 1024;

/// Configuration for a [`crate::Generator`].
///
/// # Example
/// ```rust
/// use guiflow::GeneratorConfig;
///
/// let config = GeneratorConfig::builder()
///     .max_images(4)
///     .gemini_api_key("AIza...")
///     .build()
///     .unwrap();
/// assert_eq!(config.max_images, 4);
/// ```
#[derive(Clone)]
pub struct GeneratorConfig {
    /// Maximum size of a single uploaded image in bytes. Default: 5 MiB.
    pub max_upload_bytes: usize,

    /// Maximum number of images in one request. Default: 10.
    pub max_images: usize,

    /// OpenAI API key. `None` or blank means the OpenAI backend is unavailable.
    pub openai_api_key: Option<String>,

    /// Gemini API key. `None` or blank means the Gemini backend is unavailable.
    pub gemini_api_key: Option<String>,

    /// Chat-completions model. Default: `gpt-4o`.
    pub openai_model: String,

    /// Generate-content model. Default: `gemini-1.5-flash-latest`.
    pub gemini_model: String,

    /// Base URL of the OpenAI-compatible API, without trailing slash.
    pub openai_base_url: String,

    /// Base URL of the Gemini REST API, without trailing slash.
    pub gemini_base_url: String,

    /// Sampling temperature sent to both providers. Default: 0.2.
    ///
    /// Workflow extraction wants the model to stick to what is on screen;
    /// a low temperature keeps node ids and slot names stable between runs.
    pub temperature: f32,

    /// Maximum tokens the provider may generate. Default: 4096.
    pub max_output_tokens: u32,

    /// Timeout of one provider call in seconds. Default: 120.
    pub request_timeout_secs: u64,

    /// Custom system prompt. If None, uses [`crate::prompts::DEFAULT_SYSTEM_PROMPT`].
    pub system_prompt: Option<String>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            max_upload_bytes: 5 * MIB,
            max_images: 10,
            openai_api_key: None,
            gemini_api_key: None,
            openai_model: "gpt-4o".to_string(),
            gemini_model: "gemini-1.5-flash-latest".to_string(),
            openai_base_url: "https://api.openai.com/v1".to_string(),
            gemini_base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            temperature: 0.2,
            max_output_tokens: 4096,
            request_timeout_secs: 120,
            system_prompt: None,
        }
    }
}

impl fmt::Debug for GeneratorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratorConfig")
            .field("max_upload_bytes", &self.max_upload_bytes)
            .field("max_images", &self.max_images)
            .field("openai_api_key", &redact(&self.openai_api_key))
            .field("gemini_api_key", &redact(&self.gemini_api_key))
            .field("openai_model", &self.openai_model)
            .field("gemini_model", &self.gemini_model)
            .field("openai_base_url", &self.openai_base_url)
            .field("gemini_base_url", &self.gemini_base_url)
            .field("temperature", &self.temperature)
            .field("max_output_tokens", &self.max_output_tokens)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("system_prompt", &self.system_prompt.as_ref().map(|_| "<custom>"))
            .finish()
    }
}

fn redact(key: &Option<String>) -> Option<&'static str> {
    key.as_ref().map(|_| "<redacted>")
}

impl GeneratorConfig {
    /// Create a new builder for `GeneratorConfig`.
    pub fn builder() -> GeneratorConfigBuilder {
        GeneratorConfigBuilder {
            config: Self::default(),
        }
    }

    /// Read configuration from the process environment.
    ///
    /// | Variable | Field |
    /// |----------|-------|
    /// | `LLM_KEY_OPENAI` | `openai_api_key` |
    /// | `LLM_KEY_GEMINI` | `gemini_api_key` |
    /// | `MAX_UPLOAD_MB` | `max_upload_bytes` (in MiB) |
    /// | `MAX_IMAGES` | `max_images` |
    /// | `GUIFLOW_OPENAI_MODEL` / `GUIFLOW_GEMINI_MODEL` | model ids |
    /// | `GUIFLOW_OPENAI_BASE_URL` / `GUIFLOW_GEMINI_BASE_URL` | endpoints |
    /// | `GUIFLOW_TIMEOUT_SECS` | `request_timeout_secs` |
    ///
    /// Blank values count as unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`Self::from_env`] with an injectable variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mut builder = Self::builder();
        if let Some(key) = get("LLM_KEY_OPENAI") {
            builder = builder.openai_api_key(key);
        }
        if let Some(key) = get("LLM_KEY_GEMINI") {
            builder = builder.gemini_api_key(key);
        }
        if let Some(mb) = get("MAX_UPLOAD_MB") {
            let bytes = parse_number::<usize>("MAX_UPLOAD_MB", &mb)?
                .checked_mul(MIB)
                .ok_or_else(|| ConfigError("MAX_UPLOAD_MB is too large".into()))?;
            builder = builder.max_upload_bytes(bytes);
        }
        if let Some(n) = get("MAX_IMAGES") {
            builder = builder.max_images(parse_number("MAX_IMAGES", &n)?);
        }
        if let Some(model) = get("GUIFLOW_OPENAI_MODEL") {
            builder = builder.openai_model(model);
        }
        if let Some(model) = get("GUIFLOW_GEMINI_MODEL") {
            builder = builder.gemini_model(model);
        }
        if let Some(url) = get("GUIFLOW_OPENAI_BASE_URL") {
            builder = builder.openai_base_url(url);
        }
        if let Some(url) = get("GUIFLOW_GEMINI_BASE_URL") {
            builder = builder.gemini_base_url(url);
        }
        if let Some(secs) = get("GUIFLOW_TIMEOUT_SECS") {
            builder = builder.request_timeout_secs(parse_number("GUIFLOW_TIMEOUT_SECS", &secs)?);
        }
        builder.build()
    }

    /// The configured credential for `kind`, if present and not blank.
    pub fn api_key(&self, kind: ProviderKind) -> Option<&str> {
        let key = match kind {
            ProviderKind::OpenAi => self.openai_api_key.as_deref(),
            ProviderKind::Gemini => self.gemini_api_key.as_deref(),
        };
        key.filter(|k| !k.trim().is_empty())
    }
}

fn parse_number<T: FromStr>(name: &str, value: &str) -> Result<T, ConfigError> {
    value
        .parse()
        .map_err(|_| ConfigError(format!("{name} must be a non-negative integer, got '{value}'")))
}

/// Builder for [`GeneratorConfig`].
#[derive(Debug)]
pub struct GeneratorConfigBuilder {
    config: GeneratorConfig,
}

impl GeneratorConfigBuilder {
    pub fn max_upload_bytes(mut self, bytes: usize) -> Self {
        self.config.max_upload_bytes = bytes.max(1);
        self
    }

    pub fn max_images(mut self, n: usize) -> Self {
        self.config.max_images = n.max(1);
        self
    }

    pub fn openai_api_key(mut self, key: impl Into<String>) -> Self {
        self.config.openai_api_key = Some(key.into());
        self
    }

    pub fn gemini_api_key(mut self, key: impl Into<String>) -> Self {
        self.config.gemini_api_key = Some(key.into());
        self
    }

    pub fn openai_model(mut self, model: impl Into<String>) -> Self {
        self.config.openai_model = model.into();
        self
    }

    pub fn gemini_model(mut self, model: impl Into<String>) -> Self {
        self.config.gemini_model = model.into();
        self
    }

    pub fn openai_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.openai_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn gemini_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.gemini_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_output_tokens(mut self, n: u32) -> Self {
        self.config.max_output_tokens = n;
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = secs;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<GeneratorConfig, ConfigError> {
        let c = &self.config;
        if c.max_upload_bytes == 0 {
            return Err(ConfigError("max_upload_bytes must be ≥ 1".into()));
        }
        if c.max_images == 0 {
            return Err(ConfigError("max_images must be ≥ 1".into()));
        }
        if c.request_timeout_secs == 0 {
            return Err(ConfigError("request_timeout_secs must be ≥ 1".into()));
        }
        if c.openai_model.trim().is_empty() || c.gemini_model.trim().is_empty() {
            return Err(ConfigError("model ids must not be empty".into()));
        }
        for url in [&c.openai_base_url, &c.gemini_base_url] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError(format!(
                    "base URL must be http(s), got '{url}'"
                )));
            }
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// The multimodal backend a request is dispatched to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Google Gemini `generateContent`. (default)
    #[default]
    Gemini,
    /// OpenAI chat completions.
    #[serde(rename = "openai")]
    OpenAi,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 2] = [ProviderKind::Gemini, ProviderKind::OpenAi];

    pub fn as_str(self) -> &'static str {
        match self {
            ProviderKind::Gemini => "gemini",
            ProviderKind::OpenAi => "openai",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gemini" => Ok(ProviderKind::Gemini),
            "openai" => Ok(ProviderKind::OpenAi),
            _ => Err(ValidationError::UnknownProvider(s.to_string())),
        }
    }
}
