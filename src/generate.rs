//! Orchestration: run one request through every pipeline stage.
//!
//! [`Generator::generate`] is the library's entry point. It owns nothing
//! mutable (an `Arc` of the immutable [`GeneratorConfig`] and the
//! [`ProviderSet`]) so one `Generator` is cloned into every request handler
//! and calls never observe each other.

use crate::config::{GeneratorConfig, ProviderKind};
use crate::error::{ConfigError, GenerateError};
use crate::pipeline::encode::{check_image_count, encode};
use crate::pipeline::validate::{validate_upload, UploadedImage, ValidatedImage};
use crate::pipeline::decode::decode;
use crate::providers::{ProviderSet, VisionProvider};
use crate::workflow::Workflow;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Input of one generation call.
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub description: String,
    pub images: Vec<UploadedImage>,
    pub provider: ProviderKind,
}

impl GenerateRequest {
    pub fn new(description: impl Into<String>, provider: ProviderKind) -> Self {
        Self {
            description: description.into(),
            images: Vec::new(),
            provider,
        }
    }

    pub fn image(mut self, image: UploadedImage) -> Self {
        self.images.push(image);
        self
    }
}

/// Runs validation → encoding → provider call → decoding.
#[derive(Debug, Clone)]
pub struct Generator {
    config: Arc<GeneratorConfig>,
    providers: ProviderSet,
}

impl Generator {
    /// Build a generator with the real OpenAI and Gemini adapters.
    pub fn new(config: GeneratorConfig) -> Result<Self, ConfigError> {
        let providers = ProviderSet::from_config(&config)?;
        Ok(Self::with_providers(config, providers))
    }

    pub fn with_providers(config: GeneratorConfig, providers: ProviderSet) -> Self {
        Self {
            config: Arc::new(config),
            providers,
        }
    }

    /// Replace the adapter for `provider.kind()`, keeping the rest.
    pub fn with_provider(mut self, provider: Arc<dyn VisionProvider>) -> Self {
        self.providers = self.providers.with_provider(provider);
        self
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Generate a workflow for one request.
    ///
    /// The first failing stage ends the call; nothing partial is returned.
    pub async fn generate(&self, request: GenerateRequest) -> Result<Workflow, GenerateError> {
        let start = Instant::now();
        let provider = request.provider;
        info!(
            "Generating workflow: provider={}, {} images, description {} chars",
            provider,
            request.images.len(),
            request.description.chars().count()
        );

        match self.run(request).await {
            Ok(workflow) => {
                info!(
                    "Workflow ready: {} nodes in {}ms",
                    workflow.len(),
                    start.elapsed().as_millis()
                );
                Ok(workflow)
            }
            Err(e) => {
                warn!(
                    "Generation failed ({:?}, {}) after {}ms: {}",
                    e.class(),
                    e.kind(),
                    start.elapsed().as_millis(),
                    e
                );
                Err(e)
            }
        }
    }

    async fn run(&self, request: GenerateRequest) -> Result<Workflow, GenerateError> {
        let GenerateRequest {
            description,
            images,
            provider,
        } = request;

        // ── Step 1: Count before touching any bytes ─────────────────────────
        check_image_count(images.len(), self.config.max_images)?;

        // ── Step 2: Validate uploads ────────────────────────────────────────
        let validated = images
            .into_iter()
            .map(|img| validate_upload(img, self.config.max_upload_bytes))
            .collect::<Result<Vec<ValidatedImage>, _>>()?;
        debug!("Validated {} images", validated.len());

        // ── Step 3: Encode ──────────────────────────────────────────────────
        let payload = encode(&description, validated, provider, self.config.max_images)?;

        // ── Step 4: Provider call ───────────────────────────────────────────
        let llm_start = Instant::now();
        let raw = self.providers.get(provider).generate(&payload).await?;
        debug!(
            "{} replied with {} bytes in {}ms",
            provider,
            raw.len(),
            llm_start.elapsed().as_millis()
        );

        // ── Step 5: Decode ──────────────────────────────────────────────────
        Ok(decode(&raw)?)
    }
}
