//! Gemini generate-content adapter.

use super::{call_failed, require_key, send, VisionProvider};
use crate::config::{GeneratorConfig, ProviderKind};
use crate::error::ProviderError;
use crate::pipeline::encode::{MultimodalPart, VisionRequest};
use crate::prompts;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Calls `POST {base_url}/models/{model}:generateContent` with JSON output.
#[derive(Clone)]
pub struct GeminiProvider {
    http: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
    temperature: f32,
    max_output_tokens: u32,
    system_prompt: String,
}

impl GeminiProvider {
    pub fn new(http: reqwest::Client, config: &GeneratorConfig) -> Self {
        Self {
            http,
            api_key: config.gemini_api_key.clone(),
            base_url: config.gemini_base_url.clone(),
            model: config.gemini_model.clone(),
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
            system_prompt: prompts::system_prompt(config).to_string(),
        }
    }

    fn endpoint(&self) -> String {
        let model = self.model.trim();
        let model_path = if model.starts_with("models/") {
            model.to_string()
        } else {
            format!("models/{model}")
        };
        format!("{}/{}:generateContent", self.base_url, model_path)
    }

    /// One text part, then one `inlineData` part per image with its sniffed MIME.
    fn build_body<'a>(&'a self, request: &'a VisionRequest) -> GenerateContentRequest<'a> {
        let parts = request
            .parts
            .iter()
            .filter_map(|part| match part {
                MultimodalPart::Text(text) => Some(Part::Text(text)),
                MultimodalPart::Image { mime, .. } => part.to_base64().map(|data| {
                    Part::InlineData(InlineData {
                        mime_type: mime,
                        data,
                    })
                }),
            })
            .collect();

        GenerateContentRequest {
            contents: vec![Content {
                role: Some("user"),
                parts,
            }],
            system_instruction: (!self.system_prompt.is_empty()).then(|| Content {
                role: None,
                parts: vec![Part::Text(&self.system_prompt)],
            }),
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                temperature: self.temperature,
                max_output_tokens: self.max_output_tokens,
            },
        }
    }
}

#[async_trait]
impl VisionProvider for GeminiProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Gemini
    }

    async fn generate(&self, request: &VisionRequest) -> Result<String, ProviderError> {
        let api_key = require_key(self.api_key.as_deref(), ProviderKind::Gemini)?;

        let body = self.build_body(request);
        debug!(
            "Gemini request: model={}, {} images",
            self.model,
            request.image_count()
        );

        let raw = send(
            ProviderKind::Gemini,
            self.http
                .post(self.endpoint())
                .header("x-goog-api-key", api_key)
                .json(&body),
        )
        .await?;

        let parsed: GenerateContentResponse = serde_json::from_str(&raw).map_err(|e| {
            call_failed(ProviderKind::Gemini, format!("unexpected response body: {e}"))
        })?;

        if let Some(usage) = &parsed.usage_metadata {
            debug!(
                "Gemini usage: {} input tokens, {} output tokens",
                usage.prompt_token_count, usage.candidates_token_count
            );
        }

        let Some(candidate) = parsed.candidates.into_iter().next() else {
            let reason = parsed
                .prompt_feedback
                .and_then(|f| f.block_reason)
                .map(|r| format!("prompt blocked ({r})"))
                .unwrap_or_else(|| "response contained no candidates".to_string());
            return Err(call_failed(ProviderKind::Gemini, reason));
        };

        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(call_failed(
                ProviderKind::Gemini,
                match candidate.finish_reason {
                    Some(reason) => format!("empty candidate (finishReason={reason})"),
                    None => "empty candidate".to_string(),
                },
            ));
        }
        Ok(text)
    }
}

// ── Wire types ───────────────────────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
enum Part<'a> {
    Text(&'a str),
    InlineData(InlineData<'a>),
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData<'a> {
    mime_type: &'a str,
    data: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u64,
    #[serde(default)]
    candidates_token_count: u64,
}
