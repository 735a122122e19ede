//! OpenAI chat-completions adapter.

use super::{call_failed, require_key, send, VisionProvider};
use crate::config::{GeneratorConfig, ProviderKind};
use crate::error::ProviderError;
use crate::pipeline::encode::{MultimodalPart, VisionRequest};
use crate::prompts;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Label used for every image data URI, whatever the real format.
const DATA_URI_MIME: &str = "image/png";

/// Calls `POST {base_url}/chat/completions` in JSON-object mode.
#[derive(Clone)]
pub struct OpenAiProvider {
    http: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    system_prompt: String,
}

impl OpenAiProvider {
    pub fn new(http: reqwest::Client, config: &GeneratorConfig) -> Self {
        Self {
            http,
            api_key: config.openai_api_key.clone(),
            base_url: config.openai_base_url.clone(),
            model: config.openai_model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_output_tokens,
            system_prompt: prompts::system_prompt(config).to_string(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    /// User content: the text part, then one `image_url` entry per image.
    fn build_body<'a>(&'a self, request: &'a VisionRequest) -> ChatRequest<'a> {
        let content = request
            .parts
            .iter()
            .filter_map(|part| match part {
                MultimodalPart::Text(text) => Some(ContentPart::Text { text }),
                MultimodalPart::Image { .. } => part.data_uri(DATA_URI_MIME).map(|url| {
                    ContentPart::ImageUrl {
                        image_url: ImageUrl { url },
                    }
                }),
            })
            .collect();

        let mut messages = Vec::with_capacity(2);
        if !self.system_prompt.is_empty() {
            messages.push(ChatMessage {
                role: "system",
                content: MessageContent::Text(&self.system_prompt),
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: MessageContent::Parts(content),
        });

        ChatRequest {
            model: &self.model,
            messages,
            response_format: ResponseFormat {
                kind: "json_object",
            },
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }
}

#[async_trait]
impl VisionProvider for OpenAiProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenAi
    }

    async fn generate(&self, request: &VisionRequest) -> Result<String, ProviderError> {
        let api_key = require_key(self.api_key.as_deref(), ProviderKind::OpenAi)?;

        let body = self.build_body(request);
        debug!(
            "OpenAI request: model={}, {} images",
            self.model,
            request.image_count()
        );

        let raw = send(
            ProviderKind::OpenAi,
            self.http.post(self.endpoint()).bearer_auth(api_key).json(&body),
        )
        .await?;

        let parsed: ChatResponse = serde_json::from_str(&raw).map_err(|e| {
            call_failed(ProviderKind::OpenAi, format!("unexpected response body: {e}"))
        })?;

        if let Some(usage) = &parsed.usage {
            debug!(
                "OpenAI usage: {} input tokens, {} output tokens",
                usage.prompt_tokens, usage.completion_tokens
            );
        }

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| call_failed(ProviderKind::OpenAi, "response contained no choices"))?;

        match choice.message.content {
            Some(content) if !content.trim().is_empty() => Ok(content),
            _ => Err(call_failed(
                ProviderKind::OpenAi,
                match (choice.message.refusal, choice.finish_reason) {
                    (Some(refusal), _) => format!("model refused: {refusal}"),
                    (None, Some(reason)) => format!("empty completion (finish_reason={reason})"),
                    (None, None) => "empty completion".to_string(),
                },
            )),
        }
    }
}

// ── Wire types ───────────────────────────────────────────────────────────

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    response_format: ResponseFormat,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: MessageContent<'a>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum MessageContent<'a> {
    Text(&'a str),
    Parts(Vec<ContentPart<'a>>),
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart<'a> {
    Text { text: &'a str },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
    refusal: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    prompt_tokens: u64,
    completion_tokens: u64,
}
