//! # guiflow
//!
//! Turn UI screenshots and a short scenario description into a GUI-agent
//! workflow: an ordered graph of nodes, each carrying a prompt plus named
//! input and output slots.
//!
//! ## Pipeline Overview
//!
//! ```text
//! uploads + description
//!  │
//!  ├─ 1. Validate  declared type, size limit, byte-signature sniffing
//!  ├─ 2. Encode    provider-neutral parts: text first, then images in order
//!  ├─ 3. Provider  OpenAI chat-completions or Gemini generateContent (JSON mode)
//!  └─ 4. Decode    JSON parse + workflow schema check → Workflow
//! ```
//!
//! Each stage fails with its own error type; [`GenerateError`] classifies
//! them for the caller (bad input vs. provider failure).
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use guiflow::{GenerateRequest, Generator, GeneratorConfig, ProviderKind, UploadedImage};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // LLM_KEY_GEMINI / LLM_KEY_OPENAI, MAX_UPLOAD_MB, MAX_IMAGES
//!     let generator = Generator::new(GeneratorConfig::from_env()?)?;
//!
//!     let png = std::fs::read("login.png")?;
//!     let request = GenerateRequest::new("log in and open the settings page", ProviderKind::Gemini)
//!         .image(UploadedImage::new("image/png", png));
//!
//!     let workflow = generator.generate(request).await?;
//!     println!("{}", serde_json::to_string_pretty(&workflow)?);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature  | Default | Description |
//! |----------|---------|-------------|
//! | `cli`    | on      | Enables the `guiflow` binary (clap + anyhow + tracing-subscriber + indicatif) |
//! | `server` | on      | axum router: `POST /api/generateDsl`, `GET /api/templates` |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod generate;
pub mod pipeline;
pub mod prompts;
pub mod providers;
#[cfg(feature = "server")]
pub mod server;
pub mod templates;
pub mod workflow;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{GeneratorConfig, GeneratorConfigBuilder, ProviderKind};
pub use error::{ConfigError, DecodeError, ErrorClass, GenerateError, ProviderError, ValidationError};
pub use generate::{GenerateRequest, Generator};
pub use pipeline::decode::decode;
pub use pipeline::encode::{encode, MultimodalPart, VisionRequest};
pub use pipeline::validate::{validate, UploadedImage, ValidatedImage};
pub use providers::{GeminiProvider, OpenAiProvider, ProviderSet, VisionProvider};
pub use templates::{TemplateError, TemplateStore};
pub use workflow::{Slot, Workflow, WorkflowNode};
