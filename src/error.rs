//! Error types for the guiflow library.
//!
//! Each pipeline stage owns one error enum so a failure is classified at the
//! point where it happens:
//!
//! * [`ValidationError`]: the caller's input was bad (wrong type, too big,
//!   too many files, unknown provider).
//! * [`ProviderError`]: the selected backend is not configured or the call
//!   to it failed.
//! * [`DecodeError`]: the backend answered, but the text is not a usable
//!   workflow document.
//!
//! [`GenerateError`] wraps all three for the orchestrator and knows how to
//! present itself at a boundary: [`GenerateError::class`] separates "your
//! input was bad" from "the provider failed", [`GenerateError::status_code`]
//! gives the HTTP status, and [`GenerateError::kind`] a stable machine string.

use crate::config::ProviderKind;
use thiserror::Error;

/// Rejections produced while checking uploads and building the request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    // ── Upload errors ─────────────────────────────────────────────────────
    /// Declared content type does not start with `image/`.
    #[error("Invalid content type '{declared}': only image uploads are accepted")]
    WrongDeclaredType { declared: String },

    /// Upload exceeds the per-image byte limit.
    #[error("File too large: {size} bytes (limit is {max} bytes)")]
    TooLarge { size: usize, max: usize },

    /// Byte signature is not one of the supported image formats.
    #[error("Invalid file: content is not a supported image (declared '{declared}')")]
    NotAnImage { declared: String },

    // ── Request errors ────────────────────────────────────────────────────
    /// More images than the configured maximum.
    #[error("Too many files: {count} images (limit is {max})")]
    TooManyImages { count: usize, max: usize },

    /// Provider tag is not one of the known backends.
    #[error("Invalid model '{0}': expected 'gemini' or 'openai'")]
    UnknownProvider(String),
}

/// Failures of a provider adapter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// The provider's API key is absent or blank.
    #[error("{provider} key missing: set the provider credential before calling it")]
    MissingCredential { provider: ProviderKind },

    /// Transport, HTTP or envelope failure while calling the provider.
    #[error("{provider} call failed: {message}")]
    CallFailed {
        provider: ProviderKind,
        message: String,
    },
}

/// The model's reply could not be turned into a [`crate::Workflow`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Reply is not JSON at all.
    #[error("Model returned malformed JSON: {0}")]
    MalformedJson(String),

    /// Reply is JSON but violates the workflow schema.
    #[error("Model output does not match the workflow schema at {path}: {detail}")]
    SchemaMismatch { path: String, detail: String },
}

/// Invalid [`crate::config::GeneratorConfig`] values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid configuration: {0}")]
pub struct ConfigError(pub String);

/// Coarse classification used at the client boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// The request itself was unacceptable (4xx).
    ClientError,
    /// The backend is not configured (5xx, "service unavailable").
    ServiceUnavailable,
    /// The backend failed or returned unusable output (5xx).
    UpstreamFailure,
}

/// Any failure of one [`crate::Generator::generate`] call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerateError {
    // ── Client input ──────────────────────────────────────────────────────
    #[error(transparent)]
    Validation(#[from] ValidationError),

    // ── Upstream ──────────────────────────────────────────────────────────
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Decode(#[from] DecodeError),
}

impl GenerateError {
    /// Whether the caller or the backend is at fault.
    pub fn class(&self) -> ErrorClass {
        match self {
            GenerateError::Validation(_) => ErrorClass::ClientError,
            GenerateError::Provider(ProviderError::MissingCredential { .. }) => {
                ErrorClass::ServiceUnavailable
            }
            GenerateError::Provider(ProviderError::CallFailed { .. }) => {
                ErrorClass::UpstreamFailure
            }
            GenerateError::Decode(_) => ErrorClass::UpstreamFailure,
        }
    }

    /// HTTP status for this error. Kept numeric so the core has no web dependency.
    pub fn status_code(&self) -> u16 {
        match self {
            GenerateError::Validation(ValidationError::TooLarge { .. }) => 413,
            GenerateError::Validation(_) => 400,
            GenerateError::Provider(_) | GenerateError::Decode(_) => 502,
        }
    }

    /// Stable snake_case identifier, safe to match on in clients.
    pub fn kind(&self) -> &'static str {
        match self {
            GenerateError::Validation(e) => match e {
                ValidationError::WrongDeclaredType { .. } => "wrong_declared_type",
                ValidationError::TooLarge { .. } => "too_large",
                ValidationError::NotAnImage { .. } => "not_an_image",
                ValidationError::TooManyImages { .. } => "too_many_images",
                ValidationError::UnknownProvider(_) => "unknown_provider",
            },
            GenerateError::Provider(e) => match e {
                ProviderError::MissingCredential { .. } => "missing_credential",
                ProviderError::CallFailed { .. } => "call_failed",
            },
            GenerateError::Decode(e) => match e {
                DecodeError::MalformedJson(_) => "malformed_json",
                DecodeError::SchemaMismatch { .. } => "schema_mismatch",
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn too_large_display() {
        let e = ValidationError::TooLarge {
            size: 5_242_881,
            max: 5_242_880,
        };
        let msg = e.to_string();
        assert!(msg.contains("5242881"), "got: {msg}");
        assert!(msg.contains("5242880"), "got: {msg}");
    }

    #[test]
    fn missing_credential_display_names_provider() {
        let e = ProviderError::MissingCredential {
            provider: ProviderKind::OpenAi,
        };
        assert!(e.to_string().starts_with("openai key missing"));
    }

    #[test]
    fn schema_mismatch_display_has_path_and_detail() {
        let e = DecodeError::SchemaMismatch {
            path: "workflow[1].id".into(),
            detail: "duplicate node id \"a\"".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("workflow[1].id"));
        assert!(msg.contains("duplicate node id"));
    }

    #[test]
    fn validation_errors_are_client_errors() {
        let e: GenerateError = ValidationError::NotAnImage {
            declared: "image/png".into(),
        }
        .into();
        assert_eq!(e.class(), ErrorClass::ClientError);
        assert_eq!(e.status_code(), 400);
        assert_eq!(e.kind(), "not_an_image");

        let e: GenerateError = ValidationError::TooLarge { size: 2, max: 1 }.into();
        assert_eq!(e.status_code(), 413);
    }

    #[test]
    fn missing_credential_is_service_unavailable() {
        let e: GenerateError = ProviderError::MissingCredential {
            provider: ProviderKind::Gemini,
        }
        .into();
        assert_eq!(e.class(), ErrorClass::ServiceUnavailable);
        assert_eq!(e.status_code(), 502);
        assert_eq!(e.kind(), "missing_credential");
    }

    #[test]
    fn decode_errors_are_upstream_failures_with_detail() {
        let e: GenerateError = DecodeError::MalformedJson("expected value at line 1".into()).into();
        assert_eq!(e.class(), ErrorClass::UpstreamFailure);
        assert_eq!(e.status_code(), 502);
        assert!(e.to_string().contains("expected value at line 1"));
    }
}
