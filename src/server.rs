//! HTTP surface for the generator (feature `server`).
//!
//! | Route | Description |
//! |-------|-------------|
//! | `POST /api/generateDsl?model=gemini\|openai` | multipart `description` + `images` → `{"dsl": Workflow}` |
//! | `GET /api/templates` | the templates file, verbatim |
//! | `GET /health` | `{"status": "ok"}` |
//!
//! Errors are returned as `{"detail": <message>, "kind": <machine kind>, "class": <class>}`
//! with the status from [`GenerateError::status_code`].
//!
//! Images are counted while the multipart stream is read: once `max_images`
//! files have arrived, the next `images` field is rejected before its body is
//! pulled off the wire.

use crate::config::ProviderKind;
use crate::error::{GenerateError, ValidationError};
use crate::generate::{GenerateRequest, Generator};
use crate::pipeline::validate::UploadedImage;
use crate::templates::{TemplateError, TemplateStore};
use crate::workflow::Workflow;
use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Slack on top of the image bytes for the description and multipart framing.
const BODY_OVERHEAD_BYTES: usize = 1024 * 1024;

/// Shared, read-only server state.
#[derive(Debug, Clone)]
pub struct AppState {
    pub generator: Generator,
    pub templates: TemplateStore,
}

/// Successful `generateDsl` response envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct DslResponse {
    pub dsl: Workflow,
}

#[derive(Debug, Deserialize)]
struct GenerateQuery {
    model: Option<String>,
}

/// Errors a handler can return.
#[derive(Debug)]
pub enum ApiError {
    Generate(GenerateError),
    BadRequest { kind: &'static str, message: String },
    /// The whole request exceeded the router's body limit.
    PayloadTooLarge { message: String },
    Templates(TemplateError),
}

impl From<GenerateError> for ApiError {
    fn from(e: GenerateError) -> Self {
        ApiError::Generate(e)
    }
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        ApiError::Generate(e.into())
    }
}

impl From<MultipartError> for ApiError {
    fn from(e: MultipartError) -> Self {
        // The body limit surfaces here, mid-stream, as a multipart error.
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return ApiError::PayloadTooLarge {
                message: format!("Request body too large: {}", e.body_text()),
            };
        }
        ApiError::BadRequest {
            kind: "bad_multipart",
            message: format!("Failed to parse multipart data: {}", e.body_text()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            ApiError::Generate(e) => (
                StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                json!({"detail": e.to_string(), "kind": e.kind(), "class": e.class()}),
            ),
            ApiError::BadRequest { kind, message } => (
                StatusCode::BAD_REQUEST,
                json!({"detail": message, "kind": kind, "class": "client_error"}),
            ),
            ApiError::PayloadTooLarge { message } => (
                StatusCode::PAYLOAD_TOO_LARGE,
                json!({"detail": message, "kind": "too_large", "class": "client_error"}),
            ),
            ApiError::Templates(e) => {
                let status = match e {
                    TemplateError::NotFound { .. } => StatusCode::NOT_FOUND,
                    TemplateError::Io { .. } => StatusCode::INTERNAL_SERVER_ERROR,
                };
                if status.is_server_error() {
                    error!("{}", e);
                }
                (
                    status,
                    json!({"detail": "Templates are unavailable", "kind": "templates_unavailable"}),
                )
            }
        };
        (status, Json(body)).into_response()
    }
}

/// Build the router.
pub fn router(state: AppState) -> Router {
    let config = state.generator.config();
    let body_limit = config
        .max_images
        .saturating_mul(config.max_upload_bytes)
        .saturating_add(BODY_OVERHEAD_BYTES);

    Router::new()
        .route("/api/generateDsl", post(generate_dsl))
        .route("/api/templates", get(templates))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(Arc::new(state))
}

/// Bind `addr` and serve until Ctrl-C.
pub async fn serve(addr: SocketAddr, state: AppState) -> std::io::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("HTTP server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}

async fn generate_dsl(
    State(state): State<Arc<AppState>>,
    Query(query): Query<GenerateQuery>,
    mut multipart: Multipart,
) -> Result<Json<DslResponse>, ApiError> {
    let max_images = state.generator.config().max_images;

    let mut description: Option<String> = None;
    let mut model_field: Option<String> = None;
    let mut images: Vec<UploadedImage> = Vec::new();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "description" => description = Some(field.text().await?),
            "model" => model_field = Some(field.text().await?),
            "images" | "images[]" => {
                if images.len() == max_images {
                    return Err(ValidationError::TooManyImages {
                        count: images.len() + 1,
                        max: max_images,
                    }
                    .into());
                }
                let declared = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let file_name = field.file_name().map(str::to_string);
                let data = field.bytes().await?;

                let mut upload = UploadedImage::new(declared, data);
                if let Some(file_name) = file_name {
                    upload = upload.with_file_name(file_name);
                }
                images.push(upload);
            }
            other => debug!("Ignoring multipart field '{}'", other),
        }
    }

    let description = description.ok_or_else(|| ApiError::BadRequest {
        kind: "missing_field",
        message: "Missing form field 'description'".to_string(),
    })?;
    if images.is_empty() {
        return Err(ApiError::BadRequest {
            kind: "no_images",
            message: "At least one file is required in field 'images'".to_string(),
        });
    }

    let provider = match query.model.or(model_field) {
        Some(model) => model.parse::<ProviderKind>()?,
        None => ProviderKind::default(),
    };

    let workflow = state
        .generator
        .generate(GenerateRequest {
            description,
            images,
            provider,
        })
        .await?;

    Ok(Json(DslResponse { dsl: workflow }))
}

async fn templates(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    let body = state.templates.load().await.map_err(ApiError::Templates)?;
    Ok(([(header::CONTENT_TYPE, "application/json")], body).into_response())
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({"status": "ok"}))
}
