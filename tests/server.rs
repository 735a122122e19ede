//! HTTP tests for the axum router, driven through `axum-test`.
//!
//! Providers are stubbed in-process so these tests never leave the machine.

use async_trait::async_trait;
use axum::http::StatusCode;
use axum_test::multipart::{MultipartForm, Part};
use axum_test::TestServer;
use guiflow::server::{router, AppState, DslResponse};
use guiflow::{
    GeneratorConfig, Generator, ProviderError, ProviderKind, TemplateStore, VisionProvider,
    VisionRequest,
};
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use serde_json::Value;
use std::io::{Cursor, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

// ── Test helpers ─────────────────────────────────────────────────────────────

fn png_1x1() -> Vec<u8> {
    let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(1, 1, Rgba([0, 128, 255, 255])));
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .expect("encode png");
    buf
}

fn png_part(name: &str) -> Part {
    Part::bytes(png_1x1()).file_name(name).mime_type("image/png")
}

struct Canned {
    kind: ProviderKind,
    reply: &'static str,
    calls: AtomicUsize,
}

#[async_trait]
impl VisionProvider for Canned {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    async fn generate(&self, _request: &VisionRequest) -> Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.reply.to_string())
    }
}

fn canned(kind: ProviderKind, reply: &'static str) -> Arc<Canned> {
    Arc::new(Canned {
        kind,
        reply,
        calls: AtomicUsize::new(0),
    })
}

const WORKFLOW: &str = r#"{"workflow":[{"id":"open","title":"Open settings","prompt":"Click the gear icon.","inputs":[],"outputs":["settings_page"]}]}"#;

struct Harness {
    server: TestServer,
    gemini: Arc<Canned>,
    openai: Arc<Canned>,
    _templates: tempfile::NamedTempFile,
}

fn harness(config: GeneratorConfig) -> Harness {
    let gemini = canned(ProviderKind::Gemini, WORKFLOW);
    let openai = canned(ProviderKind::OpenAi, WORKFLOW);
    let generator = Generator::new(config)
        .unwrap()
        .with_provider(gemini.clone())
        .with_provider(openai.clone());

    let mut templates = tempfile::NamedTempFile::new().unwrap();
    templates
        .write_all(br#"[{"id":"login","title":"Login","dsl":{"workflow":[]}}]"#)
        .unwrap();

    let state = AppState {
        generator,
        templates: TemplateStore::new(templates.path()),
    };
    Harness {
        server: TestServer::new(router(state)).unwrap(),
        gemini,
        openai,
        _templates: templates,
    }
}

// ── generateDsl ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn generate_returns_dsl_envelope() {
    let h = harness(GeneratorConfig::default());

    let response = h
        .server
        .post("/api/generateDsl")
        .multipart(
            MultipartForm::new()
                .add_text("description", "open the settings page")
                .add_part("images", png_part("home.png")),
        )
        .await;

    response.assert_status_ok();
    let body: DslResponse = response.json();
    assert_eq!(body.dsl.len(), 1);
    assert_eq!(body.dsl.nodes()[0].id, "open");
    assert_eq!(h.gemini.calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.openai.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn model_query_selects_openai() {
    let h = harness(GeneratorConfig::default());

    let response = h
        .server
        .post("/api/generateDsl?model=openai")
        .multipart(
            MultipartForm::new()
                .add_text("description", "x")
                .add_part("images", png_part("a.png")),
        )
        .await;

    response.assert_status_ok();
    assert_eq!(h.openai.calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.gemini.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn model_form_field_is_honoured() {
    let h = harness(GeneratorConfig::default());

    let response = h
        .server
        .post("/api/generateDsl")
        .multipart(
            MultipartForm::new()
                .add_text("description", "x")
                .add_text("model", "openai")
                .add_part("images", png_part("a.png")),
        )
        .await;

    response.assert_status_ok();
    assert_eq!(h.openai.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn unknown_model_is_400() {
    let h = harness(GeneratorConfig::default());

    let response = h
        .server
        .post("/api/generateDsl?model=claude")
        .multipart(
            MultipartForm::new()
                .add_text("description", "x")
                .add_part("images", png_part("a.png")),
        )
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["kind"], "unknown_provider");
    assert_eq!(body["class"], "client_error");
    assert!(body["detail"].as_str().unwrap().contains("claude"));
}

#[tokio::test]
async fn non_image_upload_is_400_with_detail() {
    let h = harness(GeneratorConfig::default());

    let response = h
        .server
        .post("/api/generateDsl")
        .multipart(
            MultipartForm::new()
                .add_text("description", "x")
                .add_part(
                    "images",
                    Part::bytes(b"%PDF-1.7\n".as_slice())
                        .file_name("doc.pdf")
                        .mime_type("application/pdf"),
                ),
        )
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["kind"], "wrong_declared_type");
    assert!(body["detail"].as_str().unwrap().contains("application/pdf"));
    assert_eq!(h.gemini.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn too_many_images_is_400() {
    let config = GeneratorConfig::builder().max_images(1).build().unwrap();
    let h = harness(config);

    let response = h
        .server
        .post("/api/generateDsl")
        .multipart(
            MultipartForm::new()
                .add_text("description", "x")
                .add_part("images", png_part("a.png"))
                .add_part("images", png_part("b.png")),
        )
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["kind"], "too_many_images");
    assert_eq!(h.gemini.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn oversized_image_is_413() {
    let config = GeneratorConfig::builder()
        .max_upload_bytes(16)
        .build()
        .unwrap();
    let h = harness(config);

    let response = h
        .server
        .post("/api/generateDsl")
        .multipart(
            MultipartForm::new()
                .add_text("description", "x")
                .add_part("images", png_part("a.png")),
        )
        .await;

    response.assert_status(StatusCode::PAYLOAD_TOO_LARGE);
    let body: Value = response.json();
    assert_eq!(body["kind"], "too_large");
}

#[tokio::test]
async fn body_over_router_limit_is_413() {
    // Router limit is max_images * max_upload_bytes + 1 MiB.
    let config = GeneratorConfig::builder()
        .max_images(1)
        .max_upload_bytes(16)
        .build()
        .unwrap();
    let h = harness(config);

    let response = h
        .server
        .post("/api/generateDsl")
        .multipart(
            MultipartForm::new()
                .add_text("description", "x")
                .add_part(
                    "images",
                    Part::bytes(vec![0u8; 2 * 1024 * 1024])
                        .file_name("huge.png")
                        .mime_type("image/png"),
                ),
        )
        .await;

    response.assert_status(StatusCode::PAYLOAD_TOO_LARGE);
    let body: Value = response.json();
    assert_eq!(body["kind"], "too_large");
    assert_eq!(body["class"], "client_error");
    assert_eq!(h.gemini.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn missing_description_is_400() {
    let h = harness(GeneratorConfig::default());

    let response = h
        .server
        .post("/api/generateDsl")
        .multipart(MultipartForm::new().add_part("images", png_part("a.png")))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["kind"], "missing_field");
}

#[tokio::test]
async fn no_images_is_400() {
    let h = harness(GeneratorConfig::default());

    let response = h
        .server
        .post("/api/generateDsl")
        .multipart(MultipartForm::new().add_text("description", "x"))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["kind"], "no_images");
}

#[tokio::test]
async fn missing_credential_is_502() {
    // No stub: the real Gemini adapter runs with no key configured.
    let state = AppState {
        generator: Generator::new(GeneratorConfig::default()).unwrap(),
        templates: TemplateStore::default(),
    };
    let server = TestServer::new(router(state)).unwrap();

    let response = server
        .post("/api/generateDsl")
        .multipart(
            MultipartForm::new()
                .add_text("description", "x")
                .add_part("images", png_part("a.png")),
        )
        .await;

    response.assert_status(StatusCode::BAD_GATEWAY);
    let body: Value = response.json();
    assert_eq!(body["kind"], "missing_credential");
    assert_eq!(body["class"], "service_unavailable");
}

// ── templates / health ───────────────────────────────────────────────────────

#[tokio::test]
async fn templates_are_served_verbatim() {
    let h = harness(GeneratorConfig::default());

    let response = h.server.get("/api/templates").await;

    response.assert_status_ok();
    assert_eq!(
        response.text(),
        r#"[{"id":"login","title":"Login","dsl":{"workflow":[]}}]"#
    );
}

#[tokio::test]
async fn missing_templates_file_is_404() {
    let state = AppState {
        generator: Generator::new(GeneratorConfig::default()).unwrap(),
        templates: TemplateStore::new("/nonexistent/guiflow/templates.json"),
    };
    let server = TestServer::new(router(state)).unwrap();

    let response = server.get("/api/templates").await;

    response.assert_status(StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert_eq!(body["kind"], "templates_unavailable");
}

#[tokio::test]
async fn health_is_ok() {
    let h = harness(GeneratorConfig::default());
    let response = h.server.get("/health").await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["status"], "ok");
}
