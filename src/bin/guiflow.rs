//! CLI binary for guiflow.
//!
//! A thin shim over the library crate: flags map to `GeneratorConfig`,
//! `generate` runs one request over local files, `serve` starts the HTTP API.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use guiflow::{GenerateRequest, Generator, GeneratorConfig, ProviderKind, UploadedImage};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Workflow from two screenshots (Gemini, stdout)
  guiflow generate -d "log in and change the avatar" login.png profile.png

  # Use OpenAI and write the HTTP-style envelope to a file
  guiflow generate -m openai --envelope -d "checkout flow" cart.png -o flow.json

  # Run the HTTP API
  guiflow serve --addr 0.0.0.0:8000 --templates templates/tars_routes.json

ENVIRONMENT VARIABLES:
  LLM_KEY_GEMINI           Google Gemini API key
  LLM_KEY_OPENAI           OpenAI API key
  MAX_UPLOAD_MB            Per-image upload limit in MiB (default 5)
  MAX_IMAGES               Images per request (default 10)
  GUIFLOW_OPENAI_MODEL     Chat-completions model (default gpt-4o)
  GUIFLOW_GEMINI_MODEL     Generate-content model (default gemini-1.5-flash-latest)
  GUIFLOW_OPENAI_BASE_URL  OpenAI-compatible endpoint
  GUIFLOW_GEMINI_BASE_URL  Gemini REST endpoint
  GUIFLOW_TIMEOUT_SECS     Provider call timeout (default 120)
  RUST_LOG                 Log filter, overrides --verbose/--quiet
"#;

/// Generate GUI-agent workflows from screenshots using multimodal LLMs.
#[derive(Parser, Debug)]
#[command(
    name = "guiflow",
    version,
    about = "Generate GUI-agent workflow DSL from screenshots using multimodal LLMs",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    provider: ProviderArgs,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "GUIFLOW_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "GUIFLOW_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a workflow from local screenshot files.
    Generate(GenerateArgs),

    /// Serve `POST /api/generateDsl` and `GET /api/templates` over HTTP.
    #[cfg(feature = "server")]
    Serve(ServeArgs),
}

#[derive(Args, Debug)]
struct ProviderArgs {
    /// Gemini API key.
    #[arg(long, global = true, env = "LLM_KEY_GEMINI", hide_env_values = true)]
    gemini_key: Option<String>,

    /// OpenAI API key.
    #[arg(long, global = true, env = "LLM_KEY_OPENAI", hide_env_values = true)]
    openai_key: Option<String>,

    /// Maximum size of one image in MiB.
    #[arg(long, global = true, env = "MAX_UPLOAD_MB", default_value_t = 5)]
    max_upload_mb: usize,

    /// Maximum number of images per request.
    #[arg(long, global = true, env = "MAX_IMAGES", default_value_t = 10)]
    max_images: usize,

    /// OpenAI chat-completions model.
    #[arg(long, global = true, env = "GUIFLOW_OPENAI_MODEL")]
    openai_model: Option<String>,

    /// Gemini generate-content model.
    #[arg(long, global = true, env = "GUIFLOW_GEMINI_MODEL")]
    gemini_model: Option<String>,

    /// OpenAI-compatible base URL (e.g. a local proxy).
    #[arg(long, global = true, env = "GUIFLOW_OPENAI_BASE_URL")]
    openai_base_url: Option<String>,

    /// Gemini REST base URL.
    #[arg(long, global = true, env = "GUIFLOW_GEMINI_BASE_URL")]
    gemini_base_url: Option<String>,

    /// Provider call timeout in seconds.
    #[arg(long, global = true, env = "GUIFLOW_TIMEOUT_SECS", default_value_t = 120)]
    timeout: u64,

    /// LLM temperature (0.0–2.0).
    #[arg(long, global = true, env = "GUIFLOW_TEMPERATURE", default_value_t = 0.2)]
    temperature: f32,

    /// Path to a text file containing a custom system prompt.
    #[arg(long, global = true, env = "GUIFLOW_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct GenerateArgs {
    /// Scenario description sent with the screenshots.
    #[arg(short, long)]
    description: String,

    /// Provider to use.
    #[arg(short, long, value_enum, default_value = "gemini")]
    model: ModelArg,

    /// Write the JSON to this file instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Wrap the workflow as `{"dsl": ...}`, like the HTTP API.
    #[arg(long)]
    envelope: bool,

    /// Disable the spinner.
    #[arg(long, env = "GUIFLOW_NO_PROGRESS")]
    no_progress: bool,

    /// Screenshot files (PNG, JPEG, GIF, WebP, BMP).
    #[arg(required = true)]
    images: Vec<PathBuf>,
}

#[cfg(feature = "server")]
#[derive(Args, Debug)]
struct ServeArgs {
    /// Address to listen on.
    #[arg(long, env = "GUIFLOW_ADDR", default_value = "0.0.0.0:8000")]
    addr: std::net::SocketAddr,

    /// Templates JSON file served at `/api/templates`.
    #[arg(long, env = "GUIFLOW_TEMPLATES", default_value = guiflow::templates::DEFAULT_TEMPLATES_PATH)]
    templates: PathBuf,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum ModelArg {
    Gemini,
    Openai,
}

impl From<ModelArg> for ProviderKind {
    fn from(v: ModelArg) -> Self {
        match v {
            ModelArg::Gemini => ProviderKind::Gemini,
            ModelArg::Openai => ProviderKind::OpenAi,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let config = build_config(&cli.provider).await?;
    let generator = Generator::new(config).context("Failed to initialise providers")?;

    match cli.command {
        Command::Generate(args) => run_generate(&generator, args, cli.quiet).await,
        #[cfg(feature = "server")]
        Command::Serve(args) => {
            let state = guiflow::server::AppState {
                generator,
                templates: guiflow::TemplateStore::new(args.templates),
            };
            guiflow::server::serve(args.addr, state)
                .await
                .with_context(|| format!("Server on {} failed", args.addr))
        }
    }
}

async fn run_generate(generator: &Generator, args: GenerateArgs, quiet: bool) -> Result<()> {
    let mut request = GenerateRequest::new(args.description, args.model.into());
    for path in &args.images {
        let data = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read image {}", path.display()))?;
        let mut upload = UploadedImage::new(declared_type(path), data);
        if let Some(name) = path.file_name() {
            upload = upload.with_file_name(name.to_string_lossy());
        }
        request = request.image(upload);
    }

    let spinner = (!quiet && !args.no_progress).then(|| {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
        );
        bar.set_prefix("Generating");
        bar.set_message(format!(
            "{} image(s) → {}",
            request.images.len(),
            request.provider
        ));
        bar.enable_steady_tick(Duration::from_millis(80));
        bar
    });

    let start = Instant::now();
    let result = generator.generate(request).await;
    if let Some(bar) = &spinner {
        bar.finish_and_clear();
    }
    let workflow = result.context("Generation failed")?;

    let json = if args.envelope {
        serde_json::to_string_pretty(&serde_json::json!({ "dsl": &workflow }))
    } else {
        serde_json::to_string_pretty(&workflow)
    }
    .context("Failed to serialise workflow")?;

    match &args.output {
        Some(path) => {
            tokio::fs::write(path, format!("{json}\n"))
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
        }
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            writeln!(handle, "{json}").context("Failed to write to stdout")?;
        }
    }

    if !quiet {
        eprintln!(
            "{} {} nodes  {}",
            green("✔"),
            workflow.len(),
            dim(&format!("{:.1}s", start.elapsed().as_secs_f64())),
        );
    }
    Ok(())
}

/// Map CLI args to `GeneratorConfig`.
async fn build_config(args: &ProviderArgs) -> Result<GeneratorConfig> {
    let mut builder = GeneratorConfig::builder()
        .max_upload_bytes(args.max_upload_mb.saturating_mul(guiflow::config::MIB))
        .max_images(args.max_images)
        .request_timeout_secs(args.timeout)
        .temperature(args.temperature);

    if let Some(ref key) = args.gemini_key {
        builder = builder.gemini_api_key(key.clone());
    }
    if let Some(ref key) = args.openai_key {
        builder = builder.openai_api_key(key.clone());
    }
    if let Some(ref model) = args.openai_model {
        builder = builder.openai_model(model.clone());
    }
    if let Some(ref model) = args.gemini_model {
        builder = builder.gemini_model(model.clone());
    }
    if let Some(ref url) = args.openai_base_url {
        builder = builder.openai_base_url(url.clone());
    }
    if let Some(ref url) = args.gemini_base_url {
        builder = builder.gemini_base_url(url.clone());
    }
    if let Some(ref path) = args.system_prompt {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read system prompt from {:?}", path))?;
        builder = builder.system_prompt(prompt);
    }

    builder.build().context("Invalid configuration")
}

/// Content type a browser would declare for this file name.
fn declared_type(path: &Path) -> String {
    mime_guess::from_path(path).first_or_octet_stream().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declared_type_follows_extension() {
        assert_eq!(declared_type(Path::new("shots/login.PNG")), "image/png");
        assert_eq!(declared_type(Path::new("a.jpg")), "image/jpeg");
        assert_eq!(declared_type(Path::new("a.webp")), "image/webp");
        assert_eq!(declared_type(Path::new("notes")), "application/octet-stream");
    }
}
