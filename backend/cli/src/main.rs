mod extract_cmd;
mod models_cmd;
mod status_cmd;
mod terminal_output;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use textlens_config::Settings;
use textlens_core::{GenerateOptions, InferenceClient, OutputFormat, VisionClassifier};
use textlens_gateway::GatewayState;
use textlens_logging::{init_logger, ConsoleTarget, LogOptions};
use textlens_understanding::{classifier_by_name, OllamaClient, PipelineOptions, StatusChecker};

use extract_cmd::ExtractArgs;

#[derive(Parser)]
#[command(name = "textlens")]
#[command(about = "Extract text from images with local vision models")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP gateway
    Serve {
        /// Port to bind the HTTP server to
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Check the inference server and its vision models
    Status,
    /// List installed vision models, recommended first
    Models,
    /// Extract text from an image file
    Extract {
        image: PathBuf,
        /// Model identifier, e.g. gemma3:4b
        #[arg(short, long)]
        model: String,
        /// Instruction sent with the image
        #[arg(short, long)]
        prompt: Option<String>,
        /// text, json or markdown
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
        /// Wait for the full response instead of streaming it
        #[arg(long)]
        no_stream: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let console = match cli.command {
        Commands::Serve { .. } => ConsoleTarget::Stdout,
        _ => ConsoleTarget::Stderr,
    };
    init_logger(&log_options(console));
    let settings = textlens_config::load_settings()?;

    match cli.command {
        Commands::Serve { port } => {
            let settings = Settings {
                port: port.unwrap_or(settings.port),
                ..settings
            };
            run_server(settings).await?;
        }
        Commands::Status => {
            let checker = build_checker(&settings)?;
            status_cmd::run(&checker, &settings.server_address).await?;
        }
        Commands::Models => {
            let checker = Arc::new(build_checker(&settings)?);
            models_cmd::run(checker, &settings.preferred_family).await?;
        }
        Commands::Extract {
            image,
            model,
            prompt,
            format,
            no_stream,
        } => {
            let args = ExtractArgs {
                image,
                model,
                prompt,
                format,
                stream: !no_stream,
            };
            extract_cmd::run(build_client(&settings), pipeline_options(&settings), args).await?;
        }
    }

    Ok(())
}

/// Logging comes up before settings so config warnings are visible.
fn log_options(console: ConsoleTarget) -> LogOptions {
    LogOptions {
        level: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        log_dir: std::env::var_os("TEXTLENS_LOG_DIR").map(PathBuf::from),
        console,
    }
}

fn build_client(settings: &Settings) -> Arc<dyn InferenceClient> {
    Arc::new(
        OllamaClient::new()
            .with_base_url(&settings.server_address)
            .with_timeouts(settings.status_timeout(), settings.generate_timeout()),
    )
}

fn vision_classifier(settings: &Settings) -> Result<Arc<dyn VisionClassifier>> {
    classifier_by_name(&settings.vision_classifier)
        .with_context(|| format!("unknown vision classifier '{}'", settings.vision_classifier))
}

fn build_checker(settings: &Settings) -> Result<StatusChecker> {
    Ok(StatusChecker::with_classifier(
        build_client(settings),
        vision_classifier(settings)?,
    ))
}

fn pipeline_options(settings: &Settings) -> PipelineOptions {
    PipelineOptions {
        max_image_bytes: settings.max_image_bytes,
        generate: GenerateOptions {
            temperature: settings.temperature,
            num_predict: settings.num_predict,
        },
    }
}

async fn run_server(settings: Settings) -> Result<()> {
    let listen = settings.listen_address();
    let addr = tokio::net::lookup_host(&listen)
        .await
        .with_context(|| format!("invalid listen address {listen}"))?
        .next()
        .with_context(|| format!("no address found for {listen}"))?;

    info!(
        addr = %addr,
        server = %settings.server_address,
        preferred_family = %settings.preferred_family,
        classifier = %settings.vision_classifier,
        max_image_bytes = settings.max_image_bytes,
        "Starting textlens gateway"
    );

    let state = GatewayState::new(
        build_client(&settings),
        pipeline_options(&settings),
        vision_classifier(&settings)?,
        &settings.preferred_family,
    );
    textlens_gateway::start_server(addr, state).await
}
