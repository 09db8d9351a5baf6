//! Reply bot: Lambda bootstrap and local runner.
//!
//! Usage:
//!   bootstrap                        Run the Lambda runtime loop (default)
//!   bootstrap serve                  Same, explicitly
//!   bootstrap invoke --event FILE    Process one queue event from a JSON file
//!   bootstrap invoke --post TEXT --post-id ID [--tone T] [--min-char-count N]

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use lambda_runtime::{service_fn, LambdaEvent};
use std::path::PathBuf;
use tracing::{info, info_span, Instrument};

use reply_bot::agent;
use reply_bot::types::{Envelope, InboundMessage};

// ---------------------------------------------------------------------------
// CLI definition
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(name = "bootstrap")]
#[command(version = "0.1.0")]
#[command(about = "Draft a reply to an X post with an LLM and post it")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (debug, info, warn, error). RUST_LOG takes precedence.
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the Lambda runtime loop.
    Serve,

    /// Process a single event locally and print the response envelope.
    Invoke {
        /// Path to a queue event JSON file.
        #[arg(long, conflicts_with_all = ["post", "post_id"])]
        event: Option<PathBuf>,

        /// Post text to reply to.
        #[arg(long, requires = "post_id")]
        post: Option<String>,

        /// Id of the post to reply to.
        #[arg(long, requires = "post")]
        post_id: Option<String>,

        /// Reply tone.
        #[arg(long)]
        tone: Option<String>,

        /// Minimum reply length in characters.
        #[arg(long)]
        min_char_count: Option<String>,
    },
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            // CloudWatch-friendly structured output
            tracing_subscriber::fmt()
                .json()
                .with_env_filter(env_filter)
                .with_current_span(true)
                .with_target(false)
                .init();
            cmd_serve().await
        }
        Commands::Invoke {
            event,
            post,
            post_id,
            tone,
            min_char_count,
        } => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
            dotenvy::dotenv().ok();

            let payload = match (event, post, post_id) {
                (Some(path), _, _) => read_event(&path).await?,
                (None, Some(post), Some(post_id)) => {
                    let mut message = InboundMessage::new(post, post_id);
                    message.tone = tone;
                    message.min_char_count = min_char_count;
                    queue_event(&message)?
                }
                _ => bail!("invoke needs either --event or --post with --post-id"),
            };
            cmd_invoke(payload).await
        }
    }
}

// ---------------------------------------------------------------------------
// Command implementations
// ---------------------------------------------------------------------------

async fn cmd_serve() -> Result<()> {
    info!("Starting Lambda runtime");
    lambda_runtime::run(service_fn(function_handler))
        .await
        .map_err(|e| anyhow::anyhow!("Lambda runtime error: {e}"))
}

/// Lambda entry: the envelope is always returned as a successful invocation.
async fn function_handler(
    event: LambdaEvent<serde_json::Value>,
) -> std::result::Result<Envelope, lambda_runtime::Error> {
    let LambdaEvent { payload, context } = event;
    let span = info_span!("invocation", request_id = %context.request_id);
    Ok(agent::handle_invocation(&payload).instrument(span).await)
}

async fn cmd_invoke(payload: serde_json::Value) -> Result<()> {
    let request_id = format!("local-{}", ulid::Ulid::new());
    let span = info_span!("invocation", request_id = %request_id);
    let envelope = agent::handle_invocation(&payload).instrument(span).await;

    let body: serde_json::Value =
        serde_json::from_str(&envelope.body).context("Envelope body is not JSON")?;

    println!();
    if envelope.is_success() {
        println!("{} {}", ">>>".green().bold(), envelope.status_code);
    } else {
        println!("{} {}", "<<<".red().bold(), envelope.status_code);
    }
    println!("{}", serde_json::to_string_pretty(&body)?);

    if !envelope.is_success() {
        std::process::exit(1);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn read_event(path: &std::path::Path) -> Result<serde_json::Value> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read event file {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("Event file {} is not valid JSON", path.display()))
}

/// Wrap a message the way the queue delivers it.
fn queue_event(message: &InboundMessage) -> Result<serde_json::Value> {
    let body = serde_json::to_string(message).context("Failed to encode message")?;
    Ok(serde_json::json!({
        "Records": [{ "messageId": "local", "body": body }]
    }))
}
