//! Event handler: one queued event in, one response envelope out.
//!
//! Steps, each short-circuiting on failure:
//! 1. Parse the first queue record into an inbound message
//! 2. Sanitize the post text
//! 3. Load the prompt template (falls back, never fails)
//! 4. Render the prompt
//! 5. Generate the reply
//! 6. Post the reply
//!
//! Any failure becomes a 500 envelope; nothing escapes the handler.

use crate::agent::{injection_defense, system_prompt};
use crate::config::{self, ReplyConfig};
use crate::error::{ReplyError, Result};
use crate::openai::{InferenceClient, TextGenerator};
use crate::social::{self, PlatformClient, XClient};
use crate::types::*;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, error, info};

/// Message returned in the success envelope.
pub const SUCCESS_MESSAGE: &str = "Successfully posted a reply to X post";

/// Generation cap; a post is at most 280 characters anyway.
pub const MAX_REPLY_TOKENS: u32 = 280;

/// Sampling temperature for reply generation.
pub const TEMPERATURE: f64 = 0.7;

/// Builds the external clients for one invocation.
pub trait ClientFactory: Send + Sync {
    fn generator(&self, config: &ReplyConfig) -> Result<Box<dyn TextGenerator>>;
    fn platform(&self, config: &ReplyConfig) -> Result<Box<dyn PlatformClient>>;
}

/// Production factory: fresh HTTP clients from config on every call.
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpClientFactory;

impl ClientFactory for HttpClientFactory {
    fn generator(&self, config: &ReplyConfig) -> Result<Box<dyn TextGenerator>> {
        let client = InferenceClient::new(
            &config.openai_base_url,
            config.require_openai_key()?,
            Duration::from_secs(config.request_timeout_secs),
        )?;
        Ok(Box::new(client))
    }

    fn platform(&self, config: &ReplyConfig) -> Result<Box<dyn PlatformClient>> {
        let client = XClient::new(
            &config.x_api_base_url,
            config.require_x_credentials()?,
            Duration::from_secs(config.request_timeout_secs),
            config.x_dry_run,
        )?;
        Ok(Box::new(client))
    }
}

/// What a successful invocation produced.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplyOutcome {
    pub post_id: String,
    pub reply_id: String,
    pub content: String,
    pub usage: TokenUsage,
}

/// Extract the inbound message from the first record of a queue event.
pub fn parse_event(event: &serde_json::Value) -> Result<InboundMessage> {
    let event = QueueEvent::deserialize(event)
        .map_err(|e| ReplyError::Parse(format!("malformed queue event: {e}")))?;

    let record = event
        .records
        .into_iter()
        .next()
        .ok_or_else(|| ReplyError::Parse("queue event contains no records".to_string()))?;

    if let Some(id) = &record.message_id {
        debug!("Processing queue message {}", id);
    }

    let message: InboundMessage = serde_json::from_str(&record.body)
        .map_err(|e| ReplyError::Parse(format!("invalid message body: {e}")))?;

    if message.post_id.trim().is_empty() {
        return Err(ReplyError::Parse("post_id must not be empty".to_string()));
    }

    Ok(message)
}

/// Run the pipeline and return the tagged result.
pub async fn process_event(
    event: &serde_json::Value,
    config: &ReplyConfig,
    clients: &dyn ClientFactory,
) -> Result<ReplyOutcome> {
    let mut message = parse_event(event)?;
    info!(
        post_id = %message.post_id,
        tone = %message.tone(),
        min_char_count = %message.min_char_count(),
        "Processing reply message"
    );

    message.post = injection_defense::sanitize(Some(&message.post));

    let template = system_prompt::load_prompt_template(Path::new(&config.resolved_template_path()));
    let prompt = system_prompt::build_prompt(&message, &template)?;

    let generator = clients.generator(config)?;
    let generation = generator
        .generate(&GenerationRequest {
            model: config.openai_model.clone(),
            prompt,
            max_tokens: MAX_REPLY_TOKENS,
            temperature: TEMPERATURE,
        })
        .await?;
    let content = generation.content.trim().to_string();
    if content.is_empty() {
        return Err(ReplyError::Generation(
            "model returned empty content".to_string(),
        ));
    }
    debug!(reply = %content, "Generated reply");

    let platform = clients.platform(config)?;
    let reply_id = social::post_reply(platform.as_ref(), &content, &message.post_id).await?;

    Ok(ReplyOutcome {
        post_id: message.post_id,
        reply_id,
        content,
        usage: generation.usage,
    })
}

/// Run the pipeline and render the result as a response envelope.
pub async fn handle_event(
    event: &serde_json::Value,
    config: &ReplyConfig,
    clients: &dyn ClientFactory,
) -> Envelope {
    info!(state = %HandlerState::Received, "Starting reply execution");

    match process_event(event, config, clients).await {
        Ok(outcome) => {
            info!(
                state = %HandlerState::Processed,
                post_id = %outcome.post_id,
                reply_id = %outcome.reply_id,
                completion_tokens = outcome.usage.completion_tokens,
                "Reply posted"
            );
            Envelope::success(SUCCESS_MESSAGE)
        }
        Err(e) => fail(&e),
    }
}

/// Handle an event with configuration from the process environment and the
/// production HTTP clients.
pub async fn handle_invocation(event: &serde_json::Value) -> Envelope {
    match config::from_env() {
        Ok(config) => handle_event(event, &config, &HttpClientFactory).await,
        Err(e) => fail(&e),
    }
}

fn fail(e: &ReplyError) -> Envelope {
    error!(
        state = %HandlerState::Failed,
        kind = %e.kind(),
        error = %e,
        "Error in reply execution"
    );
    Envelope::failure(&e.to_string())
}
