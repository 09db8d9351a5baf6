//! Reply prompt construction.
//!
//! The template is plain text with `{name}` placeholders (`{{` and `}}` are
//! literal braces). Only the names in [`PLACEHOLDERS`] are recognized; the
//! rendered result is sent as the single system-role instruction.

use crate::error::{ReplyError, Result};
use crate::types::InboundMessage;
use std::path::Path;
use tracing::{debug, error, info};

/// Placeholder names a template may reference.
pub const PLACEHOLDERS: &[&str] = &["post", "tone", "min_char_count"];

/// Used when the template file cannot be read.
pub const FALLBACK_TEMPLATE: &str = "You are a social media manager.\n\
Create a friendly reply to: {post}\n\
Tone: {tone}\n\
Write at least {min_char_count} characters.";

/// Read the prompt template, falling back to [`FALLBACK_TEMPLATE`].
///
/// Never fails; a read error is logged and the fallback returned.
pub fn load_prompt_template(path: &Path) -> String {
    match std::fs::read_to_string(path) {
        Ok(template) => {
            debug!("Loaded prompt template from {:?} ({} chars)", path, template.len());
            template
        }
        Err(e) => {
            error!("Error loading reply prompt template {:?}: {}", path, e);
            FALLBACK_TEMPLATE.to_string()
        }
    }
}

/// Fill `template` from `message`.
///
/// `tone` and `min_char_count` fall back to their defaults when the message
/// leaves them out. Unknown or malformed placeholders are a template error.
pub fn build_prompt(message: &InboundMessage, template: &str) -> Result<String> {
    info!("Starting reply prompt building");

    let prompt = render(template, |name| match name {
        "post" => Some(message.post.as_str()),
        "tone" => Some(message.tone()),
        "min_char_count" => Some(message.min_char_count()),
        _ => None,
    })?;

    info!("Prompt building completed ({} chars)", prompt.len());
    debug!(prompt = %prompt, "Rendered prompt");
    Ok(prompt)
}

fn render<'a, F>(template: &str, lookup: F) -> Result<String>
where
    F: Fn(&str) -> Option<&'a str>,
{
    let mut out = String::with_capacity(template.len() + 256);
    let mut chars = template.char_indices().peekable();

    while let Some((pos, c)) = chars.next() {
        match c {
            '{' if chars.peek().map(|&(_, n)| n) == Some('{') => {
                chars.next();
                out.push('{');
            }
            '{' => {
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some((_, '}')) => break,
                        Some((_, '{')) | None => {
                            return Err(ReplyError::Template(format!(
                                "unclosed '{{' at byte {pos}"
                            )));
                        }
                        Some((_, ch)) => name.push(ch),
                    }
                }
                if name.is_empty() {
                    return Err(ReplyError::Template(format!(
                        "positional placeholder '{{}}' at byte {pos}; use a named placeholder"
                    )));
                }
                let value = lookup(&name).ok_or_else(|| {
                    ReplyError::Template(format!(
                        "unknown placeholder '{{{name}}}'; expected one of {}",
                        PLACEHOLDERS.join(", ")
                    ))
                })?;
                out.push_str(value);
            }
            '}' if chars.peek().map(|&(_, n)| n) == Some('}') => {
                chars.next();
                out.push('}');
            }
            '}' => {
                return Err(ReplyError::Template(format!(
                    "single '}}' at byte {pos}; use '}}}}' for a literal brace"
                )));
            }
            c => out.push(c),
        }
    }

    Ok(out)
}
