//! Reply bot: drafts and posts replies to X posts.
//!
//! A queued message names a post; the handler sanitizes its text, renders a
//! prompt, asks an OpenAI-compatible model for a reply, and posts that reply
//! back to X under the configured account.

pub mod agent;
pub mod config;
pub mod error;
pub mod openai;
pub mod social;
pub mod types;

pub use error::{ErrorKind, ReplyError, Result};
