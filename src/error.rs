//! Error taxonomy for the reply pipeline.

use std::fmt;
use thiserror::Error;

/// Result type for reply pipeline operations.
pub type Result<T> = std::result::Result<T, ReplyError>;

/// Every way an invocation can fail. The handler renders all of them into the
/// same failure envelope; [`ReplyError::kind`] lets callers and logs branch.
#[derive(Debug, Error)]
pub enum ReplyError {
    /// Malformed event envelope or message body
    #[error("Parse error: {0}")]
    Parse(String),

    /// Template references an unknown placeholder or is malformed
    #[error("Template error: {0}")]
    Template(String),

    /// Generation API failure
    #[error("Generation error: {0}")]
    Generation(String),

    /// Platform rejected the credentials
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Credentials are valid but cannot post
    #[error("Permission error: {0}")]
    Permission(String),

    /// Any other platform-side rejection
    #[error("X API error ({status}): {message}")]
    Platform {
        /// HTTP status code, 0 when the request never got a response
        status: u16,
        /// Platform error detail
        message: String,
    },

    /// Required configuration is missing or invalid
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Discriminant of [`ReplyError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Parse,
    Template,
    Generation,
    Auth,
    Permission,
    Platform,
    Config,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse => write!(f, "parse"),
            Self::Template => write!(f, "template"),
            Self::Generation => write!(f, "generation"),
            Self::Auth => write!(f, "auth"),
            Self::Permission => write!(f, "permission"),
            Self::Platform => write!(f, "platform"),
            Self::Config => write!(f, "config"),
        }
    }
}

impl ReplyError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Parse(_) => ErrorKind::Parse,
            Self::Template(_) => ErrorKind::Template,
            Self::Generation(_) => ErrorKind::Generation,
            Self::Auth(_) => ErrorKind::Auth,
            Self::Permission(_) => ErrorKind::Permission,
            Self::Platform { .. } => ErrorKind::Platform,
            Self::Config(_) => ErrorKind::Config,
        }
    }

    /// Error for a required setting that is unset or empty.
    pub fn missing_setting(name: &str) -> Self {
        Self::Config(format!("required environment variable '{name}' is not set"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_matches_variant() {
        assert_eq!(ReplyError::Parse("x".into()).kind(), ErrorKind::Parse);
        assert_eq!(
            ReplyError::Platform {
                status: 429,
                message: "Too Many Requests".into()
            }
            .kind(),
            ErrorKind::Platform
        );
    }

    #[test]
    fn platform_error_message_includes_status_and_detail() {
        let err = ReplyError::Platform {
            status: 429,
            message: "Too Many Requests".into(),
        };
        assert_eq!(err.to_string(), "X API error (429): Too Many Requests");
    }

    #[test]
    fn missing_setting_names_the_variable() {
        let err = ReplyError::missing_setting("OPENAI_API_KEY");
        assert_eq!(err.kind(), ErrorKind::Config);
        assert!(err.to_string().contains("OPENAI_API_KEY"));
    }
}
