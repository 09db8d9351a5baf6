//! Configuration schema for reply-bot (TOML file and environment).

use crate::error::{ReplyError, Result};
use serde::{Deserialize, Serialize};

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplyConfig {
    /// Generation API key.
    pub openai_api_key: String,

    /// Generation model identifier.
    pub openai_model: String,

    /// Generation API base URL (OpenAI-compatible).
    pub openai_base_url: String,

    /// X consumer (API) key.
    pub x_consumer_key: String,

    /// X consumer (API) secret.
    pub x_consumer_secret: String,

    /// X user access token.
    pub x_access_token: String,

    /// X user access token secret.
    pub x_access_token_secret: String,

    /// X API base URL.
    pub x_api_base_url: String,

    /// Log the reply instead of posting it.
    pub x_dry_run: bool,

    /// Prompt template file.
    pub prompt_template_path: String,

    /// Per-request HTTP timeout for both APIs.
    pub request_timeout_secs: u64,
}

impl Default for ReplyConfig {
    fn default() -> Self {
        Self {
            openai_api_key: String::new(),
            openai_model: "gpt-4".into(),
            openai_base_url: "https://api.openai.com".into(),
            x_consumer_key: String::new(),
            x_consumer_secret: String::new(),
            x_access_token: String::new(),
            x_access_token_secret: String::new(),
            x_api_base_url: "https://api.twitter.com".into(),
            x_dry_run: false,
            prompt_template_path: "prompts/comment_prompt.txt".into(),
            request_timeout_secs: 30,
        }
    }
}

/// OAuth 1.0a user-context credentials for the X API.
#[derive(Debug, Clone)]
pub struct XCredentials {
    pub consumer_key: String,
    pub consumer_secret: String,
    pub access_token: String,
    pub access_token_secret: String,
}

impl ReplyConfig {
    /// Apply environment overrides from `lookup` on top of `self`.
    ///
    /// Empty values are treated as unset.
    pub fn overlay_env<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let strings: [(&str, &mut String); 9] = [
            ("OPENAI_API_KEY", &mut self.openai_api_key),
            ("OPENAI_MODEL", &mut self.openai_model),
            ("OPENAI_BASE_URL", &mut self.openai_base_url),
            ("X_CONSUMER_KEY", &mut self.x_consumer_key),
            ("X_CONSUMER_SECRET", &mut self.x_consumer_secret),
            ("X_ACCESS_TOKEN", &mut self.x_access_token),
            ("X_ACCESS_TOKEN_SECRET", &mut self.x_access_token_secret),
            ("X_API_BASE_URL", &mut self.x_api_base_url),
            ("PROMPT_TEMPLATE_PATH", &mut self.prompt_template_path),
        ];
        for (key, slot) in strings {
            if let Some(value) = get(key) {
                *slot = value;
            }
        }

        if let Some(value) = get("X_DRY_RUN") {
            self.x_dry_run = parse_bool("X_DRY_RUN", &value)?;
        }
        if let Some(value) = get("REQUEST_TIMEOUT_SECS") {
            self.request_timeout_secs = value.trim().parse().map_err(|_| {
                ReplyError::Config(format!(
                    "REQUEST_TIMEOUT_SECS must be a whole number of seconds, got '{value}'"
                ))
            })?;
        }

        Ok(self)
    }

    /// Resolve a path that may contain `~` to an absolute path.
    pub fn resolve_path(&self, path: &str) -> String {
        shellexpand::tilde(path).into_owned()
    }

    /// Resolved prompt template path.
    pub fn resolved_template_path(&self) -> String {
        self.resolve_path(&self.prompt_template_path)
    }

    /// Generation API key, or a config error naming the variable.
    pub fn require_openai_key(&self) -> Result<&str> {
        require("OPENAI_API_KEY", &self.openai_api_key)
    }

    /// All four X credentials, or a config error naming the first missing one.
    pub fn require_x_credentials(&self) -> Result<XCredentials> {
        Ok(XCredentials {
            consumer_key: require("X_CONSUMER_KEY", &self.x_consumer_key)?.to_string(),
            consumer_secret: require("X_CONSUMER_SECRET", &self.x_consumer_secret)?.to_string(),
            access_token: require("X_ACCESS_TOKEN", &self.x_access_token)?.to_string(),
            access_token_secret: require("X_ACCESS_TOKEN_SECRET", &self.x_access_token_secret)?
                .to_string(),
        })
    }
}

fn require<'a>(name: &str, value: &'a str) -> Result<&'a str> {
    if value.trim().is_empty() {
        Err(ReplyError::missing_setting(name))
    } else {
        Ok(value)
    }
}

fn parse_bool(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ReplyError::Config(format!(
            "{name} must be a boolean, got '{value}'"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn model_defaults_to_gpt4() {
        let cfg = ReplyConfig::default().overlay_env(env(&[])).unwrap();
        assert_eq!(cfg.openai_model, "gpt-4");
    }

    #[test]
    fn environment_overrides_file_values() {
        let file_cfg = ReplyConfig {
            openai_model: "from-file".into(),
            x_api_base_url: "http://file".into(),
            ..ReplyConfig::default()
        };
        let cfg = file_cfg
            .overlay_env(env(&[("OPENAI_MODEL", "gpt-4o"), ("X_DRY_RUN", "true")]))
            .unwrap();
        assert_eq!(cfg.openai_model, "gpt-4o");
        assert_eq!(cfg.x_api_base_url, "http://file");
        assert!(cfg.x_dry_run);
    }

    #[test]
    fn empty_variables_do_not_clobber_defaults() {
        let cfg = ReplyConfig::default()
            .overlay_env(env(&[("OPENAI_MODEL", "  ")]))
            .unwrap();
        assert_eq!(cfg.openai_model, "gpt-4");
    }

    #[test]
    fn invalid_dry_run_flag_is_a_config_error() {
        let err = ReplyConfig::default()
            .overlay_env(env(&[("X_DRY_RUN", "maybe")]))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn missing_x_credential_is_named() {
        let cfg = ReplyConfig::default()
            .overlay_env(env(&[
                ("X_CONSUMER_KEY", "ck"),
                ("X_CONSUMER_SECRET", "cs"),
                ("X_ACCESS_TOKEN", "at"),
            ]))
            .unwrap();
        let err = cfg.require_x_credentials().unwrap_err();
        assert!(err.to_string().contains("X_ACCESS_TOKEN_SECRET"));
    }

    #[test]
    fn missing_openai_key_is_a_config_error() {
        let err = ReplyConfig::default().require_openai_key().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }
}
