pub mod schema;

pub use schema::{ReplyConfig, XCredentials};

use crate::error::{ReplyError, Result};
use std::path::Path;

/// Environment variable naming an optional TOML config file.
pub const CONFIG_PATH_ENV: &str = "REPLY_BOT_CONFIG";

/// Load config from the given path, or return defaults if it does not exist.
pub fn load_config(path: &Path) -> Result<ReplyConfig> {
    if path.exists() {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            ReplyError::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        toml::from_str(&contents).map_err(|e| {
            ReplyError::Config(format!("failed to parse {} (TOML): {e}", path.display()))
        })
    } else {
        Ok(ReplyConfig::default())
    }
}

/// Build the invocation config from the process environment.
///
/// Reads the TOML file named by [`CONFIG_PATH_ENV`] (if any), then lets
/// environment variables override it.
pub fn from_env() -> Result<ReplyConfig> {
    from_lookup(|key| std::env::var(key).ok())
}

/// Same as [`from_env`] with an injectable variable source.
pub fn from_lookup<F>(lookup: F) -> Result<ReplyConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let base = match lookup(CONFIG_PATH_ENV).filter(|p| !p.trim().is_empty()) {
        Some(path) => {
            let resolved = shellexpand::tilde(&path).into_owned();
            let path = Path::new(&resolved);
            if !path.exists() {
                return Err(ReplyError::Config(format!(
                    "{CONFIG_PATH_ENV} points to a missing file: {}",
                    path.display()
                )));
            }
            load_config(path)?
        }
        None => ReplyConfig::default(),
    };
    base.overlay_env(lookup)
}
