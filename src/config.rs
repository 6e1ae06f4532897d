use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Result, ScriptError};

pub const DEFAULT_MODEL: &str = "anthropic/claude-3.5-sonnet";
pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";

pub const API_KEY_VAR: &str = "OPENROUTER_API_KEY";
pub const MODEL_VAR: &str = "AUTO_MANIM_MODEL";
pub const BASE_URL_VAR: &str = "AUTO_MANIM_BASE_URL";
pub const CACHE_DIR_VAR: &str = "AUTO_MANIM_CACHE_DIR";

/// Settings for talking to the generative backend and persisting scripts.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub request_timeout: Duration,
    /// File cache location; `None` keeps scripts in memory only.
    pub cache_dir: Option<PathBuf>,
}

/// Values given on the command line, each falling back to the environment.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub cache_dir: Option<PathBuf>,
}

impl Config {
    pub fn resolve(overrides: Overrides) -> Result<Self> {
        Self::resolve_with(overrides, |name| std::env::var(name).ok())
    }

    pub fn resolve_with<F>(overrides: Overrides, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = overrides
            .api_key
            .or_else(|| env(API_KEY_VAR))
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                ScriptError::Config(format!(
                    "{} not found. Please set it via --api-key or the {} environment variable",
                    API_KEY_VAR, API_KEY_VAR
                ))
            })?;

        Ok(Self {
            api_key,
            model: overrides
                .model
                .or_else(|| env(MODEL_VAR))
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url: overrides
                .base_url
                .or_else(|| env(BASE_URL_VAR))
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            request_timeout: Duration::from_secs(300),
            cache_dir: overrides
                .cache_dir
                .or_else(|| env(CACHE_DIR_VAR).map(PathBuf::from)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn missing_api_key_is_a_config_error() {
        let err = Config::resolve_with(Overrides::default(), no_env).unwrap_err();
        assert!(matches!(err, ScriptError::Config(_)));
        assert!(err.to_string().contains(API_KEY_VAR));
    }

    #[test]
    fn flags_win_over_environment() {
        let overrides = Overrides {
            api_key: Some("flag-key".into()),
            model: Some("flag/model".into()),
            ..Default::default()
        };
        let config = Config::resolve_with(overrides, |name| match name {
            API_KEY_VAR => Some("env-key".into()),
            MODEL_VAR => Some("env/model".into()),
            CACHE_DIR_VAR => Some("/tmp/scripts".into()),
            _ => None,
        })
        .unwrap();

        assert_eq!(config.api_key, "flag-key");
        assert_eq!(config.model, "flag/model");
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.cache_dir, Some(PathBuf::from("/tmp/scripts")));
    }
}
