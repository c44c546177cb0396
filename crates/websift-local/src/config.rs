use std::time::Duration;
use websift_core::{Error, Result};

pub const API_KEY_ENV: &str = "OPENROUTER_API_KEY";
pub const API_URL_ENV: &str = "OPENROUTER_API_URL";

pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";
/// The `:online` suffix turns on OpenRouter's web plugin for this model.
pub const DEFAULT_MODEL: &str = "openai/gpt-3.5-turbo:online";
pub const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(30);

/// Upstream settings, fixed once at startup and shared read-only by every request.
#[derive(Clone)]
pub struct Config {
    api_key: String,
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .finish()
    }
}

fn non_empty(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

impl Config {
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = non_empty(Some(api_key.into()))
            .ok_or_else(|| Error::NotConfigured(format!("missing {API_KEY_ENV}")))?;
        Ok(Self {
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout: UPSTREAM_TIMEOUT,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Build from an arbitrary key lookup (the process env in production, a map in tests).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let api_key = non_empty(lookup(API_KEY_ENV)).ok_or_else(|| {
            Error::NotConfigured(format!("{API_KEY_ENV} environment variable is required"))
        })?;
        let cfg = Self::new(api_key)?;
        Ok(match non_empty(lookup(API_URL_ENV)) {
            Some(url) => cfg.with_base_url(url),
            None => cfg,
        })
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn endpoint_chat_completions(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}
