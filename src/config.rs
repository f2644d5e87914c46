//! Configuration types.

use secrecy::{ExposeSecret, SecretString};

use crate::error::ConfigError;
use crate::triage::types::Locale;

/// Placeholder credential that selects the rule classifier.
pub const DEMO_API_KEY: &str = "demo";

/// Default OpenAI-compatible endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Default completion model.
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

/// Triage service configuration.
///
/// Read once at startup and shared read-only afterwards.
#[derive(Debug, Clone)]
pub struct TriageConfig {
    /// External model credential (`OPENAI_API_KEY`).
    pub api_key: Option<SecretString>,
    /// OpenAI-compatible base URL, without trailing slash.
    pub base_url: String,
    /// Model name sent with every completion request.
    pub model: String,
    /// Language of drafted replies and of the model prompt.
    pub locale: Locale,
    /// Maximum number of in-flight model calls per batch.
    pub max_concurrency: usize,
    /// HTTP listen port.
    pub port: u16,
}

impl Default for TriageConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            locale: Locale::Arabic,
            max_concurrency: 4,
            port: 3000,
        }
    }
}

impl TriageConfig {
    /// Build configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let api_key = std::env::var("OPENAI_API_KEY").ok().map(SecretString::from);

        let base_url = std::env::var("OPENAI_BASE_URL")
            .map(|s| s.trim_end_matches('/').to_string())
            .unwrap_or(defaults.base_url);

        let model = std::env::var("TRIAGE_MODEL")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(defaults.model);

        let locale = match std::env::var("TRIAGE_LOCALE") {
            Ok(raw) => Locale::parse(&raw).ok_or_else(|| ConfigError::InvalidValue {
                key: "TRIAGE_LOCALE".into(),
                message: format!("expected 'ar' or 'en', got '{raw}'"),
            })?,
            Err(_) => defaults.locale,
        };

        let max_concurrency = parse_var("TRIAGE_MAX_CONCURRENCY", defaults.max_concurrency)?;
        if max_concurrency == 0 {
            return Err(ConfigError::InvalidValue {
                key: "TRIAGE_MAX_CONCURRENCY".into(),
                message: "must be at least 1".into(),
            });
        }

        let port = parse_var("TRIAGE_PORT", defaults.port)?;

        Ok(Self {
            api_key,
            base_url,
            model,
            locale,
            max_concurrency,
            port,
        })
    }

    /// Whether a real credential is configured (set, non-empty, not `demo`).
    pub fn has_usable_credential(&self) -> bool {
        self.api_key.as_ref().is_some_and(|key| {
            let key = key.expose_secret().trim();
            !key.is_empty() && key != DEMO_API_KEY
        })
    }
}

fn parse_var<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        }),
        Err(_) => Ok(default),
    }
}
