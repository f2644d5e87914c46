//! LLM integration.
//!
//! `LlmProvider` is the seam the model classifier talks to; `OpenAiProvider`
//! is the HTTP implementation for OpenAI-compatible endpoints.

pub mod openai;
pub mod provider;

pub use openai::OpenAiProvider;
pub use provider::*;

use std::sync::Arc;

use crate::config::TriageConfig;
use crate::error::LlmError;

/// Create the configured provider, or `None` when no usable credential is set.
pub fn create_provider(config: &TriageConfig) -> Result<Option<Arc<dyn LlmProvider>>, LlmError> {
    let Some(api_key) = config.api_key.clone().filter(|_| config.has_usable_credential()) else {
        return Ok(None);
    };

    let provider = OpenAiProvider::new(&config.base_url, api_key, &config.model)?;
    tracing::info!("Using OpenAI-compatible model (model: {})", config.model);
    Ok(Some(Arc::new(provider)))
}
