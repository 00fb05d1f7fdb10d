//! LLM provider factory.
//!
//! Creates the process-wide LLM client from configuration. Called once at
//! startup; the returned handle is shared read-only afterwards.

use crate::client::LlmClient;
use crate::providers::{GeminiClient, OllamaClient};
use crate::types::ProviderType;
use ragline_core::{AppError, AppResult};
use std::sync::Arc;
use std::time::Duration;

/// Create an LLM client based on the provider name.
///
/// # Arguments
/// * `provider` - Provider identifier ("gemini", "ollama")
/// * `endpoint` - Optional custom endpoint URL
/// * `api_key` - API key, required by providers that authenticate
/// * `timeout` - Upper bound for each HTTP request
///
/// # Errors
/// - `AppError::Config` if the provider is unknown
/// - `AppError::ModelAuth` if required credentials are missing
pub fn create_client(
    provider: &str,
    endpoint: Option<&str>,
    api_key: Option<&str>,
    timeout: Duration,
) -> AppResult<Arc<dyn LlmClient>> {
    let provider_type = ProviderType::parse(provider)
        .ok_or_else(|| AppError::Config(format!("Unknown provider: {}", provider)))?;

    let base_url = endpoint.unwrap_or(provider_type.default_endpoint());
    tracing::debug!(provider = provider_type.as_str(), %base_url, "Creating LLM client");

    match provider_type {
        ProviderType::Gemini => Ok(Arc::new(GeminiClient::new(base_url, api_key, timeout)?)),
        ProviderType::Ollama => Ok(Arc::new(OllamaClient::new(base_url, timeout)?)),
    }
}
