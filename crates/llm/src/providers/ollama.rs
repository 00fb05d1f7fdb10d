//! Ollama LLM provider implementation.
//!
//! Ollama API: https://github.com/ollama/ollama/blob/main/docs/api.md

use crate::client::{transport_error, LlmClient, LlmRequest, LlmResponse, LlmUsage, ResponseFormat};
use ragline_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default local Ollama endpoint.
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Ollama API request format.
#[derive(Debug, Serialize)]
struct OllamaRequest {
    model: String,
    prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<String>,
    options: OllamaOptions,
    stream: bool,
}

/// Sampling options nested under `options`.
#[derive(Debug, Serialize)]
struct OllamaOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

/// Ollama API response format.
#[derive(Debug, Deserialize)]
struct OllamaResponse {
    model: String,
    #[serde(default)]
    response: String,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
}

/// Ollama LLM client.
pub struct OllamaClient {
    /// Base URL for Ollama API
    base_url: String,

    /// HTTP client
    client: reqwest::Client,
}

impl OllamaClient {
    /// Create a new Ollama client against `base_url` with a request timeout.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    /// Convert LlmRequest to Ollama format.
    fn to_ollama_request(&self, request: &LlmRequest) -> OllamaRequest {
        // Ollama samples a single completion; candidate_count has no equivalent
        let format = match request.response_format {
            ResponseFormat::StructuredJson => Some("json".to_string()),
            ResponseFormat::FreeText => None,
        };

        OllamaRequest {
            model: request.model.clone(),
            prompt: request.prompt.clone(),
            system: request.system.clone(),
            format,
            options: OllamaOptions {
                temperature: request.temperature,
                num_predict: request.max_tokens,
            },
            stream: false,
        }
    }

    /// Convert Ollama response to LlmResponse.
    fn convert_response(&self, response: OllamaResponse) -> LlmResponse {
        let usage = LlmUsage::new(
            response.prompt_eval_count.unwrap_or(0),
            response.eval_count.unwrap_or(0),
        );

        LlmResponse {
            content: response.response,
            model: response.model,
            usage,
        }
    }
}

#[async_trait::async_trait]
impl LlmClient for OllamaClient {
    fn provider_name(&self) -> &str {
        "ollama"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        tracing::info!(model = %request.model, "Sending completion request to Ollama");
        tracing::debug!("Request: {:?}", request);

        let ollama_request = self.to_ollama_request(request);
        let url = format!("{}/api/generate", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&ollama_request)
            .send()
            .await
            .map_err(|e| transport_error("Ollama", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::ModelInvocation(format!(
                "Ollama API error ({}): {}",
                status, error_text
            )));
        }

        // The envelope is Ollama's, not the model's; failing to read it is a transport problem
        let ollama_response: OllamaResponse = response.json().await.map_err(|e| {
            AppError::ModelInvocation(format!("Failed to read Ollama response: {}", e))
        })?;

        tracing::info!("Received completion from Ollama");
        tracing::debug!("Response: {:?}", ollama_response);

        Ok(self.convert_response(ollama_response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> OllamaClient {
        OllamaClient::new(DEFAULT_OLLAMA_URL, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_ollama_client_creation() {
        let client = OllamaClient::new("http://localhost:8080/", Duration::from_secs(5)).unwrap();
        assert_eq!(client.provider_name(), "ollama");
        assert!(client.supports_system());
        assert_eq!(client.base_url, "http://localhost:8080");
    }

    #[test]
    fn test_ollama_request_conversion() {
        let request = LlmRequest::new("Hello", "llama3.2")
            .with_system("Answer in JSON")
            .with_temperature(0.2)
            .with_max_tokens(100)
            .with_structured_output();

        let ollama_req = client().to_ollama_request(&request);
        assert_eq!(ollama_req.model, "llama3.2");
        assert_eq!(ollama_req.prompt, "Hello");
        assert_eq!(ollama_req.system.as_deref(), Some("Answer in JSON"));
        assert_eq!(ollama_req.format.as_deref(), Some("json"));
        assert_eq!(ollama_req.options.temperature, Some(0.2));
        assert_eq!(ollama_req.options.num_predict, Some(100));
        assert!(!ollama_req.stream);
    }

    #[test]
    fn test_free_text_has_no_format() {
        let request = LlmRequest::new("Hello", "llama3.2");
        let ollama_req = client().to_ollama_request(&request);

        let json = serde_json::to_value(&ollama_req).unwrap();
        assert!(json.get("format").is_none());
        assert!(json.get("system").is_none());
    }

    #[test]
    fn test_convert_response_with_empty_text() {
        let raw: OllamaResponse =
            serde_json::from_str(r#"{"model": "llama3.2", "done": true}"#).unwrap();
        let response = client().convert_response(raw);

        assert_eq!(response.content, "");
        assert_eq!(response.usage.total_tokens, 0);
    }
}
