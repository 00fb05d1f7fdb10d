//! Google Gemini provider via the Generative Language API.
//!
//! API: https://ai.google.dev/api/generate-content

use crate::client::{transport_error, LlmClient, LlmRequest, LlmResponse, LlmUsage, ResponseFormat};
use ragline_core::{AppError, AppResult};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Public Generative Language API endpoint.
pub const DEFAULT_GEMINI_URL: &str = "https://generativelanguage.googleapis.com";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize, Default)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize, Default)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    candidate_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    response_mime_type: &'static str,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
    #[serde(default)]
    model_version: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
}

/// Gemini LLM client.
pub struct GeminiClient {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl GeminiClient {
    /// Create a new Gemini client.
    ///
    /// # Errors
    /// `AppError::ModelAuth` when no API key is available. This happens at
    /// startup, so a misconfigured service never starts serving.
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<&str>,
        timeout: Duration,
    ) -> AppResult<Self> {
        let api_key = api_key
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                AppError::ModelAuth("Gemini provider requires an API key".to_string())
            })?;

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            client,
        })
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, model)
    }

    fn to_gemini_request(&self, request: &LlmRequest) -> GenerateRequest {
        let response_mime_type = match request.response_format {
            ResponseFormat::StructuredJson => "application/json",
            ResponseFormat::FreeText => "text/plain",
        };

        GenerateRequest {
            system_instruction: request.system.as_ref().map(|system| Content {
                role: None,
                parts: vec![Part {
                    text: system.clone(),
                }],
            }),
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: request.prompt.clone(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: request.temperature,
                candidate_count: request.candidate_count,
                max_output_tokens: request.max_tokens,
                response_mime_type,
            },
        }
    }

    /// Join the text parts of the first candidate.
    ///
    /// A response without candidates (e.g. blocked by safety filters)
    /// yields empty content rather than an error.
    fn convert_response(&self, response: GenerateResponse, model: &str) -> LlmResponse {
        let content = response
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .map(|part| part.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        let usage = response
            .usage_metadata
            .map(|u| LlmUsage::new(u.prompt_token_count, u.candidates_token_count))
            .unwrap_or_default();

        LlmResponse {
            content,
            model: response.model_version.unwrap_or_else(|| model.to_string()),
            usage,
        }
    }
}

#[async_trait::async_trait]
impl LlmClient for GeminiClient {
    fn provider_name(&self) -> &str {
        "gemini"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        tracing::info!(model = %request.model, "Sending completion request to Gemini");
        tracing::debug!("Request: {:?}", request);

        let body = self.to_gemini_request(request);

        let response = self
            .client
            .post(self.endpoint(&request.model))
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error("Gemini", e))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AppError::ModelAuth(format!(
                    "Gemini rejected the API key ({}): {}",
                    status, error_text
                )),
                _ => AppError::ModelInvocation(format!(
                    "Gemini API error ({}): {}",
                    status, error_text
                )),
            });
        }

        let gemini_response: GenerateResponse = response.json().await.map_err(|e| {
            AppError::ModelInvocation(format!("Failed to read Gemini response: {}", e))
        })?;

        tracing::info!(
            candidates = gemini_response.candidates.len(),
            "Received completion from Gemini"
        );

        Ok(self.convert_response(gemini_response, &request.model))
    }
}
