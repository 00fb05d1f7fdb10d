//! Answer generation via the language model.

use ragline_core::{AppConfig, AppError, AppResult};
use ragline_llm::{create_client, LlmClient, LlmRequest};
use ragline_prompt::{build_prompt, GenerationRequest};
use std::sync::Arc;
use std::time::Duration;

/// Sampling temperature for factual answers.
pub const DEFAULT_TEMPERATURE: f32 = 0.2;

/// Upper bound for one generation call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Sends the built prompt to the model and returns its raw text.
///
/// The returned string is whatever the model produced, empty included;
/// making sense of it is the normalizer's job. Only transport, timeout and
/// authentication failures are errors. Nothing is retried.
#[derive(Clone)]
pub struct AnswerGenerator {
    client: Arc<dyn LlmClient>,
    model: String,
    temperature: f32,
    timeout: Duration,
    max_tokens: Option<u32>,
}

impl AnswerGenerator {
    pub fn new(client: Arc<dyn LlmClient>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
            temperature: DEFAULT_TEMPERATURE,
            timeout: DEFAULT_TIMEOUT,
            max_tokens: None,
        }
    }

    /// Build the generator from the `llm` settings.
    ///
    /// # Errors
    /// `AppError::ModelAuth` when the provider needs an API key and none is
    /// configured; `AppError::Config` for an unknown provider.
    pub fn from_config(config: &AppConfig) -> AppResult<Self> {
        let timeout = Duration::from_secs(config.llm.timeout_secs);
        let api_key = config.resolve_api_key();

        let client = create_client(
            &config.llm.provider,
            config.llm.endpoint.as_deref(),
            api_key.as_deref(),
            timeout,
        )
        .map_err(|e| match e {
            AppError::ModelAuth(msg) => AppError::ModelAuth(format!(
                "{} (set {} or RAGLINE_API_KEY)",
                msg, config.llm.api_key_env
            )),
            other => other,
        })?;

        tracing::info!(
            provider = client.provider_name(),
            model = %config.llm.model,
            "Answer generator ready"
        );

        let mut generator = Self::new(client, config.llm.model.clone())
            .with_temperature(config.llm.temperature)
            .with_timeout(timeout);
        if let Some(max_tokens) = config.llm.max_tokens {
            generator = generator.with_max_tokens(max_tokens);
        }

        Ok(generator)
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Invoke the model once for `request` and return the raw content.
    pub async fn generate(&self, request: &GenerationRequest) -> AppResult<String> {
        let built = build_prompt(request)?;

        let mut llm_request = if self.client.supports_system() {
            LlmRequest::new(built.user.clone(), self.model.clone()).with_system(built.system.clone())
        } else {
            LlmRequest::new(built.combined(), self.model.clone())
        };
        llm_request = llm_request
            .with_temperature(self.temperature)
            .with_candidate_count(1)
            .with_structured_output();
        if let Some(max_tokens) = self.max_tokens {
            llm_request = llm_request.with_max_tokens(max_tokens);
        }

        tracing::debug!(
            provider = self.client.provider_name(),
            model = %self.model,
            context_chars = built.metadata.context_chars,
            sources = built.metadata.source_count,
            "Invoking model"
        );

        let response = tokio::time::timeout(self.timeout, self.client.complete(&llm_request))
            .await
            .map_err(|_| {
                AppError::ModelInvocation(format!(
                    "{} request timed out after {}s",
                    self.client.provider_name(),
                    self.timeout.as_secs_f32()
                ))
            })??;

        tracing::debug!(
            content_chars = response.content.chars().count(),
            completion_tokens = response.usage.completion_tokens,
            "Model replied"
        );

        Ok(response.content)
    }
}
