//! Question answering pipeline.
//!
//! Every question runs the same four stages in order:
//! 1. Validate the question
//! 2. Retrieve context from the index
//! 3. Generate a raw reply with the model
//! 4. Normalize the reply into an `AnswerResult`
//!
//! Validation and generation failures are returned as errors. Everything
//! else, including empty retrieval and unusable model output, ends in a
//! valid answer.

use crate::rag::generate::AnswerGenerator;
use crate::rag::normalize::normalize_response;
use crate::rag::types::{AnswerPolicy, AnswerResult};
use crate::retriever::{IndexRetriever, Retriever, DEFAULT_TOP_K};
use crate::types::RetrievalResult;
use ragline_core::{AppConfig, AppError, AppResult};
use ragline_prompt::GenerationRequest;
use std::sync::Arc;

/// Minimum question length in characters, after trimming.
pub const MIN_QUESTION_CHARS: usize = 3;

/// A question that passed validation. Holds the trimmed text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question(String);

impl Question {
    /// Validate raw user input.
    ///
    /// # Errors
    /// `AppError::Validation` when fewer than `MIN_QUESTION_CHARS`
    /// characters remain after trimming.
    pub fn parse(raw: &str) -> AppResult<Self> {
        let trimmed = raw.trim();
        if trimmed.chars().count() < MIN_QUESTION_CHARS {
            return Err(AppError::Validation(format!(
                "question must be at least {} characters",
                MIN_QUESTION_CHARS
            )));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Shared, immutable pipeline. Safe to call concurrently through `&self`.
#[derive(Clone)]
pub struct RagPipeline {
    retriever: Arc<dyn Retriever>,
    generator: Arc<AnswerGenerator>,
    policy: AnswerPolicy,
    top_k: usize,
}

impl RagPipeline {
    pub fn new(retriever: Arc<dyn Retriever>, generator: AnswerGenerator) -> Self {
        Self {
            retriever,
            generator: Arc::new(generator),
            policy: AnswerPolicy::default(),
            top_k: DEFAULT_TOP_K,
        }
    }

    /// Load the index, the query embedder and the model client once.
    ///
    /// # Errors
    /// `AppError::RetrieverUnavailable` for a missing or incompatible index,
    /// `AppError::ModelAuth` for missing credentials.
    pub fn from_config(config: &AppConfig) -> AppResult<Self> {
        let retriever = IndexRetriever::from_config(config)?;
        let generator = AnswerGenerator::from_config(config)?;

        Ok(Self::new(Arc::new(retriever), generator)
            .with_policy(AnswerPolicy::from(&config.answer))
            .with_top_k(config.retrieval.top_k))
    }

    pub fn with_policy(mut self, policy: AnswerPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Answer one question.
    pub async fn ask(&self, question: &str) -> AppResult<AnswerResult> {
        let question = self.validate(question)?;
        let retrieved = self.retrieve(&question).await?;

        let request = GenerationRequest::new(question.as_str(), retrieved.context, retrieved.sources);
        let raw = self.generate(&request).await?;

        Ok(self.normalize(&raw, &request))
    }

    fn validate(&self, raw: &str) -> AppResult<Question> {
        let question = Question::parse(raw)
            .inspect_err(|e| tracing::info!("Rejected question: {}", e))?;
        tracing::info!(chars = question.as_str().chars().count(), "Question accepted");
        Ok(question)
    }

    async fn retrieve(&self, question: &Question) -> AppResult<RetrievalResult> {
        let retrieved = self.retriever.get_context(question.as_str(), self.top_k).await?;

        if retrieved.is_empty() {
            tracing::info!("No context retrieved; the model will be told there is no evidence");
        } else {
            tracing::info!(
                context_chars = retrieved.context.chars().count(),
                sources = retrieved.sources.len(),
                "Retrieved context"
            );
        }

        Ok(retrieved)
    }

    async fn generate(&self, request: &GenerationRequest) -> AppResult<String> {
        self.generator
            .generate(request)
            .await
            .inspect_err(|e| tracing::error!("Generation failed: {}", e))
    }

    fn normalize(&self, raw: &str, request: &GenerationRequest) -> AnswerResult {
        let result = normalize_response(raw, request.sources(), request.context(), &self.policy);
        tracing::info!(
            confidence = result.confidence,
            sources = result.sources.len(),
            "Answer ready"
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::fixtures::{write_index, FixtureChunk, StubClient, StubReply, StubRetriever};
    use ragline_prompt::REFUSAL_PHRASE;
    use tempfile::TempDir;

    const CONTEXT: &str = "We offer consulting and AI implementation.";
    const SOURCE: &str = "https://example.com/services";

    fn pipeline(retriever: Arc<StubRetriever>, client: Arc<StubClient>) -> RagPipeline {
        RagPipeline::new(retriever, AnswerGenerator::new(client, "test-model"))
    }

    #[test]
    fn test_question_parse() {
        assert_eq!(Question::parse("  Why?  ").unwrap().as_str(), "Why?");
        assert!(Question::parse("abc").is_ok());
        assert!(matches!(Question::parse("ab"), Err(AppError::Validation(_))));
        assert!(Question::parse("   a b   ").is_ok());
        assert!(matches!(Question::parse(""), Err(AppError::Validation(_))));
        // Characters, not bytes
        assert!(matches!(Question::parse("éé"), Err(AppError::Validation(_))));
        assert!(Question::parse("¿Qué?").is_ok());
    }

    #[tokio::test]
    async fn test_short_question_skips_retrieval_and_generation() {
        let retriever = Arc::new(StubRetriever::new(CONTEXT, &[SOURCE]));
        let client = Arc::new(StubClient::text("{}"));
        let pipeline = pipeline(retriever.clone(), client.clone());

        for question in ["", "  ", "hi", " ab "] {
            let err = pipeline.ask(question).await.unwrap_err();
            assert!(matches!(err, AppError::Validation(_)));
        }

        assert_eq!(retriever.calls(), 0);
        assert_eq!(client.calls(), 0);
    }

    #[tokio::test]
    async fn test_malformed_output_falls_back_to_context() {
        let retriever = Arc::new(StubRetriever::new(CONTEXT, &[SOURCE]));
        let client = Arc::new(StubClient::text("I think they do consulting?"));
        let pipeline = pipeline(retriever, client);

        let result = pipeline
            .ask("What services does the company offer?")
            .await
            .unwrap();

        assert_eq!(
            result,
            AnswerResult {
                answer: CONTEXT.to_string(),
                sources: vec![SOURCE.to_string()],
                confidence: 0.4,
            }
        );
    }

    #[tokio::test]
    async fn test_empty_retrieval_still_generates() {
        let retriever = Arc::new(StubRetriever::empty());
        let client = Arc::new(StubClient::text(""));
        let pipeline = pipeline(retriever.clone(), client.clone());

        let result = pipeline.ask("Who is the CEO?").await.unwrap();

        assert_eq!(retriever.calls(), 1);
        assert_eq!(client.calls(), 1);
        assert_eq!(result.answer, REFUSAL_PHRASE);
        assert_eq!(result.confidence, 0.1);
        assert!(result.sources.is_empty());
    }

    #[tokio::test]
    async fn test_well_formed_answer() {
        let retriever = Arc::new(StubRetriever::new(CONTEXT, &[SOURCE]));
        let client = Arc::new(StubClient::text(
            r#"{"answer": "Consulting and AI implementation.", "confidence": 0.92}"#,
        ));
        let pipeline = pipeline(retriever, client.clone());

        let result = pipeline
            .ask("  What services does the company offer?  ")
            .await
            .unwrap();

        assert_eq!(result.answer, "Consulting and AI implementation.");
        assert_eq!(result.sources, vec![SOURCE]);
        assert_eq!(result.confidence, 0.92);
        assert!(client
            .last_request()
            .prompt
            .starts_with("Question: What services does the company offer?\n"));
    }

    #[tokio::test]
    async fn test_transport_error_is_not_converted_into_fallback() {
        let retriever = Arc::new(StubRetriever::new(CONTEXT, &[SOURCE]));
        let client = Arc::new(StubClient::new(StubReply::Fail(|| {
            AppError::ModelInvocation("503 Service Unavailable".to_string())
        })));
        let pipeline = pipeline(retriever, client);

        let err = pipeline
            .ask("What services does the company offer?")
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::ModelInvocation(_)));
    }

    #[tokio::test]
    async fn test_policy_is_applied() {
        let retriever = Arc::new(StubRetriever::new(CONTEXT, &[SOURCE]));
        let client = Arc::new(StubClient::text("garbage"));
        let policy = AnswerPolicy {
            fallback_confidence: 0.25,
            fallback_max_chars: 8,
            ..AnswerPolicy::default()
        };
        let pipeline = pipeline(retriever, client).with_policy(policy);

        let result = pipeline.ask("What do you offer?").await.unwrap();

        assert_eq!(result.answer, "We offer");
        assert_eq!(result.confidence, 0.25);
    }

    #[tokio::test]
    async fn test_concurrent_asks_are_independent() {
        let retriever = Arc::new(StubRetriever::new(CONTEXT, &[SOURCE]));
        let client = Arc::new(StubClient::new(StubReply::EchoQuestion));
        let pipeline = Arc::new(pipeline(retriever.clone(), client.clone()));

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let pipeline = Arc::clone(&pipeline);
                tokio::spawn(async move { pipeline.ask(&format!("question number {}", i)).await })
            })
            .collect();

        for (i, handle) in handles.into_iter().enumerate() {
            let result = handle.await.unwrap().unwrap();
            assert_eq!(result.answer, format!("echo: question number {}", i));
            assert_eq!(result.sources, vec![SOURCE]);
            assert_eq!(result.confidence, 0.9);
        }

        assert_eq!(retriever.calls(), 16);
        assert_eq!(client.calls(), 16);
    }

    #[test]
    fn test_from_config_missing_index() {
        let dir = TempDir::new().unwrap();
        let mut config = AppConfig::default();
        config.retrieval.index_path = dir.path().join("missing.sqlite");

        let err = RagPipeline::from_config(&config).err().unwrap();
        assert!(matches!(err, AppError::RetrieverUnavailable(_)));
    }

    #[test]
    fn test_from_config_with_ollama_and_index() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("index.sqlite");
        write_index(&path, &[FixtureChunk::url(SOURCE, CONTEXT, vec![0.5; 384])]);

        let mut config = AppConfig::default();
        config.retrieval.index_path = path;
        config.retrieval.top_k = 2;
        config.llm.provider = "ollama".to_string();
        config.llm.model = "llama3".to_string();

        let pipeline = RagPipeline::from_config(&config).unwrap();
        assert_eq!(pipeline.top_k, 2);
        assert_eq!(pipeline.policy, AnswerPolicy::default());
    }
}
