//! LLM integration crate for ragline.
//!
//! A provider-agnostic abstraction for calling large language models
//! through a unified trait-based interface.
//!
//! # Providers
//! - **Gemini**: Google Generative Language API (default)
//! - **Ollama**: Local LLM runtime
//!
//! # Example
//! ```no_run
//! use ragline_llm::{create_client, LlmRequest};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = create_client("ollama", None, None, Duration::from_secs(60))?;
//! let request = LlmRequest::new("Hello, world!", "llama3.2").with_structured_output();
//! let response = client.complete(&request).await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod providers;
pub mod types;

// Re-export main types
pub use client::{LlmClient, LlmRequest, LlmResponse, LlmUsage, ResponseFormat};
pub use factory::create_client;
pub use providers::{GeminiClient, OllamaClient};
pub use types::ProviderType;
