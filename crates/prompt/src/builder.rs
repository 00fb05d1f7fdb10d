//! Prompt builder for rendering the user message.

use crate::instruction::{RESPONSE_SHAPE, SYSTEM_INSTRUCTION};
use crate::types::{BuiltPrompt, BuiltPromptMetadata, GenerationRequest};
use handlebars::Handlebars;
use ragline_core::{AppError, AppResult};

/// User message template. Sources are rendered as a JSON array string.
const USER_TEMPLATE: &str = "Question: {{question}}

Context:
{{context}}

Sources: {{sources}}

Respond ONLY with valid JSON shaped as:
{{shape}}
";

/// Build the prompt for a generation request.
///
/// Deterministic and side-effect free: the same request always yields the
/// same prompt. The question is expected to be validated already; an
/// empty context is legal and tells the model there is no evidence.
///
/// # Example
/// ```
/// use ragline_prompt::{build_prompt, GenerationRequest};
///
/// let request = GenerationRequest::new("What is Rust?", "Rust is a language.", vec![]);
/// let built = build_prompt(&request).unwrap();
/// assert!(built.user.starts_with("Question: What is Rust?"));
/// ```
pub fn build_prompt(request: &GenerationRequest) -> AppResult<BuiltPrompt> {
    let sources = serde_json::to_string(request.sources())?;

    let variables = serde_json::json!({
        "question": request.question(),
        "context": request.context(),
        "sources": sources,
        "shape": RESPONSE_SHAPE,
    });

    let user = render_template(USER_TEMPLATE, &variables)?;

    tracing::debug!(
        context_chars = request.context().chars().count(),
        sources = request.sources().len(),
        "Built generation prompt"
    );

    Ok(BuiltPrompt {
        system: SYSTEM_INSTRUCTION.to_string(),
        user,
        metadata: BuiltPromptMetadata {
            context_chars: request.context().chars().count(),
            source_count: request.sources().len(),
        },
    })
}

/// Render a Handlebars template with variables.
fn render_template(template: &str, variables: &serde_json::Value) -> AppResult<String> {
    let mut handlebars = Handlebars::new();

    // Disable HTML escaping for plain text
    handlebars.register_escape_fn(handlebars::no_escape);

    handlebars
        .register_template_string("prompt", template)
        .map_err(|e| AppError::Prompt(format!("Failed to register template: {}", e)))?;

    handlebars
        .render("prompt", variables)
        .map_err(|e| AppError::Prompt(format!("Failed to render template: {}", e)))
}
