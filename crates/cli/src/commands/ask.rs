//! Ask command handler.
//!
//! Runs the answering pipeline once for a question given on the command line.

use clap::Args;
use ragline_core::{config::AppConfig, AppResult};
use ragline_knowledge::{AnswerResult, RagPipeline};

/// Answer a question from the knowledge index
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask
    pub question: String,

    /// Number of chunks to retrieve (default: retrieval.topK)
    #[arg(short = 'k', long)]
    pub top_k: Option<usize>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    /// Execute the ask command.
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ask command");
        tracing::debug!("Ask command options: {:?}", self);

        let mut pipeline = RagPipeline::from_config(config)?;
        if let Some(top_k) = self.top_k {
            pipeline = pipeline.with_top_k(top_k);
        }

        let result = pipeline.ask(&self.question).await?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&result)?);
        } else {
            print!("{}", render_text(&result));
        }

        Ok(())
    }
}

fn render_text(result: &AnswerResult) -> String {
    let mut out = format!("{}\n", result.answer);

    if !result.sources.is_empty() {
        out.push_str("\nSources:\n");
        for source in &result.sources {
            out.push_str(&format!("  - {}\n", source));
        }
    }

    out.push_str(&format!("\nConfidence: {:.2}\n", result.confidence));
    out
}
