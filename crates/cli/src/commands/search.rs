//! Search command handler.
//!
//! Retrieval only: prints the ranked chunks a question would be answered from.

use clap::Args;
use ragline_core::{config::AppConfig, AppResult};
use ragline_knowledge::{IndexRetriever, Retriever, ScoredChunk};

/// Characters of chunk text shown per result.
const SNIPPET_CHARS: usize = 180;

/// Show the chunks retrieved for a query
#[derive(Args, Debug)]
pub struct SearchCommand {
    /// Search query
    pub query: String,

    /// Number of results (default: retrieval.topK)
    #[arg(short = 'k', long)]
    pub top_k: Option<usize>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl SearchCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing search command");

        let retriever = IndexRetriever::from_config(config)?;
        let top_k = self.top_k.unwrap_or(config.retrieval.top_k);
        let hits = retriever.search(&self.query, top_k).await?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&hits)?);
            return Ok(());
        }

        if hits.is_empty() {
            println!("No results.");
            return Ok(());
        }

        for (rank, hit) in hits.iter().enumerate() {
            println!("{}", render_hit(rank + 1, hit));
        }

        Ok(())
    }
}

fn render_hit(rank: usize, hit: &ScoredChunk) -> String {
    format!(
        "{}. [{:.3}] {}\n   {}",
        rank,
        hit.score,
        hit.chunk.source,
        snippet(&hit.chunk.text)
    )
}

/// First `SNIPPET_CHARS` characters on a single line.
fn snippet(text: &str) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= SNIPPET_CHARS {
        return flat;
    }
    let cut: String = flat.chars().take(SNIPPET_CHARS).collect();
    format!("{}...", cut.trim_end())
}
