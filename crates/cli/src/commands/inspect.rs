//! Inspect command handler.

use clap::Args;
use ragline_core::{config::AppConfig, AppResult};
use ragline_knowledge::{IndexSnapshot, SourceStats};

/// Show chunk counts per source in the index
#[derive(Args, Debug)]
pub struct InspectCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl InspectCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing inspect command");

        let index = IndexSnapshot::open(&config.retrieval.index_path)?;
        let stats = index.stats();

        if self.json {
            let output = serde_json::json!({
                "index": index.path(),
                "chunks": index.len(),
                "dimensions": index.dimensions(),
                "sources": stats,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            print!("{}", render_stats(&index, &stats));
        }

        Ok(())
    }
}

fn render_stats(index: &IndexSnapshot, stats: &[SourceStats]) -> String {
    let dimensions = index
        .dimensions()
        .map(|d| d.to_string())
        .unwrap_or_else(|| "-".to_string());

    let mut out = format!(
        "Index: {}\nChunks: {}\nDimensions: {}\nSources: {}\n",
        index.path().display(),
        index.len(),
        dimensions,
        stats.len()
    );

    for entry in stats {
        out.push_str(&format!("  {:>6}  {}\n", entry.chunks, entry.source));
    }

    out
}
