//! Serve command handler.

use crate::server;
use clap::Args;
use ragline_core::{config::AppConfig, AppResult};
use ragline_knowledge::RagPipeline;
use std::sync::Arc;

/// Serve the answering pipeline over HTTP
#[derive(Args, Debug)]
pub struct ServeCommand {
    /// Address to bind (default: server.host)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on (default: server.port)
    #[arg(long)]
    pub port: Option<u16>,
}

impl ServeCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing serve command");

        // Index and model client are loaded before binding; failures abort startup
        let pipeline = Arc::new(RagPipeline::from_config(config)?);

        let host = self.host.as_deref().unwrap_or(&config.server.host);
        let port = self.port.unwrap_or(config.server.port);

        server::serve(pipeline, host, port).await
    }
}
