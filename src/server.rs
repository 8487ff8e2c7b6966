//! MCP server over stdio.
//!
//! [`serve_stdio`] opens the [`Mind`], starts the background decay sweep and
//! serves the tool handler until the client disconnects.

use crate::config::SynapticConfig;
use crate::mind::Mind;
use crate::scheduler::SweepScheduler;
use crate::tools::MindTools;
use anyhow::{Context, Result};
use rmcp::ServiceExt;
use std::sync::Arc;

/// Start the MCP server over stdio transport.
pub async fn serve_stdio(config: SynapticConfig) -> Result<()> {
    tracing::info!("starting Synaptic MCP server on stdio");

    let mind = tokio::task::spawn_blocking(move || Mind::open(config))
        .await
        .context("startup task failed")?
        .context("failed to open mind")?;
    let mind = Arc::new(mind);

    let scheduler = SweepScheduler::start(mind.decay().clone());

    let tools = MindTools::new(Arc::clone(&mind));
    let transport = rmcp::transport::stdio();

    let server = tools.serve(transport).await?;
    tracing::info!("MCP server running, waiting for client");

    let served = server.waiting().await;

    if let Some(scheduler) = scheduler {
        scheduler.stop().await;
    }
    served?;
    tracing::info!("MCP server shut down");

    Ok(())
}
