mod cli;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use synaptic::config::SynapticConfig;
use synaptic::server;

#[derive(Parser)]
#[command(name = "synaptic", version, about = "Hebbian associative memory MCP server")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the MCP server (stdio transport) with the background decay sweep
    Serve,
    /// Print graph, decay and storage statistics
    Status,
    /// Run one decay sweep now
    Sweep,
    /// List the concept catalog
    Nodes {
        /// Only show this category
        #[arg(long)]
        category: Option<String>,
    },
    /// Check schema, integrity and the fast mirror
    Doctor,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = SynapticConfig::load()?;

    // Log to stderr so stdout stays clean for MCP JSON-RPC.
    let filter = EnvFilter::try_new(&config.server.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Serve => server::serve_stdio(config).await?,
        Command::Status => cli::status::status(config)?,
        Command::Sweep => cli::sweep::sweep(config)?,
        Command::Nodes { category } => cli::nodes::nodes(config, category.as_deref())?,
        Command::Doctor => cli::doctor::doctor(&config)?,
    }

    Ok(())
}
