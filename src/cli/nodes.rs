use anyhow::{Context, Result};

use synaptic::config::SynapticConfig;
use synaptic::mind::Mind;

/// Print the node catalog grouped by category.
pub fn nodes(config: SynapticConfig, category: Option<&str>) -> Result<()> {
    let mind = Mind::open(config).context("failed to open mind")?;
    let grouped = mind.list_nodes(category)?;

    if grouped.is_empty() {
        match category {
            Some(c) => println!("No nodes in category '{c}'."),
            None => println!("The catalog is empty."),
        }
        return Ok(());
    }

    for (category, nodes) in &grouped {
        println!("{category} ({})", nodes.len());
        for node in nodes {
            match &node.description {
                Some(desc) => println!("  {:<24} {:>5}  {desc}", node.name, node.activation_count),
                None => println!("  {:<24} {:>5}", node.name, node.activation_count),
            }
        }
        println!();
    }

    let total: usize = grouped.values().map(Vec::len).sum();
    println!("{total} nodes in {} categories", grouped.len());
    Ok(())
}
