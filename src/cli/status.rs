use anyhow::{Context, Result};

use synaptic::config::SynapticConfig;
use synaptic::mind::Mind;

/// Display graph and decay statistics in the terminal.
pub fn status(config: SynapticConfig) -> Result<()> {
    let mind = Mind::open(config).context("failed to open mind")?;
    let status = mind.status()?;
    let graph = &status.graph;

    println!("Synaptic Status");
    println!("{}", "=".repeat(40));
    println!("  Nodes:               {}", graph.node_count);
    println!("  Edges:               {}", graph.edge_count);
    println!("  Memories:            {}", graph.memory_count);
    println!("  Total activations:   {}", graph.total_activations);
    println!();

    if !graph.strongest_edges.is_empty() {
        println!("Strongest connections:");
        for edge in &graph.strongest_edges {
            println!(
                "  {:<20} <-> {:<20} {:>6.3}  ({}x)",
                edge.source, edge.target, edge.weight, edge.co_activation_count
            );
        }
        println!();
    }

    if !graph.most_active_nodes.is_empty() {
        println!("Most active concepts:");
        for node in &graph.most_active_nodes {
            println!("  {:<24} {:<14} {}", node.name, node.category, node.activation_count);
        }
        println!();
    }

    let decay = &status.decay_stats;
    println!("Decay:");
    println!("  Memory decay:        {}", on_off(status.decay.params.enabled));
    println!("  Edge decay:          {}", on_off(status.decay.params.edge_decay_enabled));
    println!(
        "  Memories:            {} immortal, {} active, {} decayed",
        decay.memories_immortal, decay.memories_active, decay.memories_decayed
    );
    println!(
        "  Edges:               {} at minimum, {} above (avg weight {:.3})",
        decay.edges_at_minimum, decay.edges_above_minimum, decay.average_edge_weight
    );
    println!();

    let dual = &status.dual_write;
    println!("Storage:");
    println!("  Durable:             {}", dual.durable_path.as_deref().unwrap_or("(in memory)"));
    match (&dual.fast_path, dual.enabled) {
        (Some(path), true) if dual.fast_stale => println!("  Fast mirror:         {path} (STALE, reads use durable)"),
        (Some(path), true) => println!("  Fast mirror:         {path}"),
        _ => println!("  Fast mirror:         disabled"),
    }

    Ok(())
}

fn on_off(enabled: bool) -> &'static str {
    if enabled {
        "enabled"
    } else {
        "disabled"
    }
}
