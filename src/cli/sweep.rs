use anyhow::{Context, Result};

use synaptic::config::SynapticConfig;
use synaptic::mind::Mind;

/// Run one decay sweep now and print what it changed.
pub fn sweep(config: SynapticConfig) -> Result<()> {
    let mind = Mind::open(config).context("failed to open mind")?;
    let decay = mind.decay();

    if !decay.is_active() {
        println!("Decay is disabled in config; nothing to do.");
        return Ok(());
    }

    let stats = decay.run_sweep().context("decay sweep failed")?;

    println!("Decay Sweep");
    println!("{}", "=".repeat(40));
    println!("  Memories swept:      {}", stats.memories_swept);
    println!("  Memories updated:    {}", stats.memories_updated);
    println!("  Below threshold:     {}", stats.memories_decayed);
    println!("  Immortal:            {}", stats.memories_immortal);
    println!();
    println!("  Edges swept:         {}", stats.edges_swept);
    println!("  Edges updated:       {}", stats.edges_updated);
    println!("  Edges at minimum:    {}", stats.edges_at_floor);
    println!();
    println!("Completed in {} ms", stats.duration_ms);

    Ok(())
}
