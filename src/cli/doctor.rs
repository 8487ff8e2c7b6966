//! CLI `doctor` command: database diagnostics for both backends.

use anyhow::{Context, Result};
use std::path::Path;

use synaptic::config::SynapticConfig;
use synaptic::db::{self, bootstrap};

/// Run database diagnostics and print a health report.
pub fn doctor(config: &SynapticConfig) -> Result<()> {
    let db_path = config.resolved_db_path();

    if !db_path.exists() {
        println!("Database: not found at {}", db_path.display());
        println!("Run `synaptic serve` to initialize.");
        return Ok(());
    }

    let conn = db::open_database(&db_path).context("failed to open database (may be corrupt)")?;
    let report = db::check_database_health(&conn).context("failed to run health check")?;

    println!("Synaptic Health Report");
    println!("======================");
    println!();
    println!("Database:          {}", db_path.display());
    println!("File size:         {}", format_bytes(file_size(&db_path)));
    println!("Schema version:    {}", report.schema_version);
    println!();
    println!("Row counts:");
    println!("  Nodes:           {}", report.node_count);
    println!("  Edges:           {}", report.edge_count);
    println!("  Memories:        {}", report.memory_count);
    println!("  Activations:     {}", report.activation_count);
    println!();
    if report.integrity_ok {
        println!("Integrity check:   PASSED");
    } else {
        println!("Integrity check:   FAILED ({})", report.integrity_details);
    }
    println!();

    println!("Fast mirror:");
    match config.resolved_fast_path() {
        None => println!("  Status:          disabled"),
        Some(fast) if !fast.exists() => {
            println!("  Path:            {}", fast.display());
            println!("  Status:          not created yet (copied on next start)");
        }
        Some(fast) => {
            println!("  Path:            {}", fast.display());
            println!("  File size:       {}", format_bytes(file_size(&fast)));
            if bootstrap::stale_marker_path(&fast).exists() {
                println!("  Status:          STALE (re-copied from durable on next start)");
            } else {
                match db::open_read_only(&fast).and_then(|c| db::check_database_health(&c)) {
                    Ok(mirror) if same_counts(&report, &mirror) => println!("  Status:          OK (in sync)"),
                    Ok(_) => println!("  Status:          OUT OF SYNC (re-copied on next start)"),
                    Err(e) => println!("  Status:          UNREADABLE ({e})"),
                }
            }
        }
    }

    if !report.integrity_ok {
        println!();
        println!("Recovery steps:");
        println!("  1. Stop the server.");
        println!("  2. Restore the durable database from a backup.");
        println!("  3. Delete the fast mirror; it is rebuilt from durable on start.");
    }

    Ok(())
}

fn same_counts(a: &db::HealthReport, b: &db::HealthReport) -> bool {
    a.node_count == b.node_count
        && a.edge_count == b.edge_count
        && a.memory_count == b.memory_count
        && a.activation_count == b.activation_count
}

fn file_size(path: &Path) -> u64 {
    std::fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
