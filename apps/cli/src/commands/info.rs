//! Info command implementation.

use std::path::Path;

use catwalk_core::config::format_size;
use colored::Colorize;

use super::load_manager;

/// Execute the info command.
pub fn execute(config: &Path, model: &str, json_output: bool) -> anyhow::Result<()> {
    let manager = load_manager(config)?;
    let info = manager.model_info(model)?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(());
    }

    println!("{}", info.id.bold().cyan());
    println!("  Version: {}", info.version);
    println!("  Format: {}", info.format);
    println!("  Path: {}", info.path.display());
    println!("  State: {}", info.state);
    println!("  Memory estimate: {}", format_size(info.memory_estimate));
    println!("  Memory usage: {}", format_size(info.memory_usage));
    println!(
        "  Inferences: {} (avg {:.2}ms)",
        info.inference.requests, info.inference.avg_latency_ms
    );
    match info.last_used {
        Some(at) => println!("  Last used: {}", at.to_rfc3339()),
        None => println!("  Last used: {}", "never".dimmed()),
    }
    Ok(())
}
