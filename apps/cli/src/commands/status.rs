//! Status command implementation.

use std::path::Path;

use catwalk_core::config::format_size;
use catwalk_core::{CacheStatus, EntryState, ServingMetrics};
use colored::Colorize;
use serde::Serialize;

use super::load_manager;

#[derive(Serialize)]
struct StatusOutput {
    cache: CacheStatus,
    metrics: ServingMetrics,
}

/// Execute the status command.
pub async fn execute(config: &Path, preload: bool, json_output: bool) -> anyhow::Result<()> {
    let manager = load_manager(config)?;
    if preload {
        manager.preload().await;
    }

    let output = StatusOutput { cache: manager.status(), metrics: manager.metrics() };
    manager.shutdown().await;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_human(&output.cache, &output.metrics);
    }
    Ok(())
}

pub(crate) fn print_human(status: &CacheStatus, metrics: &ServingMetrics) {
    println!("{}", "Catwalk Status".bold().cyan());
    println!();

    println!("{}", "Cache:".bold());
    println!(
        "  Resident: {} / {} ({:.1}%)",
        format_size(status.resident_bytes).green(),
        format_size(status.hard_limit_bytes),
        status.utilization * 100.0
    );
    println!("  Soft limit: {}", format_size(status.soft_limit_bytes));
    println!("  Loaded models: {}", status.loaded_count);
    println!();

    println!("{}", "Models:".bold());
    if status.entries.is_empty() {
        println!("  {}", "No models configured".yellow());
    }
    for entry in &status.entries {
        let state = match entry.state {
            EntryState::Loaded => entry.state.to_string().green(),
            EntryState::Loading | EntryState::Evicting => entry.state.to_string().yellow(),
            EntryState::Unloaded => entry.state.to_string().dimmed(),
        };
        println!(
            "  {} {} {} refs={} accesses={}",
            entry.id.cyan(),
            state,
            format_size(entry.size_bytes),
            entry.ref_count,
            entry.access_count
        );
    }
    println!();

    let inference = &metrics.inference;
    let metrics = &metrics.cache;
    println!("{}", "Metrics:".bold());
    println!(
        "  Hits: {}  Misses: {}  Hit rate: {:.1}%",
        metrics.hits,
        metrics.misses,
        metrics.hit_rate() * 100.0
    );
    println!(
        "  Loads: {}  Failures: {}  Evictions: {} (soft {}, hard {}, ttl {})",
        metrics.loads,
        metrics.load_failures,
        metrics.evictions.total,
        metrics.evictions.soft,
        metrics.evictions.hard,
        metrics.evictions.ttl
    );

    if !inference.is_empty() {
        println!();
        println!("{}", "Inference:".bold());
        for (id, stats) in inference {
            println!(
                "  {} requests={} failures={} avg={:.2}ms max={:.2}ms",
                id.cyan(),
                stats.requests,
                stats.failures,
                stats.avg_latency_ms,
                stats.max_latency_ms
            );
        }
    }
}
