//! Run command implementation.

use std::path::Path;
use std::time::Duration;

use colored::Colorize;
use tokio::time::MissedTickBehavior;
use tracing::info;

use super::load_manager;
use super::status::print_human;

/// Execute the run command.
///
/// Preloads models, starts the sweeper and prints status periodically until
/// Ctrl-C or until `duration` seconds have passed.
pub async fn execute(config: &Path, status_interval: u64, duration: Option<u64>) -> anyhow::Result<()> {
    anyhow::ensure!(status_interval > 0, "--status-interval must be greater than 0");

    let manager = load_manager(config)?;
    let report = manager.start().await;

    println!(
        "{} {} model(s) preloaded",
        "Catwalk running:".bold().cyan(),
        report.loaded.len().to_string().green()
    );
    for failure in &report.failed {
        println!("  {} {}: {}", "preload failed".red(), failure.id, failure.error);
    }

    let deadline = async {
        match duration {
            Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
            None => std::future::pending().await,
        }
    };
    tokio::pin!(deadline);

    let mut ticker = tokio::time::interval(Duration::from_secs(status_interval));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => print_human(&manager.status(), &manager.metrics()),
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
            () = &mut deadline => break,
        }
    }

    manager.shutdown().await;
    println!("{}", "Catwalk stopped".bold());
    Ok(())
}
