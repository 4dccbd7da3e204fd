//! Predict command implementation.

use std::path::Path;

use anyhow::Context;
use colored::Colorize;

use super::load_manager;

/// Execute the predict command.
pub async fn execute(config: &Path, model: &str, input: &str, json_output: bool) -> anyhow::Result<()> {
    let inputs: serde_json::Value =
        serde_json::from_str(input).context("input is not valid JSON")?;

    let manager = load_manager(config)?;
    let result = manager.predict(model, &inputs).await;
    manager.shutdown().await;
    let prediction = result.with_context(|| format!("prediction with model '{model}' failed"))?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&prediction)?);
    } else {
        println!(
            "{} {} (v{}) in {:.2} ms",
            "Prediction".bold().cyan(),
            prediction.model_id.green(),
            prediction.version,
            prediction.latency_ms
        );
        println!("{}", serde_json::to_string_pretty(&prediction.output)?);
    }
    Ok(())
}
