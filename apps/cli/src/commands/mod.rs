//! Command implementations.

pub mod info;
pub mod predict;
pub mod run;
pub mod status;

use std::path::Path;

use anyhow::Context;
use catwalk_core::ModelManager;

/// Builds the manager for the config file at `path`.
pub fn load_manager(path: &Path) -> anyhow::Result<ModelManager> {
    ModelManager::load(path)
        .with_context(|| format!("failed to load configuration from {}", path.display()))
}
