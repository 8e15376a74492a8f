//! Engine configuration loader.
//!
//! Reads `config.toml` from `--config <path>` or `~/.formspec/config.toml`
//! and deserializes it into [`EngineConfig`]. The default file is optional
//! and a broken one only costs a warning. An explicit path must exist and
//! parse.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use formspec_types::config::EngineConfig;

const CONFIG_FILE: &str = "config.toml";

/// Resolve the formspec data directory.
///
/// Priority:
/// 1. `FORMSPEC_HOME` environment variable
/// 2. `~/.formspec`
/// 3. `.formspec` in the current directory
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("FORMSPEC_HOME") {
        return PathBuf::from(dir);
    }

    if let Some(home) = dirs::home_dir() {
        return home.join(".formspec");
    }

    PathBuf::from(".formspec")
}

/// Load the engine configuration.
pub async fn load_engine_config(explicit: Option<&Path>) -> Result<EngineConfig> {
    match explicit {
        Some(path) => read_config(path)
            .await?
            .with_context(|| format!("Failed to read config file {}: not found", path.display())),
        None => Ok(load_default_config(&resolve_data_dir()).await),
    }
}

/// Load `{data_dir}/config.toml`. Any problem with the file is logged and
/// the defaults are used instead.
pub async fn load_default_config(data_dir: &Path) -> EngineConfig {
    let path = data_dir.join(CONFIG_FILE);
    match read_config(&path).await {
        Ok(Some(config)) => config,
        Ok(None) => {
            tracing::debug!(path = %path.display(), "no engine config, using defaults");
            EngineConfig::default()
        }
        Err(err) => {
            tracing::warn!(path = %path.display(), "ignoring engine config: {err:#}");
            EngineConfig::default()
        }
    }
}

/// Read and parse a config file. A missing file is `Ok(None)`.
async fn read_config(path: &Path) -> Result<Option<EngineConfig>> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => {
            return Err(err)
                .with_context(|| format!("Failed to read config file {}", path.display()));
        }
    };
    let config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file {}", path.display()))?;
    Ok(Some(config))
}
