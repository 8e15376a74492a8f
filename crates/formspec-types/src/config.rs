//! Engine configuration types for formspec.
//!
//! `EngineConfig` represents the `config.toml` that tunes plan compilation
//! and the terminal surface. All fields have sensible defaults.

use serde::{Deserialize, Serialize};

/// Top-level engine configuration.
///
/// Loaded from `~/.formspec/config.toml` or an explicit `--config` path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Locale used when neither the form nor the member sets one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_culture: Option<String>,

    /// Maximum nested-form depth accepted by plan lowering.
    #[serde(default = "default_max_nesting_depth")]
    pub max_nesting_depth: u32,

    /// Spinner tick interval for status indicators, in milliseconds.
    #[serde(default = "default_status_tick_ms")]
    pub status_tick_ms: u64,

    /// indicatif template for status indicators.
    #[serde(default = "default_status_template")]
    pub status_template: String,
}

fn default_max_nesting_depth() -> u32 {
    16
}

fn default_status_tick_ms() -> u64 {
    80
}

fn default_status_template() -> String {
    "{spinner:.cyan} {msg}".to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_culture: None,
            max_nesting_depth: default_max_nesting_depth(),
            status_tick_ms: default_status_tick_ms(),
            status_template: default_status_template(),
        }
    }
}
