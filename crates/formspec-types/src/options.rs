//! Kind-specific prompt options carried by member tags.
//!
//! Every field defaults, so a YAML tag may be as short as `text_prompt: {}`.

use serde::{Deserialize, Serialize};

/// Options for a free-text prompt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextOptions {
    /// Prompt label. Falls back to the member name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Mask the input (passwords, tokens).
    pub secret: bool,
    /// Enable inline search over the free-text input.
    pub search_enabled: bool,
    /// Placeholder shown while searching.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_placeholder: Option<String>,
    /// Locale override for this prompt only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub culture: Option<String>,
}

/// Options for a selection prompt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectOptions {
    /// Prompt label. Falls back to the member name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Name of the member supplying the candidates.
    pub source: String,
    /// Name of the method rendering a candidate as display text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub converter: Option<String>,
    pub search_enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_placeholder: Option<String>,
    /// Locale override for this prompt only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub culture: Option<String>,
}

/// Options for a task step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StepOptions {
    /// Show a busy indicator while an asynchronous step runs.
    pub use_status: bool,
    /// Caption for the busy indicator. Falls back to the member name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_text: Option<String>,
}

/// Search settings forwarded untouched to the prompting surface.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchOptions {
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
}

impl SearchOptions {
    pub fn new(enabled: bool, placeholder: Option<String>) -> Self {
        Self {
            enabled,
            placeholder,
        }
    }
}
