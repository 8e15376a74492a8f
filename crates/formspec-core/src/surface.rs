//! PromptSurface trait: the rendering capability the executor drives.
//!
//! Uses native async fn in traits (RPITIT, Rust 2024 edition). The executor
//! is generic over the surface, so no object-safe wrapper is needed.
//! Implementations live outside this crate (the CLI's `TerminalSurface`,
//! scripted surfaces in tests).

use std::future::Future;

use formspec_types::error::{PromptError, StepError};
use futures_util::future::BoxFuture;

/// A free-text prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextRequest {
    pub title: String,
    pub secret: bool,
    pub search_enabled: bool,
    pub placeholder: Option<String>,
    /// Effective locale: member override, then form, then engine default.
    pub culture: Option<String>,
}

/// A selection prompt. `labels` are already rendered, one per candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectRequest {
    pub title: String,
    pub labels: Vec<String>,
    pub search_enabled: bool,
    pub placeholder: Option<String>,
    pub culture: Option<String>,
}

pub trait PromptSurface: Send + Sync {
    /// Ask for free text. Coercion to the member type is the executor's job.
    fn ask_text(
        &self,
        request: TextRequest,
    ) -> impl Future<Output = Result<String, PromptError>> + Send;

    /// Ask the user to pick one label; returns its index.
    fn ask_select(
        &self,
        request: SelectRequest,
    ) -> impl Future<Output = Result<usize, PromptError>> + Send;

    /// Drive `work` to completion while showing a busy indicator, and
    /// return its result unchanged.
    fn show_status<'a>(
        &'a self,
        caption: &'a str,
        work: BoxFuture<'a, Result<(), StepError>>,
    ) -> impl Future<Output = Result<(), StepError>> + Send + 'a;
}
