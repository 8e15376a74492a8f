//! TerminalSurface: dialoguer prompts and indicatif status spinners.
//!
//! dialoguer blocks on terminal input, so every prompt runs on tokio's
//! blocking pool.

use std::future::Future;
use std::time::Duration;

use dialoguer::{FuzzySelect, Input, Password, Select};
use formspec_core::surface::{PromptSurface, SelectRequest, TextRequest};
use formspec_types::config::EngineConfig;
use formspec_types::error::{PromptError, StepError};
use futures_util::future::BoxFuture;
use indicatif::{ProgressBar, ProgressStyle};

pub struct TerminalSurface {
    tick: Duration,
    template: String,
}

impl TerminalSurface {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            tick: Duration::from_millis(config.status_tick_ms),
            template: config.status_template.clone(),
        }
    }

    fn spinner_style(&self) -> ProgressStyle {
        ProgressStyle::default_spinner()
            .template(&self.template)
            .unwrap_or_else(|err| {
                tracing::warn!(template = self.template.as_str(), "invalid status template: {err}");
                ProgressStyle::default_spinner()
            })
    }
}

impl PromptSurface for TerminalSurface {
    async fn ask_text(&self, request: TextRequest) -> Result<String, PromptError> {
        tokio::task::spawn_blocking(move || read_text(&request))
            .await
            .map_err(|e| PromptError::Io(e.to_string()))?
    }

    async fn ask_select(&self, request: SelectRequest) -> Result<usize, PromptError> {
        tokio::task::spawn_blocking(move || read_selection(&request))
            .await
            .map_err(|e| PromptError::Io(e.to_string()))?
    }

    fn show_status<'a>(
        &'a self,
        caption: &'a str,
        work: BoxFuture<'a, Result<(), StepError>>,
    ) -> impl Future<Output = Result<(), StepError>> + Send + 'a {
        async move {
            let spinner = ProgressBar::new_spinner();
            spinner.set_style(self.spinner_style());
            spinner.set_message(caption.to_string());
            spinner.enable_steady_tick(self.tick);

            let result = work.await;

            spinner.finish_and_clear();
            result
        }
    }
}

fn prompt_label(title: &str, search_enabled: bool, placeholder: Option<&str>) -> String {
    match (search_enabled, placeholder) {
        (true, Some(hint)) => format!("{title} ({hint})"),
        _ => title.to_string(),
    }
}

fn read_text(request: &TextRequest) -> Result<String, PromptError> {
    tracing::trace!(culture = ?request.culture, title = request.title.as_str(), "text prompt");
    let label = prompt_label(
        &request.title,
        request.search_enabled,
        request.placeholder.as_deref(),
    );

    let answer = if request.secret {
        Password::new().with_prompt(label).interact()
    } else {
        Input::<String>::new().with_prompt(label).interact_text()
    };
    answer.map_err(|e| PromptError::Io(e.to_string()))
}

fn read_selection(request: &SelectRequest) -> Result<usize, PromptError> {
    tracing::trace!(culture = ?request.culture, candidates = request.labels.len(), "select prompt");
    let label = prompt_label(
        &request.title,
        request.search_enabled,
        request.placeholder.as_deref(),
    );

    let chosen = if request.search_enabled {
        FuzzySelect::new()
            .with_prompt(label)
            .items(&request.labels)
            .default(0)
            .interact_opt()
    } else {
        Select::new()
            .with_prompt(label)
            .items(&request.labels)
            .default(0)
            .interact_opt()
    };

    chosen
        .map_err(|e| PromptError::Io(e.to_string()))?
        .ok_or(PromptError::Cancelled)
}
