//! Scripted prompting surface for executor and factory tests.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::Mutex;

use formspec_types::error::{PromptError, StepError};
use futures_util::future::BoxFuture;

use crate::surface::{PromptSurface, SelectRequest, TextRequest};

/// One scripted reply, consumed in order.
#[derive(Debug, Clone)]
pub enum Answer {
    Text(String),
    Select(usize),
    Fail(PromptError),
    /// Never answers; used to exercise cancellation.
    Hang,
}

impl Answer {
    pub fn text(value: &str) -> Self {
        Answer::Text(value.to_string())
    }
}

#[derive(Default)]
pub struct ScriptedSurface {
    answers: Mutex<VecDeque<Answer>>,
    text_requests: Mutex<Vec<TextRequest>>,
    select_requests: Mutex<Vec<SelectRequest>>,
    statuses: Mutex<Vec<String>>,
}

impl ScriptedSurface {
    pub fn new<I: IntoIterator<Item = Answer>>(answers: I) -> Self {
        Self {
            answers: Mutex::new(answers.into_iter().collect()),
            ..Default::default()
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn remaining(&self) -> usize {
        self.answers.lock().unwrap().len()
    }

    pub fn text_requests(&self) -> Vec<TextRequest> {
        self.text_requests.lock().unwrap().clone()
    }

    pub fn select_requests(&self) -> Vec<SelectRequest> {
        self.select_requests.lock().unwrap().clone()
    }

    pub fn statuses(&self) -> Vec<String> {
        self.statuses.lock().unwrap().clone()
    }

    fn next(&self) -> Option<Answer> {
        self.answers.lock().unwrap().pop_front()
    }
}

impl PromptSurface for ScriptedSurface {
    async fn ask_text(&self, request: TextRequest) -> Result<String, PromptError> {
        self.text_requests.lock().unwrap().push(request);
        match self.next() {
            Some(Answer::Text(value)) => Ok(value),
            Some(Answer::Fail(err)) => Err(err),
            Some(Answer::Hang) => std::future::pending().await,
            other => panic!("scripted surface expected a text answer, got {other:?}"),
        }
    }

    async fn ask_select(&self, request: SelectRequest) -> Result<usize, PromptError> {
        self.select_requests.lock().unwrap().push(request);
        match self.next() {
            Some(Answer::Select(index)) => Ok(index),
            Some(Answer::Fail(err)) => Err(err),
            Some(Answer::Hang) => std::future::pending().await,
            other => panic!("scripted surface expected a selection, got {other:?}"),
        }
    }

    fn show_status<'a>(
        &'a self,
        caption: &'a str,
        work: BoxFuture<'a, Result<(), StepError>>,
    ) -> impl Future<Output = Result<(), StepError>> + Send + 'a {
        self.statuses.lock().unwrap().push(caption.to_string());
        work
    }
}
