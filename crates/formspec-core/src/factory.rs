//! FormFactory: the entry point callers use to build and run forms.
//!
//! Owns the catalog, the plan cache and the prompting surface. Plans are
//! compiled on first use and shared afterwards.

use std::sync::Arc;

use formspec_types::config::EngineConfig;
use formspec_types::error::ModelError;
use formspec_types::instance::FormInstance;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::catalog::FormCatalog;
use crate::compiler::{FormCompiler, PlanCache};
use crate::executor::{construct_instance, ExecutionError, Executor, RunFailure};
use crate::plan::ExecutionPlan;
use crate::surface::PromptSurface;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum FormError {
    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("cannot construct form '{type_name}': {source}")]
    Construction {
        type_name: String,
        source: ExecutionError,
    },

    #[error(transparent)]
    Run(Box<RunFailure>),

    #[error("typed form conversion failed: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("failed to start blocking runtime: {0}")]
    Runtime(#[from] std::io::Error),
}

impl FormError {
    /// The partially populated instance of a failed run.
    pub fn partial(&self) -> Option<&FormInstance> {
        match self {
            FormError::Run(failure) => Some(&failure.partial),
            _ => None,
        }
    }
}

impl From<RunFailure> for FormError {
    fn from(failure: RunFailure) -> Self {
        FormError::Run(Box::new(failure))
    }
}

// ---------------------------------------------------------------------------
// Factory
// ---------------------------------------------------------------------------

pub struct FormFactory<S> {
    catalog: Arc<FormCatalog>,
    cache: PlanCache,
    surface: S,
    config: EngineConfig,
    cancel: CancellationToken,
}

impl<S: PromptSurface> FormFactory<S> {
    pub fn new(catalog: Arc<FormCatalog>, surface: S) -> Self {
        Self {
            catalog,
            cache: PlanCache::new(),
            surface,
            config: EngineConfig::default(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Runs started by this factory observe `cancel` (through child tokens).
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn catalog(&self) -> &FormCatalog {
        &self.catalog
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Compiled plan of `type_name`, from cache when available.
    pub fn plan(&self, type_name: &str) -> Result<Arc<ExecutionPlan>, ModelError> {
        let compiler = FormCompiler::new(&self.catalog, self.config.max_nesting_depth);
        self.cache.get_or_compile(&compiler, type_name)
    }

    /// Construct a fresh instance from `supplied` dependency values, then
    /// run its plan.
    pub async fn build(
        &self,
        type_name: &str,
        supplied: Map<String, Value>,
    ) -> Result<FormInstance, FormError> {
        let plan = self.plan(type_name)?;
        let instance =
            construct_instance(&plan, supplied).map_err(|source| FormError::Construction {
                type_name: type_name.to_string(),
                source,
            })?;
        self.execute(&plan, instance).await
    }

    /// Run the plan of `existing`'s type against it, skipping construction.
    pub async fn run(&self, existing: FormInstance) -> Result<FormInstance, FormError> {
        let plan = self.plan(existing.type_name())?;
        self.execute(&plan, existing).await
    }

    pub async fn build_typed<T: DeserializeOwned>(
        &self,
        type_name: &str,
        supplied: Map<String, Value>,
    ) -> Result<T, FormError> {
        let instance = self.build(type_name, supplied).await?;
        Ok(instance.into_typed()?)
    }

    pub async fn run_typed<T: Serialize + DeserializeOwned>(
        &self,
        type_name: &str,
        existing: T,
    ) -> Result<T, FormError> {
        let instance = FormInstance::from_typed(type_name, &existing)?;
        let populated = self.run(instance).await?;
        Ok(populated.into_typed()?)
    }

    /// Blocking `build`, for plans without asynchronous operations.
    ///
    /// Must not be called from inside a tokio runtime.
    pub fn build_blocking(
        &self,
        type_name: &str,
        supplied: Map<String, Value>,
    ) -> Result<FormInstance, FormError> {
        self.ensure_sync(type_name)?;
        blocking_runtime()?.block_on(self.build(type_name, supplied))
    }

    /// Blocking `run`, for plans without asynchronous operations.
    ///
    /// Must not be called from inside a tokio runtime.
    pub fn run_blocking(&self, existing: FormInstance) -> Result<FormInstance, FormError> {
        self.ensure_sync(existing.type_name())?;
        blocking_runtime()?.block_on(self.run(existing))
    }

    fn ensure_sync(&self, type_name: &str) -> Result<(), ModelError> {
        if self.plan(type_name)?.is_async() {
            return Err(ModelError::AsyncPlanRequiresAsyncRun(type_name.to_string()));
        }
        Ok(())
    }

    async fn execute(
        &self,
        plan: &ExecutionPlan,
        instance: FormInstance,
    ) -> Result<FormInstance, FormError> {
        let executor = Executor::new(&self.surface)
            .with_cancellation(self.cancel.child_token())
            .with_default_culture(self.config.default_culture.clone());
        Ok(executor.run(plan, instance).await?)
    }
}

fn blocking_runtime() -> std::io::Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
}
