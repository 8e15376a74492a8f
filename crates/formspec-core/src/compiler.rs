//! Pipeline driver and plan cache.
//!
//! `FormCompiler` runs extraction, binding resolution, constructor
//! resolution and lowering for a type, recursing into nested forms. It keeps
//! the stack of types being compiled so a type that (transitively) nests
//! itself is reported instead of recursing forever.

use std::sync::Arc;

use dashmap::DashMap;
use formspec_types::error::ModelError;

use crate::catalog::FormCatalog;
use crate::constructor::resolve_constructor;
use crate::extractor::extract_model;
use crate::plan::{lower, ExecutionPlan, ResolvedForm};
use crate::resolver::resolve_bindings;

// ---------------------------------------------------------------------------
// Compiler
// ---------------------------------------------------------------------------

pub struct FormCompiler<'c> {
    catalog: &'c FormCatalog,
    max_depth: u32,
}

impl<'c> FormCompiler<'c> {
    pub fn new(catalog: &'c FormCatalog, max_depth: u32) -> Self {
        Self { catalog, max_depth }
    }

    /// Compile the full plan of `type_name`, nested forms included.
    pub fn compile(&self, type_name: &str) -> Result<ExecutionPlan, ModelError> {
        let mut in_progress = Vec::new();
        self.compile_nested(type_name, &mut in_progress)
    }

    fn compile_nested(
        &self,
        type_name: &str,
        in_progress: &mut Vec<String>,
    ) -> Result<ExecutionPlan, ModelError> {
        if let Some(pos) = in_progress.iter().position(|t| t == type_name) {
            let mut path = in_progress[pos..].to_vec();
            path.push(type_name.to_string());
            return Err(ModelError::CyclicNesting(path.join(" -> ")));
        }

        let depth = u32::try_from(in_progress.len()).unwrap_or(u32::MAX);
        if depth > self.max_depth {
            return Err(ModelError::NestingTooDeep {
                type_name: type_name.to_string(),
                depth,
                max: self.max_depth,
            });
        }

        let decl = self.catalog.declaration(type_name)?;
        let mut model = extract_model(decl)?;
        let bindings = resolve_bindings(decl, &model, self.catalog.bindings(type_name))?;
        let strategy = resolve_constructor(decl, &mut model)?;

        in_progress.push(type_name.to_string());
        let lowered = lower(
            ResolvedForm {
                model,
                strategy,
                bindings,
            },
            |nested| self.compile_nested(nested, in_progress),
        );
        in_progress.pop();

        lowered
    }
}

// ---------------------------------------------------------------------------
// Plan cache
// ---------------------------------------------------------------------------

/// Compiled plans keyed by type name.
///
/// Compilation is deterministic, so two callers racing on the same type
/// produce equivalent plans and whichever lands first is kept. Failures are
/// not cached.
#[derive(Debug, Default)]
pub struct PlanCache {
    plans: DashMap<String, Arc<ExecutionPlan>>,
}

impl PlanCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_compile(
        &self,
        compiler: &FormCompiler<'_>,
        type_name: &str,
    ) -> Result<Arc<ExecutionPlan>, ModelError> {
        if let Some(plan) = self.plans.get(type_name) {
            tracing::trace!(form = type_name, "plan cache hit");
            return Ok(Arc::clone(plan.value()));
        }

        let plan = Arc::new(compiler.compile(type_name)?);
        tracing::debug!(
            form = type_name,
            operations = plan.operations.len(),
            is_async = plan.is_async(),
            "compiled form plan"
        );
        let entry = self.plans.entry(type_name.to_string()).or_insert(plan);
        Ok(Arc::clone(entry.value()))
    }

    pub fn invalidate(&self, type_name: &str) -> bool {
        self.plans.remove(type_name).is_some()
    }

    pub fn clear(&self) {
        self.plans.clear();
    }

    pub fn len(&self) -> usize {
        self.plans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plans.is_empty()
    }
}
