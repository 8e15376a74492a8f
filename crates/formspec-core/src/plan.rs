//! Plan lowering: resolved `FormModel` -> ordered `ExecutionPlan`.
//!
//! Lowering is pure: it performs no I/O and maps members to operations one
//! for one, in member order. Nested forms are expanded through a callback
//! that runs the whole pipeline on the nested type, so a plan owns its
//! children's plans by value.

use formspec_types::declaration::FieldType;
use formspec_types::error::ModelError;
use formspec_types::options::{SearchOptions, StepOptions};
use serde::Serialize;

use crate::binding::StepHandle;
use crate::model::{ConstructorStrategy, FormModel, MemberKind, MemberSpec};
use crate::resolver::{ConverterHandle, MemberBinding, ResolvedBindings, SourceHandle};

// ---------------------------------------------------------------------------
// Plan types
// ---------------------------------------------------------------------------

/// A model that passed binding and constructor resolution.
#[derive(Debug)]
pub struct ResolvedForm {
    pub model: FormModel,
    pub strategy: ConstructorStrategy,
    pub bindings: ResolvedBindings,
}

/// A required dependency the caller must supply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dependency {
    pub name: String,
    pub declared_type: Option<FieldType>,
}

/// One executable operation.
#[derive(Debug, Clone)]
pub enum Operation {
    AskText {
        member: String,
        title: String,
        declared_type: FieldType,
        secret: bool,
        search: SearchOptions,
        culture: Option<String>,
    },
    AskSelect {
        member: String,
        title: String,
        source: SourceHandle,
        converter: Option<ConverterHandle>,
        search: SearchOptions,
        culture: Option<String>,
    },
    RunStep {
        member: String,
        is_async: bool,
        status: StepOptions,
        step: StepHandle,
    },
    Recurse {
        member: String,
        plan: Box<ExecutionPlan>,
    },
}

impl Operation {
    pub fn member(&self) -> &str {
        match self {
            Operation::AskText { member, .. }
            | Operation::AskSelect { member, .. }
            | Operation::RunStep { member, .. }
            | Operation::Recurse { member, .. } => member,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Operation::AskText { .. } => "ask-text",
            Operation::AskSelect { .. } => "ask-select",
            Operation::RunStep { .. } => "run-step",
            Operation::Recurse { .. } => "recurse",
        }
    }

    /// Whether this operation, or anything nested under it, awaits
    /// asynchronous work beyond the prompting surface.
    pub fn is_async(&self) -> bool {
        match self {
            Operation::RunStep { is_async, .. } => *is_async,
            Operation::Recurse { plan, .. } => plan.is_async(),
            _ => false,
        }
    }
}

/// The ordered, fully resolved operations of a form type.
#[derive(Debug, Clone)]
pub struct ExecutionPlan {
    pub type_name: String,
    pub culture: Option<String>,
    pub strategy: ConstructorStrategy,
    pub dependencies: Vec<Dependency>,
    pub operations: Vec<Operation>,
}

impl ExecutionPlan {
    pub fn is_async(&self) -> bool {
        self.operations.iter().any(Operation::is_async)
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Flattened, serializable view for listings.
    pub fn summary(&self) -> Vec<OperationSummary> {
        let mut rows = Vec::new();
        collect_summary(self, "", 0, &mut rows);
        rows
    }
}

/// One row of a plan listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationSummary {
    pub path: String,
    pub operation: &'static str,
    pub depth: usize,
    pub detail: String,
}

fn collect_summary(
    plan: &ExecutionPlan,
    prefix: &str,
    depth: usize,
    rows: &mut Vec<OperationSummary>,
) {
    for op in &plan.operations {
        let path = join_path(prefix, op.member());
        let detail = match op {
            Operation::AskText {
                title,
                declared_type,
                secret,
                ..
            } => format!(
                "\"{title}\" ({declared_type}{})",
                if *secret { ", secret" } else { "" }
            ),
            Operation::AskSelect {
                title,
                source,
                converter,
                ..
            } => match converter {
                Some(conv) => format!("\"{title}\" from {} via {}", source.name(), conv.name),
                None => format!("\"{title}\" from {}", source.name()),
            },
            Operation::RunStep {
                is_async, status, ..
            } => match (is_async, status.use_status) {
                (true, true) => "async, with status".to_string(),
                (true, false) => "async".to_string(),
                (false, _) => "sync".to_string(),
            },
            Operation::Recurse { plan: nested, .. } => format!("form {}", nested.type_name),
        };
        rows.push(OperationSummary {
            path: path.clone(),
            operation: op.label(),
            depth,
            detail,
        });
        if let Operation::Recurse { plan: nested, .. } = op {
            collect_summary(nested, &path, depth + 1, rows);
        }
    }
}

/// Dotted member path, as used in failure reports.
pub fn join_path(prefix: &str, member: &str) -> String {
    if prefix.is_empty() {
        member.to_string()
    } else {
        format!("{prefix}.{member}")
    }
}

// ---------------------------------------------------------------------------
// Lowering
// ---------------------------------------------------------------------------

/// Lower a resolved form into an execution plan.
///
/// `nested` compiles the plan of a nested form type; the compiler passes a
/// callback that tracks in-progress types for cycle detection.
pub fn lower<F>(resolved: ResolvedForm, mut nested: F) -> Result<ExecutionPlan, ModelError>
where
    F: FnMut(&str) -> Result<ExecutionPlan, ModelError>,
{
    let ResolvedForm {
        model,
        strategy,
        mut bindings,
    } = resolved;

    let mut dependencies = Vec::new();
    let mut operations = Vec::with_capacity(model.members.len());

    for member in model.members {
        let binding = bindings.remove(&member.name);
        match lower_member(&model.type_name, member, binding, &mut nested)? {
            Lowered::Dependency(dep) => dependencies.push(dep),
            Lowered::Operation(op) => operations.push(op),
        }
    }

    tracing::debug!(
        form = model.type_name.as_str(),
        operations = operations.len(),
        dependencies = dependencies.len(),
        "lowered execution plan"
    );

    Ok(ExecutionPlan {
        type_name: model.type_name,
        culture: model.culture,
        strategy,
        dependencies,
        operations,
    })
}

enum Lowered {
    Dependency(Dependency),
    Operation(Operation),
}

fn lower_member<F>(
    type_name: &str,
    member: MemberSpec,
    binding: Option<MemberBinding>,
    nested: &mut F,
) -> Result<Lowered, ModelError>
where
    F: FnMut(&str) -> Result<ExecutionPlan, ModelError>,
{
    let unbound = |member: &str| ModelError::MissingImplementation {
        type_name: type_name.to_string(),
        name: member.to_string(),
    };

    let MemberSpec {
        name,
        declared_type,
        kind,
    } = member;

    let lowered = match (kind, binding) {
        (MemberKind::Dependency(_), _) => Lowered::Dependency(Dependency {
            name,
            declared_type,
        }),
        (MemberKind::TextPrompt(options), _) => Lowered::Operation(Operation::AskText {
            title: options.title.unwrap_or_else(|| name.clone()),
            declared_type: declared_type.unwrap_or(FieldType::Text),
            secret: options.secret,
            search: SearchOptions::new(options.search_enabled, options.search_placeholder),
            culture: options.culture,
            member: name,
        }),
        (MemberKind::SelectPrompt(options), Some(MemberBinding::Select { source, converter })) => {
            Lowered::Operation(Operation::AskSelect {
                title: options.title.unwrap_or_else(|| name.clone()),
                source,
                converter,
                search: SearchOptions::new(options.search_enabled, options.search_placeholder),
                culture: options.culture,
                member: name,
            })
        }
        (MemberKind::TaskStep { is_async, options }, Some(MemberBinding::Step(step))) => {
            Lowered::Operation(Operation::RunStep {
                member: name,
                is_async,
                status: options,
                step,
            })
        }
        (MemberKind::NestedForm { form }, _) => {
            let plan = nested(&form)?;
            Lowered::Operation(Operation::Recurse {
                member: name,
                plan: Box::new(plan),
            })
        }
        (MemberKind::SelectPrompt(_) | MemberKind::TaskStep { .. }, _) => {
            return Err(unbound(&name));
        }
    };

    Ok(lowered)
}
