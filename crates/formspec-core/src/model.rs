//! Structural model of a form type, as produced by the extractor and
//! annotated by constructor resolution.

use formspec_types::declaration::{FieldType, ParameterDeclaration};
use formspec_types::options::{SelectOptions, StepOptions, TextOptions};
use serde::Serialize;

/// How the engine obtains a fresh instance of the form type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "parameters", rename_all = "snake_case")]
pub enum ConstructorStrategy {
    /// Zero-argument construction.
    Default,
    /// The only declared constructor, which takes parameters.
    SingleExplicit(Vec<ParameterDeclaration>),
    /// The constructor explicitly marked as designated.
    MarkedExplicit(Vec<ParameterDeclaration>),
}

impl ConstructorStrategy {
    pub fn parameters(&self) -> &[ParameterDeclaration] {
        match self {
            ConstructorStrategy::Default => &[],
            ConstructorStrategy::SingleExplicit(params)
            | ConstructorStrategy::MarkedExplicit(params) => params,
        }
    }
}

/// Where a required dependency comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencySource {
    ConstructorParameter,
    RequiredProperty,
}

/// Kind of a member, with its kind-specific options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemberKind {
    TextPrompt(TextOptions),
    SelectPrompt(SelectOptions),
    TaskStep { is_async: bool, options: StepOptions },
    NestedForm { form: String },
    /// Supplied by the caller before the plan runs; produces no operation.
    Dependency(DependencySource),
}

impl MemberKind {
    pub fn label(&self) -> &'static str {
        match self {
            MemberKind::TextPrompt(_) => "text",
            MemberKind::SelectPrompt(_) => "select",
            MemberKind::TaskStep { .. } => "step",
            MemberKind::NestedForm { .. } => "nested",
            MemberKind::Dependency(_) => "dependency",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberSpec {
    pub name: String,
    /// Property type, or the return element type for steps (`None` for
    /// steps returning unit).
    pub declared_type: Option<FieldType>,
    pub kind: MemberKind,
}

impl MemberSpec {
    pub fn is_required_dependency(&self) -> bool {
        matches!(self.kind, MemberKind::Dependency(_))
    }

    /// Prompted members produce a value the engine assigns itself.
    pub fn is_prompted(&self) -> bool {
        matches!(
            self.kind,
            MemberKind::TextPrompt(_) | MemberKind::SelectPrompt(_) | MemberKind::NestedForm { .. }
        )
    }
}

/// One model per form-bearing type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormModel {
    pub type_name: String,
    pub culture: Option<String>,
    /// Members in prompting order. Dependencies are listed first once
    /// constructor resolution has run.
    pub members: Vec<MemberSpec>,
}

impl FormModel {
    pub fn member(&self, name: &str) -> Option<&MemberSpec> {
        self.members.iter().find(|m| m.name == name)
    }

    pub fn dependencies(&self) -> impl Iterator<Item = &MemberSpec> {
        self.members.iter().filter(|m| m.is_required_dependency())
    }
}
