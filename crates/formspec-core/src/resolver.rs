//! Binding resolution: choice sources, converters and step bodies.
//!
//! Every auxiliary reference is resolved by exact name against the declaring
//! type's own members, its declared signature is checked against the
//! prompted member, and the callable registered in the type's
//! `FormBindings` is attached. After this pass, execution never looks a
//! name up again.

use std::collections::HashMap;
use std::fmt;

use formspec_types::declaration::{
    FieldType, MemberDeclaration, MemberShape, ReturnShape, TypeDeclaration,
};
use formspec_types::error::{ModelError, StepError};
use formspec_types::instance::FormInstance;
use formspec_types::options::SelectOptions;
use serde_json::Value;

use crate::binding::{BoundMethod, ConverterFn, FormBindings, SourceFn, StepHandle};
use crate::model::{FormModel, MemberKind, MemberSpec};

// ---------------------------------------------------------------------------
// Resolved handles
// ---------------------------------------------------------------------------

/// Where the candidates of a selection prompt come from.
#[derive(Clone)]
pub enum SourceHandle {
    /// A list-typed property read from the live instance.
    Property(String),
    /// A registered zero-argument method.
    Method { name: String, call: SourceFn },
}

impl SourceHandle {
    pub fn name(&self) -> &str {
        match self {
            SourceHandle::Property(name) | SourceHandle::Method { name, .. } => name,
        }
    }

    /// Produce the candidates. An unset source property yields no candidates.
    pub fn fetch(&self, instance: &FormInstance) -> Result<Vec<Value>, StepError> {
        match self {
            SourceHandle::Property(name) => match instance.get(name) {
                None | Some(Value::Null) => Ok(Vec::new()),
                Some(Value::Array(items)) => Ok(items.clone()),
                Some(other) => Err(StepError::failed(format!(
                    "choices source '{name}' is not a sequence: {other}"
                ))),
            },
            SourceHandle::Method { call, .. } => call(instance),
        }
    }
}

impl fmt::Debug for SourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceHandle::Property(name) => write!(f, "SourceHandle::Property({name})"),
            SourceHandle::Method { name, .. } => write!(f, "SourceHandle::Method({name})"),
        }
    }
}

/// A resolved converter.
#[derive(Clone)]
pub struct ConverterHandle {
    pub name: String,
    call: ConverterFn,
}

impl ConverterHandle {
    pub fn render(&self, value: &Value) -> String {
        (self.call)(value)
    }
}

impl fmt::Debug for ConverterHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ConverterHandle({})", self.name)
    }
}

/// Natural string form of a candidate, used when no converter is declared.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Resolved callables for one member.
#[derive(Debug, Clone)]
pub enum MemberBinding {
    Select {
        source: SourceHandle,
        converter: Option<ConverterHandle>,
    },
    Step(StepHandle),
}

/// Bindings keyed by member name.
pub type ResolvedBindings = HashMap<String, MemberBinding>;

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// Resolve every auxiliary reference of the model's members.
pub fn resolve_bindings(
    decl: &TypeDeclaration,
    model: &FormModel,
    bindings: Option<&FormBindings>,
) -> Result<ResolvedBindings, ModelError> {
    let empty = FormBindings::new();
    let bindings = bindings.unwrap_or(&empty);
    let mut resolved = ResolvedBindings::new();

    for member in &model.members {
        match &member.kind {
            MemberKind::SelectPrompt(options) => {
                let binding = resolve_select(decl, member, options, bindings)?;
                resolved.insert(member.name.clone(), binding);
            }
            MemberKind::TaskStep { is_async, .. } => {
                let handle = resolve_step(decl, member, *is_async, bindings)?;
                resolved.insert(member.name.clone(), MemberBinding::Step(handle));
            }
            _ => {}
        }
    }

    tracing::debug!(
        form = decl.name.as_str(),
        bound = resolved.len(),
        "resolved member bindings"
    );

    Ok(resolved)
}

fn resolve_select(
    decl: &TypeDeclaration,
    member: &MemberSpec,
    options: &SelectOptions,
    bindings: &FormBindings,
) -> Result<MemberBinding, ModelError> {
    let named: Vec<&MemberDeclaration> = decl.members_named(&options.source).collect();
    if named.is_empty() {
        return Err(ModelError::UnresolvedSource {
            type_name: decl.name.clone(),
            member: member.name.clone(),
            source_name: options.source.clone(),
        });
    }

    let compatible: Vec<(&MemberDeclaration, &FieldType)> = named
        .iter()
        .filter_map(|m| source_element(m).map(|elem| (*m, elem)))
        .collect();

    let (source_decl, element) = match compatible.as_slice() {
        [] => {
            return Err(incompatible(
                decl,
                member,
                &options.source,
                "expected a zero-argument member producing a sequence".to_string(),
            ));
        }
        [single] => *single,
        many => {
            return Err(ModelError::AmbiguousBinding {
                type_name: decl.name.clone(),
                member: member.name.clone(),
                name: options.source.clone(),
                candidates: many.len(),
            });
        }
    };

    if let Some(member_type) = &member.declared_type {
        if !member_type.accepts(element) {
            return Err(incompatible(
                decl,
                member,
                &options.source,
                format!("element type {element} does not fit member type {member_type}"),
            ));
        }
    }

    let source = match &source_decl.shape {
        MemberShape::Property(_) => SourceHandle::Property(source_decl.name.clone()),
        MemberShape::Method(_) => match bindings.get(&source_decl.name) {
            Some(BoundMethod::Source(call)) => SourceHandle::Method {
                name: source_decl.name.clone(),
                call: call.clone(),
            },
            Some(other) => {
                return Err(incompatible(
                    decl,
                    member,
                    &options.source,
                    format!("registered as {}, expected source", other.flavour()),
                ));
            }
            None => return Err(missing(decl, &source_decl.name)),
        },
    };

    let converter = match &options.converter {
        Some(name) => Some(resolve_converter(decl, member, name, element, bindings)?),
        None => None,
    };

    Ok(MemberBinding::Select { source, converter })
}

fn resolve_converter(
    decl: &TypeDeclaration,
    member: &MemberSpec,
    name: &str,
    element: &FieldType,
    bindings: &FormBindings,
) -> Result<ConverterHandle, ModelError> {
    let named: Vec<&MemberDeclaration> = decl.members_named(name).collect();
    if named.is_empty() {
        return Err(ModelError::UnresolvedConverter {
            type_name: decl.name.clone(),
            member: member.name.clone(),
            converter: name.to_string(),
        });
    }

    let compatible = named
        .iter()
        .filter(|m| is_converter_shape(m, element))
        .count();
    match compatible {
        0 => {
            return Err(incompatible(
                decl,
                member,
                name,
                format!("expected a method ({element}) -> text"),
            ));
        }
        1 => {}
        n => {
            return Err(ModelError::AmbiguousBinding {
                type_name: decl.name.clone(),
                member: member.name.clone(),
                name: name.to_string(),
                candidates: n,
            });
        }
    }

    match bindings.get(name) {
        Some(BoundMethod::Converter(call)) => Ok(ConverterHandle {
            name: name.to_string(),
            call: call.clone(),
        }),
        Some(other) => Err(incompatible(
            decl,
            member,
            name,
            format!("registered as {}, expected converter", other.flavour()),
        )),
        None => Err(missing(decl, name)),
    }
}

fn resolve_step(
    decl: &TypeDeclaration,
    member: &MemberSpec,
    is_async: bool,
    bindings: &FormBindings,
) -> Result<StepHandle, ModelError> {
    let overloads = decl.members_named(&member.name).count();
    if overloads > 1 {
        return Err(ModelError::AmbiguousBinding {
            type_name: decl.name.clone(),
            member: member.name.clone(),
            name: member.name.clone(),
            candidates: overloads,
        });
    }

    match bindings.get(&member.name) {
        Some(BoundMethod::Step(handle)) if handle.is_async() == is_async => Ok(handle.clone()),
        Some(other) => Err(incompatible(
            decl,
            member,
            &member.name,
            format!(
                "declared {} step, registered as {}",
                if is_async { "async" } else { "sync" },
                other.flavour()
            ),
        )),
        None => Err(missing(decl, &member.name)),
    }
}

/// Element type produced by a candidate choices source, if its shape fits.
fn source_element(member: &MemberDeclaration) -> Option<&FieldType> {
    match &member.shape {
        MemberShape::Property(FieldType::List(elem)) => Some(&**elem),
        MemberShape::Property(_) => None,
        MemberShape::Method(sig) if sig.parameters.is_empty() => sig.returns.sequence_element(),
        MemberShape::Method(_) => None,
    }
}

fn is_converter_shape(member: &MemberDeclaration, element: &FieldType) -> bool {
    match &member.shape {
        MemberShape::Method(sig) => {
            matches!(sig.parameters.as_slice(), [param] if param.accepts(element))
                && sig.returns == ReturnShape::Value(FieldType::Text)
        }
        MemberShape::Property(_) => false,
    }
}

fn incompatible(
    decl: &TypeDeclaration,
    member: &MemberSpec,
    name: &str,
    reason: String,
) -> ModelError {
    ModelError::IncompatibleSignature {
        type_name: decl.name.clone(),
        member: member.name.clone(),
        name: name.to_string(),
        reason,
    }
}

fn missing(decl: &TypeDeclaration, name: &str) -> ModelError {
    ModelError::MissingImplementation {
        type_name: decl.name.clone(),
        name: name.to_string(),
    }
}
