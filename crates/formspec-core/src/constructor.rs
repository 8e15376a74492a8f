//! Constructor resolution and required dependencies.
//!
//! Policy, in order:
//! 1. exactly one designated constructor wins (several designated is ambiguous)
//! 2. a single declared constructor is used whatever its arity
//! 3. among several undesignated constructors, the zero-argument one wins;
//!    without one the choice is ambiguous
//!
//! No declared constructor at all means an implicit zero-argument one.

use std::collections::HashSet;

use formspec_types::declaration::{ConstructorDeclaration, MemberShape, TypeDeclaration};
use formspec_types::error::ModelError;

use crate::model::{ConstructorStrategy, DependencySource, FormModel, MemberKind, MemberSpec};

/// Choose the construction strategy for a form type.
pub fn choose_constructor(decl: &TypeDeclaration) -> Result<ConstructorStrategy, ModelError> {
    let designated: Vec<&ConstructorDeclaration> =
        decl.constructors.iter().filter(|c| c.designated).collect();

    match designated.as_slice() {
        [marked] => return Ok(ConstructorStrategy::MarkedExplicit(marked.parameters.clone())),
        [] => {}
        _ => return Err(ModelError::AmbiguousConstructor(decl.name.clone())),
    }

    match decl.constructors.as_slice() {
        [] => Ok(ConstructorStrategy::Default),
        [only] if only.parameters.is_empty() => Ok(ConstructorStrategy::Default),
        [only] => Ok(ConstructorStrategy::SingleExplicit(only.parameters.clone())),
        several => {
            if several.iter().any(|c| c.parameters.is_empty()) {
                Ok(ConstructorStrategy::Default)
            } else {
                Err(ModelError::AmbiguousConstructor(decl.name.clone()))
            }
        }
    }
}

/// Resolve the constructor and add required-dependency members to the model.
///
/// Dependencies are the chosen constructor's parameters followed by every
/// `required` property without a prompt tag. They are placed ahead of the
/// prompted members since they are preconditions of the run.
pub fn resolve_constructor(
    decl: &TypeDeclaration,
    model: &mut FormModel,
) -> Result<ConstructorStrategy, ModelError> {
    let strategy = choose_constructor(decl)?;

    let mut names = HashSet::new();
    let mut dependencies = Vec::new();

    for param in strategy.parameters() {
        if model.member(&param.name).is_some_and(MemberSpec::is_prompted) {
            return Err(ModelError::ConflictingDependency {
                type_name: decl.name.clone(),
                name: param.name.clone(),
            });
        }
        if !names.insert(param.name.as_str()) {
            return Err(duplicate(decl, &param.name));
        }
        dependencies.push(MemberSpec {
            name: param.name.clone(),
            declared_type: Some(param.field_type.clone()),
            kind: MemberKind::Dependency(DependencySource::ConstructorParameter),
        });
    }

    for member in decl.members.iter().filter(|m| m.required && m.tags.is_empty()) {
        let MemberShape::Property(field_type) = &member.shape else {
            continue;
        };
        if !names.insert(member.name.as_str()) {
            return Err(duplicate(decl, &member.name));
        }
        dependencies.push(MemberSpec {
            name: member.name.clone(),
            declared_type: Some(field_type.clone()),
            kind: MemberKind::Dependency(DependencySource::RequiredProperty),
        });
    }

    tracing::debug!(
        form = decl.name.as_str(),
        strategy = ?strategy,
        dependencies = dependencies.len(),
        "resolved constructor"
    );

    dependencies.append(&mut model.members);
    model.members = dependencies;

    Ok(strategy)
}

fn duplicate(decl: &TypeDeclaration, name: &str) -> ModelError {
    ModelError::DuplicateDependency {
        type_name: decl.name.clone(),
        name: name.to_string(),
    }
}
