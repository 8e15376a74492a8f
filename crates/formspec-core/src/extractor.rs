//! Model extraction: `TypeDeclaration` -> `FormModel`.
//!
//! Only tagged members are kept, in declaration order. Untagged members stay
//! visible to the binding resolver through the declaration itself.

use std::collections::HashSet;

use formspec_types::declaration::{
    FieldType, MemberDeclaration, MemberShape, PromptTag, ReturnShape, TypeDeclaration,
};
use formspec_types::error::ModelError;

use crate::model::{FormModel, MemberKind, MemberSpec};

/// Extract the structural model of a form type.
///
/// Checks:
/// - at most one prompt-kind tag per member
/// - tagged member names are unique
/// - text prompts are scalar properties
/// - select prompts are non-form properties
/// - nested forms are form-typed properties
/// - steps are zero-parameter methods
pub fn extract_model(decl: &TypeDeclaration) -> Result<FormModel, ModelError> {
    let mut seen = HashSet::new();
    let mut members = Vec::new();

    for member in &decl.members {
        let tag = match member.tags.as_slice() {
            [] => continue,
            [tag] => tag,
            tags => {
                return Err(ModelError::ConflictingTags {
                    type_name: decl.name.clone(),
                    member: member.name.clone(),
                    tags: tags
                        .iter()
                        .map(PromptTag::kind_name)
                        .collect::<Vec<_>>()
                        .join(", "),
                });
            }
        };

        if !seen.insert(member.name.as_str()) {
            return Err(ModelError::DuplicateMember {
                type_name: decl.name.clone(),
                member: member.name.clone(),
            });
        }

        members.push(extract_member(&decl.name, member, tag)?);
    }

    tracing::debug!(
        form = decl.name.as_str(),
        members = members.len(),
        "extracted form model"
    );

    Ok(FormModel {
        type_name: decl.name.clone(),
        culture: decl.culture.clone(),
        members,
    })
}

fn extract_member(
    type_name: &str,
    member: &MemberDeclaration,
    tag: &PromptTag,
) -> Result<MemberSpec, ModelError> {
    let invalid = |reason: String| ModelError::InvalidMemberType {
        type_name: type_name.to_string(),
        member: member.name.clone(),
        reason,
    };

    match (tag, &member.shape) {
        (PromptTag::TextPrompt(options), MemberShape::Property(ty)) => {
            if !ty.is_scalar() {
                return Err(invalid(format!("text prompt requires a scalar type, found {ty}")));
            }
            Ok(MemberSpec {
                name: member.name.clone(),
                declared_type: Some(ty.clone()),
                kind: MemberKind::TextPrompt(options.clone()),
            })
        }
        (PromptTag::SelectPrompt(options), MemberShape::Property(ty)) => {
            if matches!(ty, FieldType::Form(_)) {
                return Err(invalid(format!("select prompt cannot target {ty}")));
            }
            Ok(MemberSpec {
                name: member.name.clone(),
                declared_type: Some(ty.clone()),
                kind: MemberKind::SelectPrompt(options.clone()),
            })
        }
        (PromptTag::NestedForm, MemberShape::Property(ty)) => match ty.form_name() {
            Some(form) => Ok(MemberSpec {
                name: member.name.clone(),
                declared_type: Some(ty.clone()),
                kind: MemberKind::NestedForm {
                    form: form.to_string(),
                },
            }),
            None => Err(invalid(format!("nested form requires a form type, found {ty}"))),
        },
        (PromptTag::TaskStep(options), MemberShape::Method(sig)) => {
            if !sig.parameters.is_empty() {
                return Err(invalid(format!(
                    "task step must take no parameters, found {}",
                    sig.parameters.len()
                )));
            }
            let is_async = sig.returns.is_deferred();
            if options.use_status && !is_async {
                tracing::warn!(
                    form = type_name,
                    member = member.name.as_str(),
                    "status indicator ignored on synchronous step"
                );
            }
            Ok(MemberSpec {
                name: member.name.clone(),
                declared_type: step_value_type(&sig.returns),
                kind: MemberKind::TaskStep {
                    is_async,
                    options: options.clone(),
                },
            })
        }
        (PromptTag::TaskStep(_), MemberShape::Property(_)) => {
            Err(invalid("task step must be a method".to_string()))
        }
        (tag, MemberShape::Method(_)) => Err(invalid(format!(
            "{} must be a property",
            tag.kind_name()
        ))),
    }
}

fn step_value_type(returns: &ReturnShape) -> Option<FieldType> {
    match returns {
        ReturnShape::Unit => None,
        ReturnShape::Value(ty) => Some(ty.clone()),
        ReturnShape::Sequence(ty) => Some(FieldType::List(Box::new(ty.clone()))),
        ReturnShape::Deferred(inner) => step_value_type(inner),
    }
}
