//! Structural declarations of form types.
//!
//! A `TypeDeclaration` is the already-parsed shape of an annotated type: its
//! constructors, its members in declaration order, and the prompt-kind tags
//! attached to each member. Declarations are built in code with the helper
//! constructors below or deserialized from a YAML catalog:
//!
//! ```yaml
//! - name: Profile
//!   culture: en-US
//!   members:
//!     - name: display_name
//!       shape: { property: text }
//!       tags:
//!         - text_prompt: { title: "Display name" }
//!     - name: sync
//!       shape: { method: { returns: { deferred: unit } } }
//!       tags:
//!         - task_step: { use_status: true }
//! ```
//!
//! Data-carrying variants are written as single-key maps (`{ list: text }`)
//! and unit variants as plain strings (`nested_form`).

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::options::{SelectOptions, StepOptions, TextOptions};

// ---------------------------------------------------------------------------
// Field types
// ---------------------------------------------------------------------------

/// Declared type of a property, parameter, or method return element.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Text,
    Integer,
    Decimal,
    Boolean,
    /// Homogeneous sequence.
    List(Box<FieldType>),
    /// Reference to another form type by name.
    Form(String),
}

impl FieldType {
    /// Scalars are the types a text answer can be coerced into.
    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            FieldType::Text | FieldType::Integer | FieldType::Decimal | FieldType::Boolean
        )
    }

    /// Name of the referenced form type, if this is a form reference.
    pub fn form_name(&self) -> Option<&str> {
        match self {
            FieldType::Form(name) => Some(name),
            _ => None,
        }
    }

    /// Whether a value of type `other` can be stored in a member of this type.
    ///
    /// Identical types are accepted, and integers widen into decimals.
    pub fn accepts(&self, other: &FieldType) -> bool {
        match (self, other) {
            (a, b) if a == b => true,
            (FieldType::Decimal, FieldType::Integer) => true,
            (FieldType::List(a), FieldType::List(b)) => a.accepts(b),
            _ => false,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Text => write!(f, "text"),
            FieldType::Integer => write!(f, "integer"),
            FieldType::Decimal => write!(f, "decimal"),
            FieldType::Boolean => write!(f, "boolean"),
            FieldType::List(inner) => write!(f, "list<{inner}>"),
            FieldType::Form(name) => write!(f, "form {name}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Member shapes
// ---------------------------------------------------------------------------

/// What a method hands back to its caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnShape {
    Unit,
    Value(FieldType),
    Sequence(FieldType),
    /// A deferred (asynchronous) computation producing the inner shape.
    Deferred(Box<ReturnShape>),
}

impl ReturnShape {
    pub fn is_deferred(&self) -> bool {
        matches!(self, ReturnShape::Deferred(_))
    }

    /// Element type of a finite sequence. Deferred returns never qualify:
    /// choice sources are synchronous.
    pub fn sequence_element(&self) -> Option<&FieldType> {
        match self {
            ReturnShape::Sequence(elem) => Some(elem),
            ReturnShape::Value(FieldType::List(elem)) => Some(&**elem),
            _ => None,
        }
    }
}

/// Parameter list and return shape of a method member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodSignature {
    #[serde(default)]
    pub parameters: Vec<FieldType>,
    pub returns: ReturnShape,
}

/// Whether a member is a property or a method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberShape {
    Property(FieldType),
    Method(MethodSignature),
}

// ---------------------------------------------------------------------------
// Tags
// ---------------------------------------------------------------------------

/// Recognized prompt-kind tags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptTag {
    TextPrompt(TextOptions),
    SelectPrompt(SelectOptions),
    TaskStep(StepOptions),
    NestedForm,
}

impl PromptTag {
    pub fn kind_name(&self) -> &'static str {
        match self {
            PromptTag::TextPrompt(_) => "text_prompt",
            PromptTag::SelectPrompt(_) => "select_prompt",
            PromptTag::TaskStep(_) => "task_step",
            PromptTag::NestedForm => "nested_form",
        }
    }
}

// ---------------------------------------------------------------------------
// Members and constructors
// ---------------------------------------------------------------------------

/// A single member (property or method) of a form type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberDeclaration {
    pub name: String,
    #[serde(with = "serde_yaml_ng::with::singleton_map_recursive")]
    pub shape: MemberShape,
    /// Marked as required: must hold a value before prompting starts unless
    /// it is itself prompted.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub required: bool,
    #[serde(
        default,
        skip_serializing_if = "Vec::is_empty",
        with = "serde_yaml_ng::with::singleton_map_recursive"
    )]
    pub tags: Vec<PromptTag>,
}

impl MemberDeclaration {
    pub fn property(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            shape: MemberShape::Property(field_type),
            required: false,
            tags: Vec::new(),
        }
    }

    pub fn method(
        name: impl Into<String>,
        parameters: Vec<FieldType>,
        returns: ReturnShape,
    ) -> Self {
        Self {
            name: name.into(),
            shape: MemberShape::Method(MethodSignature {
                parameters,
                returns,
            }),
            required: false,
            tags: Vec::new(),
        }
    }

    pub fn tagged(mut self, tag: PromptTag) -> Self {
        self.tags.push(tag);
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn is_method(&self) -> bool {
        matches!(self.shape, MemberShape::Method(_))
    }

    /// Declared type of a property; `None` for methods.
    pub fn property_type(&self) -> Option<&FieldType> {
        match &self.shape {
            MemberShape::Property(ty) => Some(ty),
            MemberShape::Method(_) => None,
        }
    }
}

/// A constructor parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterDeclaration {
    pub name: String,
    #[serde(rename = "type", with = "serde_yaml_ng::with::singleton_map_recursive")]
    pub field_type: FieldType,
}

/// One constructor of a form type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstructorDeclaration {
    #[serde(default)]
    pub parameters: Vec<ParameterDeclaration>,
    /// Explicitly marked as the designated constructor.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub designated: bool,
}

impl ConstructorDeclaration {
    pub fn new(parameters: Vec<(&str, FieldType)>) -> Self {
        Self {
            parameters: parameters
                .into_iter()
                .map(|(name, field_type)| ParameterDeclaration {
                    name: name.to_string(),
                    field_type,
                })
                .collect(),
            designated: false,
        }
    }

    pub fn designated(mut self) -> Self {
        self.designated = true;
        self
    }
}

// ---------------------------------------------------------------------------
// Type declaration
// ---------------------------------------------------------------------------

/// The structural declaration of a form-bearing type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDeclaration {
    pub name: String,
    /// Locale applied to every prompt unless a member overrides it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub culture: Option<String>,
    /// Declared constructors. Empty means an implicit zero-argument one.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub constructors: Vec<ConstructorDeclaration>,
    /// Members in declaration order.
    #[serde(default)]
    pub members: Vec<MemberDeclaration>,
}

impl TypeDeclaration {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            culture: None,
            constructors: Vec::new(),
            members: Vec::new(),
        }
    }

    pub fn with_culture(mut self, culture: impl Into<String>) -> Self {
        self.culture = Some(culture.into());
        self
    }

    pub fn constructor(mut self, constructor: ConstructorDeclaration) -> Self {
        self.constructors.push(constructor);
        self
    }

    pub fn member(mut self, member: MemberDeclaration) -> Self {
        self.members.push(member);
        self
    }

    /// All members with the given name (methods may be overloaded).
    pub fn members_named<'a>(
        &'a self,
        name: &'a str,
    ) -> impl Iterator<Item = &'a MemberDeclaration> {
        self.members.iter().filter(move |m| m.name == name)
    }
}
