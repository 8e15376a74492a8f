//! Form catalog: declarations plus their binding tables.
//!
//! Declarations come from code or from YAML catalog files (a list of
//! `TypeDeclaration`s). Bindings are always registered in code, since they
//! are Rust callables.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

use formspec_types::declaration::TypeDeclaration;
use formspec_types::error::ModelError;
use thiserror::Error;

use crate::binding::FormBindings;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors raised while loading a catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// YAML parse failure.
    #[error("parse error: {0}")]
    Parse(String),

    /// Structural validation failure.
    #[error("validation error: {0}")]
    Validation(String),

    /// Filesystem I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// All known form types, keyed by type name.
#[derive(Debug, Default, Clone)]
pub struct FormCatalog {
    declarations: BTreeMap<String, TypeDeclaration>,
    bindings: HashMap<String, FormBindings>,
}

impl FormCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a YAML list of declarations into a catalog without bindings.
    pub fn from_yaml(yaml: &str) -> Result<Self, CatalogError> {
        let declarations: Vec<TypeDeclaration> =
            serde_yaml_ng::from_str(yaml).map_err(|e| CatalogError::Parse(e.to_string()))?;
        validate_declarations(&declarations)?;

        let mut catalog = Self::new();
        for decl in declarations {
            catalog.declarations.insert(decl.name.clone(), decl);
        }
        Ok(catalog)
    }

    /// Load a YAML catalog file.
    pub fn load_file(path: &Path) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Add or replace a declaration.
    pub fn declare(&mut self, decl: TypeDeclaration) -> &mut Self {
        self.declarations.insert(decl.name.clone(), decl);
        self
    }

    /// Attach the binding table for a type.
    pub fn bind(&mut self, type_name: impl Into<String>, bindings: FormBindings) -> &mut Self {
        self.bindings.insert(type_name.into(), bindings);
        self
    }

    /// Declaration and bindings in one call.
    pub fn register(&mut self, decl: TypeDeclaration, bindings: FormBindings) -> &mut Self {
        let name = decl.name.clone();
        self.declare(decl).bind(name, bindings)
    }

    pub fn declaration(&self, type_name: &str) -> Result<&TypeDeclaration, ModelError> {
        self.declarations
            .get(type_name)
            .ok_or_else(|| ModelError::UnknownType(type_name.to_string()))
    }

    pub fn bindings(&self, type_name: &str) -> Option<&FormBindings> {
        self.bindings.get(type_name)
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.declarations.contains_key(type_name)
    }

    /// Type names in sorted order.
    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.declarations.keys().map(String::as_str)
    }

    pub fn declarations(&self) -> impl Iterator<Item = &TypeDeclaration> {
        self.declarations.values()
    }

    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate file-level constraints on a list of declarations.
///
/// Checks:
/// - Type names are non-empty identifiers (alphanumeric and underscores)
/// - Type names are unique
/// - Member names are non-empty
pub fn validate_declarations(declarations: &[TypeDeclaration]) -> Result<(), CatalogError> {
    let mut seen = HashSet::new();
    for decl in declarations {
        if decl.name.is_empty() {
            return Err(CatalogError::Validation(
                "form type name must not be empty".to_string(),
            ));
        }
        if !decl.name.chars().all(|c| c.is_alphanumeric() || c == '_') {
            return Err(CatalogError::Validation(format!(
                "form type name '{}' may only contain alphanumerics and underscores",
                decl.name
            )));
        }
        if !seen.insert(decl.name.as_str()) {
            return Err(CatalogError::Validation(format!(
                "duplicate form type: '{}'",
                decl.name
            )));
        }
        if let Some(member) = decl.members.iter().find(|m| m.name.is_empty()) {
            return Err(CatalogError::Validation(format!(
                "form type '{}' has a member with an empty name ({:?})",
                decl.name, member.shape
            )));
        }
    }
    Ok(())
}
