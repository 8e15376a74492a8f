//! Catalog-wide nesting graph.
//!
//! Models "type A nests type B" edges with `petgraph` so a whole catalog can
//! be checked for nesting cycles up front, without compiling each plan.

use std::collections::HashMap;

use formspec_types::declaration::{MemberShape, PromptTag};
use formspec_types::error::ModelError;
use petgraph::algo::toposort;
use petgraph::graph::DiGraph;

use crate::catalog::FormCatalog;

/// Nested-form references of every declared type, as `(parent, child)`.
pub fn nesting_edges(catalog: &FormCatalog) -> Vec<(&str, &str)> {
    let mut edges = Vec::new();
    for decl in catalog.declarations() {
        for member in &decl.members {
            if !member.tags.contains(&PromptTag::NestedForm) {
                continue;
            }
            if let MemberShape::Property(field_type) = &member.shape {
                if let Some(child) = field_type.form_name() {
                    edges.push((decl.name.as_str(), child));
                }
            }
        }
    }
    edges
}

/// Validate that no form type nests itself, directly or transitively.
///
/// Returns the type names ordered leaf-first: every type appears after all
/// the types it nests.
pub fn validate_form_graph(catalog: &FormCatalog) -> Result<Vec<String>, ModelError> {
    let mut graph = DiGraph::<&str, ()>::new();
    let name_to_idx: HashMap<&str, _> = catalog
        .type_names()
        .map(|name| (name, graph.add_node(name)))
        .collect();

    // Edge from nested child -> parent, so toposort yields leaves first
    for (parent, child) in nesting_edges(catalog) {
        let child_idx = name_to_idx
            .get(child)
            .ok_or_else(|| ModelError::UnknownType(child.to_string()))?;
        graph.add_edge(*child_idx, name_to_idx[parent], ());
    }

    let sorted = toposort(&graph, None).map_err(|cycle| {
        let node = graph[cycle.node_id()];
        ModelError::CyclicNesting(format!("cycle involving form type '{node}'"))
    })?;

    Ok(sorted.into_iter().map(|idx| graph[idx].to_string()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use formspec_types::declaration::{FieldType, MemberDeclaration, TypeDeclaration};

    fn nested(name: &str, form: &str) -> MemberDeclaration {
        MemberDeclaration::property(name, FieldType::Form(form.to_string()))
            .tagged(PromptTag::NestedForm)
    }

    #[test]
    fn test_leaf_first_order() {
        let mut catalog = FormCatalog::new();
        catalog
            .declare(TypeDeclaration::new("Outer").member(nested("mid", "Mid")))
            .declare(TypeDeclaration::new("Mid").member(nested("leaf", "Leaf")))
            .declare(TypeDeclaration::new("Leaf"));
        let order = validate_form_graph(&catalog).unwrap();
        let pos = |n: &str| order.iter().position(|x| x == n).unwrap();
        assert!(pos("Leaf") < pos("Mid"));
        assert!(pos("Mid") < pos("Outer"));
    }

    #[test]
    fn test_self_loop_detected() {
        let mut catalog = FormCatalog::new();
        catalog.declare(TypeDeclaration::new("A").member(nested("a", "A")));
        let err = validate_form_graph(&catalog).unwrap_err();
        assert!(matches!(err, ModelError::CyclicNesting(_)));
    }

    #[test]
    fn test_two_type_cycle_detected() {
        let mut catalog = FormCatalog::new();
        catalog
            .declare(TypeDeclaration::new("A").member(nested("b", "B")))
            .declare(TypeDeclaration::new("B").member(nested("a", "A")));
        assert!(validate_form_graph(&catalog).is_err());
    }

    #[test]
    fn test_untagged_form_property_is_not_an_edge() {
        let mut catalog = FormCatalog::new();
        catalog.declare(
            TypeDeclaration::new("A")
                .member(MemberDeclaration::property("me", FieldType::Form("A".to_string()))),
        );
        assert!(nesting_edges(&catalog).is_empty());
        assert_eq!(validate_form_graph(&catalog).unwrap(), vec!["A".to_string()]);
    }

    #[test]
    fn test_unknown_child_type() {
        let mut catalog = FormCatalog::new();
        catalog.declare(TypeDeclaration::new("A").member(nested("b", "Ghost")));
        assert_eq!(
            validate_form_graph(&catalog).unwrap_err(),
            ModelError::UnknownType("Ghost".to_string())
        );
    }
}
