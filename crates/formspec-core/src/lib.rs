//! Form specification compiler and executor.
//!
//! The pipeline runs once per form type and the resulting plan is cached:
//! - `catalog` -- declarations plus per-type `FormBindings`
//! - `extractor` -- declaration to `FormModel`
//! - `resolver` -- choice sources, converters and step bodies bound by name
//! - `constructor` -- construction strategy and required dependencies
//! - `plan` -- lowering to an ordered `ExecutionPlan`
//! - `compiler` -- the pipeline driver, nested-form recursion, plan cache
//! - `graph` -- catalog-wide nesting cycle check
//! - `executor` -- sequential interpretation against a `PromptSurface`
//! - `factory` -- build/run entry points for callers
//!
//! Rendering is not part of this crate: callers supply a `PromptSurface`.

pub mod binding;
pub mod catalog;
pub mod compiler;
pub mod constructor;
pub mod executor;
pub mod extractor;
pub mod factory;
pub mod graph;
pub mod model;
pub mod plan;
pub mod resolver;
pub mod surface;

#[cfg(test)]
mod test_support;
