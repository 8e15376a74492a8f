//! Shared domain types for formspec.
//!
//! This crate contains the structural vocabulary used across the workspace:
//! form type declarations, prompt options, the dynamically typed
//! `FormInstance`, engine configuration, and the error taxonomy.
//!
//! Zero infrastructure dependencies -- only serde, serde_json, thiserror.

pub mod config;
pub mod declaration;
pub mod error;
pub mod instance;
pub mod options;
