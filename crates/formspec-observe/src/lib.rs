//! Observability setup for formspec: tracing subscriber installation with
//! optional OpenTelemetry export.

pub mod tracing_setup;
