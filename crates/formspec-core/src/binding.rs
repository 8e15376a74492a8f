//! Per-type binding tables.
//!
//! Name-bound methods (choice sources, converters, step bodies) are
//! registered here as callables keyed by member name. The resolver validates
//! each declared reference against this table once; plans then hold the
//! resolved handles and call them directly.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use formspec_types::error::StepError;
use formspec_types::instance::FormInstance;
use futures_util::future::BoxFuture;
use serde_json::Value;

/// Zero-argument method producing the candidates of a selection prompt.
pub type SourceFn = Arc<dyn Fn(&FormInstance) -> Result<Vec<Value>, StepError> + Send + Sync>;

/// Single-argument method rendering a candidate as display text.
pub type ConverterFn = Arc<dyn Fn(&Value) -> String + Send + Sync>;

/// Synchronous step body.
pub type SyncStepFn = Arc<dyn Fn(&mut FormInstance) -> Result<(), StepError> + Send + Sync>;

/// Asynchronous step body. The returned future borrows the instance for
/// its whole lifetime.
pub type AsyncStepFn =
    Arc<dyn for<'a> Fn(&'a mut FormInstance) -> BoxFuture<'a, Result<(), StepError>> + Send + Sync>;

/// A registered step body.
#[derive(Clone)]
pub enum StepHandle {
    Sync(SyncStepFn),
    Async(AsyncStepFn),
}

impl StepHandle {
    pub fn is_async(&self) -> bool {
        matches!(self, StepHandle::Async(_))
    }
}

impl fmt::Debug for StepHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepHandle::Sync(_) => f.write_str("StepHandle::Sync"),
            StepHandle::Async(_) => f.write_str("StepHandle::Async"),
        }
    }
}

/// A registered callable of any flavour.
#[derive(Clone)]
pub enum BoundMethod {
    Source(SourceFn),
    Converter(ConverterFn),
    Step(StepHandle),
}

impl BoundMethod {
    pub fn flavour(&self) -> &'static str {
        match self {
            BoundMethod::Source(_) => "source",
            BoundMethod::Converter(_) => "converter",
            BoundMethod::Step(StepHandle::Sync(_)) => "step",
            BoundMethod::Step(StepHandle::Async(_)) => "async step",
        }
    }
}

impl fmt::Debug for BoundMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BoundMethod({})", self.flavour())
    }
}

/// Callables registered for one form type.
///
/// ```ignore
/// let bindings = FormBindings::new()
///     .source("regions", |_| Ok(vec![json!("eu"), json!("us")]))
///     .converter("region_label", |v| v.as_str().unwrap_or_default().to_uppercase())
///     .async_step("register", |inst| Box::pin(async move {
///         inst.set("account_id", "acct-1");
///         Ok(())
///     }));
/// ```
#[derive(Clone, Default)]
pub struct FormBindings {
    methods: HashMap<String, BoundMethod>,
}

impl FormBindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn source<F>(self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&FormInstance) -> Result<Vec<Value>, StepError> + Send + Sync + 'static,
    {
        self.register(name.into(), BoundMethod::Source(Arc::new(f)))
    }

    pub fn converter<F>(self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&Value) -> String + Send + Sync + 'static,
    {
        self.register(name.into(), BoundMethod::Converter(Arc::new(f)))
    }

    pub fn step<F>(self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&mut FormInstance) -> Result<(), StepError> + Send + Sync + 'static,
    {
        self.register(name.into(), BoundMethod::Step(StepHandle::Sync(Arc::new(f))))
    }

    pub fn async_step<F>(self, name: impl Into<String>, f: F) -> Self
    where
        F: for<'a> Fn(&'a mut FormInstance) -> BoxFuture<'a, Result<(), StepError>>
            + Send
            + Sync
            + 'static,
    {
        self.register(name.into(), BoundMethod::Step(StepHandle::Async(Arc::new(f))))
    }

    fn register(mut self, name: String, method: BoundMethod) -> Self {
        if let Some(previous) = self.methods.insert(name.clone(), method) {
            tracing::warn!(
                method = name.as_str(),
                replaced = previous.flavour(),
                "binding registered twice, keeping the latest"
            );
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&BoundMethod> {
        self.methods.get(name)
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

impl fmt::Debug for FormBindings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.methods.keys().collect();
        names.sort();
        f.debug_struct("FormBindings").field("methods", &names).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_register_and_lookup() {
        let bindings = FormBindings::new()
            .source("regions", |_| Ok(vec![json!("eu")]))
            .converter("label", |v| format!("<{v}>"))
            .step("validate", |_| Ok(()));
        assert_eq!(bindings.len(), 3);
        assert_eq!(bindings.get("regions").unwrap().flavour(), "source");
        assert_eq!(bindings.get("label").unwrap().flavour(), "converter");
        assert_eq!(bindings.get("validate").unwrap().flavour(), "step");
        assert!(bindings.get("missing").is_none());
    }

    #[test]
    fn test_later_registration_wins() {
        let bindings = FormBindings::new()
            .step("go", |_| Ok(()))
            .async_step("go", |_| Box::pin(async { Ok(()) }));
        assert_eq!(bindings.len(), 1);
        assert_eq!(bindings.get("go").unwrap().flavour(), "async step");
    }

    #[tokio::test]
    async fn test_async_step_mutates_instance() {
        let bindings = FormBindings::new().async_step("stamp", |inst| {
            Box::pin(async move {
                inst.set("stamped", true);
                Ok(())
            })
        });
        let mut inst = FormInstance::new("Doc");
        match bindings.get("stamp") {
            Some(BoundMethod::Step(StepHandle::Async(f))) => f(&mut inst).await.unwrap(),
            other => panic!("expected async step, got {other:?}"),
        }
        assert_eq!(inst.get("stamped"), Some(&json!(true)));
    }
}
