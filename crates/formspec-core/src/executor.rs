//! Plan executor.
//!
//! Interprets an `ExecutionPlan` against a live `FormInstance`, one operation
//! at a time, driving a `PromptSurface` for input and status display.
//!
//! State machine per run: `Idle -> Running -> {Completed, Failed}`. The
//! first failure stops the run; values already assigned stay on the
//! instance, which is handed back inside the `RunFailure`.
//!
//! Every suspension point (prompts, async steps, nested forms) races the
//! run's `CancellationToken`.

use std::fmt;
use std::future::Future;

use formspec_types::declaration::FieldType;
use formspec_types::error::{PromptError, StepError};
use formspec_types::instance::FormInstance;
use futures_util::future::BoxFuture;
use serde::Serialize;
use serde_json::{Map, Number, Value};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::binding::StepHandle;
use crate::plan::{join_path, ExecutionPlan, Operation};
use crate::resolver::display_value;
use crate::surface::{PromptSurface, SelectRequest, TextRequest};

// ---------------------------------------------------------------------------
// Errors and run state
// ---------------------------------------------------------------------------

/// Lifecycle of a single run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Idle,
    Running,
    Completed,
    Failed,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunState::Idle => write!(f, "idle"),
            RunState::Running => write!(f, "running"),
            RunState::Completed => write!(f, "completed"),
            RunState::Failed => write!(f, "failed"),
        }
    }
}

/// Failure of one operation. `member` is the dotted path from the root form
/// (`outer.inner.x`).
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("prompt for '{member}' failed: {source}")]
    Prompt { member: String, source: PromptError },

    #[error("choices source for '{member}' failed: {source}")]
    Source { member: String, source: StepError },

    #[error("step '{member}' failed: {source}")]
    Step { member: String, source: StepError },

    #[error("run cancelled at '{member}'")]
    Cancelled { member: String },

    #[error("required dependency '{member}' is not set")]
    MissingDependency { member: String },

    #[error("invalid value in '{member}': {reason}")]
    InvalidValue { member: String, reason: String },
}

impl ExecutionError {
    pub fn member(&self) -> &str {
        match self {
            ExecutionError::Prompt { member, .. }
            | ExecutionError::Source { member, .. }
            | ExecutionError::Step { member, .. }
            | ExecutionError::Cancelled { member }
            | ExecutionError::MissingDependency { member }
            | ExecutionError::InvalidValue { member, .. } => member,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            ExecutionError::Cancelled { .. }
                | ExecutionError::Prompt {
                    source: PromptError::Cancelled,
                    ..
                }
        )
    }
}

/// A failed run: what failed, and the instance as far as it got.
#[derive(Debug, Error)]
#[error("run {run_id} of form '{type_name}' failed: {error}")]
pub struct RunFailure {
    pub run_id: Uuid,
    pub type_name: String,
    pub state: RunState,
    #[source]
    pub error: ExecutionError,
    pub partial: FormInstance,
}

// ---------------------------------------------------------------------------
// Construction
// ---------------------------------------------------------------------------

/// Build a fresh instance of the plan's type from caller-supplied values.
///
/// Every required dependency must be present and non-null. Other supplied
/// values are assigned as-is.
pub fn construct_instance(
    plan: &ExecutionPlan,
    supplied: Map<String, Value>,
) -> Result<FormInstance, ExecutionError> {
    if let Some(missing) = plan
        .dependencies
        .iter()
        .find(|dep| supplied.get(&dep.name).is_none_or(Value::is_null))
    {
        return Err(ExecutionError::MissingDependency {
            member: missing.name.clone(),
        });
    }
    Ok(FormInstance::from_fields(plan.type_name.clone(), supplied))
}

// ---------------------------------------------------------------------------
// Build context
// ---------------------------------------------------------------------------

/// Mutable state of one (possibly nested) plan run.
struct BuildContext {
    run_id: Uuid,
    instance: FormInstance,
    /// Dotted path of this form within the root form; empty at the root.
    path: String,
    culture: Option<String>,
    state: RunState,
    completed: usize,
}

impl BuildContext {
    fn new(run_id: Uuid, instance: FormInstance, path: String, culture: Option<String>) -> Self {
        Self {
            run_id,
            instance,
            path,
            culture,
            state: RunState::Idle,
            completed: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// Executor
// ---------------------------------------------------------------------------

pub struct Executor<'s, S> {
    surface: &'s S,
    cancel: CancellationToken,
    default_culture: Option<String>,
}

impl<'s, S: PromptSurface> Executor<'s, S> {
    pub fn new(surface: &'s S) -> Self {
        Self {
            surface,
            cancel: CancellationToken::new(),
            default_culture: None,
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_default_culture(mut self, culture: Option<String>) -> Self {
        self.default_culture = culture;
        self
    }

    /// Run `plan` against `instance`.
    ///
    /// Required dependencies are assumed to be set already; see
    /// [`construct_instance`].
    pub async fn run(
        &self,
        plan: &ExecutionPlan,
        instance: FormInstance,
    ) -> Result<FormInstance, RunFailure> {
        let run_id = Uuid::now_v7();
        let culture = plan.culture.clone().or_else(|| self.default_culture.clone());
        let mut ctx = BuildContext::new(run_id, instance, String::new(), culture);

        tracing::info!(
            run_id = %run_id,
            form = plan.type_name.as_str(),
            operations = plan.operations.len(),
            "form run started"
        );

        ctx.state = RunState::Running;
        match self.execute(plan, &mut ctx).await {
            Ok(()) => {
                ctx.state = RunState::Completed;
                tracing::info!(
                    run_id = %run_id,
                    form = plan.type_name.as_str(),
                    completed = ctx.completed,
                    "form run completed"
                );
                Ok(ctx.instance)
            }
            Err(error) => {
                ctx.state = RunState::Failed;
                tracing::warn!(
                    run_id = %run_id,
                    form = plan.type_name.as_str(),
                    member = error.member(),
                    completed = ctx.completed,
                    error = %error,
                    "form run failed"
                );
                Err(RunFailure {
                    run_id,
                    type_name: plan.type_name.clone(),
                    state: ctx.state,
                    error,
                    partial: ctx.instance,
                })
            }
        }
    }

    /// Execute every operation of `plan` in order. Boxed for recursion into
    /// nested forms.
    fn execute<'a>(
        &'a self,
        plan: &'a ExecutionPlan,
        ctx: &'a mut BuildContext,
    ) -> BoxFuture<'a, Result<(), ExecutionError>> {
        Box::pin(async move {
            for op in &plan.operations {
                let path = join_path(&ctx.path, op.member());
                if self.cancel.is_cancelled() {
                    return Err(ExecutionError::Cancelled { member: path });
                }

                tracing::debug!(
                    run_id = %ctx.run_id,
                    member = path.as_str(),
                    operation = op.label(),
                    "executing operation"
                );
                self.execute_operation(op, &path, ctx).await?;
                ctx.completed += 1;
            }
            Ok(())
        })
    }

    async fn execute_operation(
        &self,
        op: &Operation,
        path: &str,
        ctx: &mut BuildContext,
    ) -> Result<(), ExecutionError> {
        match op {
            Operation::AskText {
                member,
                title,
                declared_type,
                secret,
                search,
                culture,
            } => {
                let request = TextRequest {
                    title: title.clone(),
                    secret: *secret,
                    search_enabled: search.enabled,
                    placeholder: search.placeholder.clone(),
                    culture: culture.clone().or_else(|| ctx.culture.clone()),
                };
                let answer = self
                    .guard(path, self.surface.ask_text(request))
                    .await?
                    .map_err(|source| prompt_error(path, source))?;
                let value = coerce_text(&answer, declared_type)
                    .map_err(|reason| prompt_error(path, PromptError::InvalidInput(reason)))?;
                ctx.instance.set(member.as_str(), value);
            }

            Operation::AskSelect {
                member,
                title,
                source,
                converter,
                search,
                culture,
            } => {
                let candidates = source
                    .fetch(&ctx.instance)
                    .map_err(|source| ExecutionError::Source {
                        member: path.to_string(),
                        source,
                    })?;
                if candidates.is_empty() {
                    return Err(prompt_error(path, PromptError::NoCandidates(path.to_string())));
                }

                let labels = candidates
                    .iter()
                    .map(|candidate| match converter {
                        Some(conv) => conv.render(candidate),
                        None => display_value(candidate),
                    })
                    .collect();
                let request = SelectRequest {
                    title: title.clone(),
                    labels,
                    search_enabled: search.enabled,
                    placeholder: search.placeholder.clone(),
                    culture: culture.clone().or_else(|| ctx.culture.clone()),
                };
                let index = self
                    .guard(path, self.surface.ask_select(request))
                    .await?
                    .map_err(|source| prompt_error(path, source))?;

                let len = candidates.len();
                let Some(chosen) = candidates.into_iter().nth(index) else {
                    return Err(prompt_error(path, PromptError::InvalidSelection { index, len }));
                };
                ctx.instance.set(member.as_str(), chosen);
            }

            Operation::RunStep {
                member,
                status,
                step,
                ..
            } => {
                let outcome = match step {
                    StepHandle::Sync(call) => call(&mut ctx.instance),
                    StepHandle::Async(call) => {
                        let work = call(&mut ctx.instance);
                        if status.use_status {
                            let caption = status.status_text.as_deref().unwrap_or(member.as_str());
                            self.guard(path, self.surface.show_status(caption, work)).await?
                        } else {
                            self.guard(path, work).await?
                        }
                    }
                };
                outcome.map_err(|source| ExecutionError::Step {
                    member: path.to_string(),
                    source,
                })?;
            }

            Operation::Recurse { member, plan } => {
                let child = match ctx.instance.get(member) {
                    Some(Value::Object(fields)) => {
                        FormInstance::from_fields(plan.type_name.clone(), fields.clone())
                    }
                    None | Some(Value::Null) => {
                        construct_instance(plan, Map::new()).map_err(|err| {
                            ExecutionError::MissingDependency {
                                member: join_path(path, err.member()),
                            }
                        })?
                    }
                    Some(other) => {
                        return Err(ExecutionError::InvalidValue {
                            member: path.to_string(),
                            reason: format!("expected a {} object, found {other}", plan.type_name),
                        });
                    }
                };

                let culture = plan.culture.clone().or_else(|| ctx.culture.clone());
                let mut child_ctx = BuildContext::new(ctx.run_id, child, path.to_string(), culture);
                let outcome = self
                    .guard(path, self.execute(plan, &mut child_ctx))
                    .await
                    .and_then(|nested| nested);

                // Answers collected before a nested failure stay on the parent
                ctx.instance
                    .set(member.as_str(), Value::Object(child_ctx.instance.into_fields()));
                outcome?;
            }
        }
        Ok(())
    }

    /// Race `work` against cancellation.
    async fn guard<F: Future>(&self, path: &str, work: F) -> Result<F::Output, ExecutionError> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(ExecutionError::Cancelled {
                member: path.to_string(),
            }),
            output = work => Ok(output),
        }
    }
}

fn prompt_error(path: &str, source: PromptError) -> ExecutionError {
    ExecutionError::Prompt {
        member: path.to_string(),
        source,
    }
}

// ---------------------------------------------------------------------------
// Text coercion
// ---------------------------------------------------------------------------

/// Convert a free-text answer to the member's declared scalar type.
pub fn coerce_text(answer: &str, declared: &FieldType) -> Result<Value, String> {
    let trimmed = answer.trim();
    match declared {
        FieldType::Text => Ok(Value::String(answer.to_string())),
        FieldType::Integer => trimmed
            .parse::<i64>()
            .map(Value::from)
            .map_err(|e| format!("'{trimmed}' is not an integer: {e}")),
        FieldType::Decimal => {
            let number: f64 = trimmed
                .parse()
                .map_err(|e| format!("'{trimmed}' is not a number: {e}"))?;
            Number::from_f64(number)
                .map(Value::Number)
                .ok_or_else(|| format!("'{trimmed}' is not a finite number"))
        }
        FieldType::Boolean => match trimmed.to_ascii_lowercase().as_str() {
            "true" | "yes" | "y" => Ok(Value::Bool(true)),
            "false" | "no" | "n" => Ok(Value::Bool(false)),
            _ => Err(format!("'{trimmed}' is not yes/no")),
        },
        other => Err(format!("cannot read a {other} value from text")),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::binding::FormBindings;
    use crate::catalog::FormCatalog;
    use crate::compiler::FormCompiler;
    use crate::test_support::{Answer, ScriptedSurface};
    use formspec_types::declaration::{MemberDeclaration, PromptTag, ReturnShape, TypeDeclaration};
    use formspec_types::options::{SelectOptions, StepOptions, TextOptions};
    use serde_json::json;

    fn text(name: &str, field_type: FieldType) -> MemberDeclaration {
        MemberDeclaration::property(name, field_type)
            .tagged(PromptTag::TextPrompt(TextOptions::default()))
    }

    fn nested(name: &str, form: &str) -> MemberDeclaration {
        MemberDeclaration::property(name, FieldType::Form(form.to_string()))
            .tagged(PromptTag::NestedForm)
    }

    fn sync_step(name: &str) -> MemberDeclaration {
        MemberDeclaration::method(name, vec![], ReturnShape::Unit)
            .tagged(PromptTag::TaskStep(StepOptions::default()))
    }

    fn compile(catalog: &FormCatalog, name: &str) -> ExecutionPlan {
        FormCompiler::new(catalog, 16).compile(name).unwrap()
    }

    fn color_catalog(converter_calls: Arc<AtomicUsize>) -> FormCatalog {
        let mut catalog = FormCatalog::new();
        catalog.register(
            TypeDeclaration::new("Paint")
                .member(MemberDeclaration::method(
                    "palette",
                    vec![],
                    ReturnShape::Sequence(FieldType::Text),
                ))
                .member(MemberDeclaration::method(
                    "shout",
                    vec![FieldType::Text],
                    ReturnShape::Value(FieldType::Text),
                ))
                .member(MemberDeclaration::property("color", FieldType::Text).tagged(
                    PromptTag::SelectPrompt(SelectOptions {
                        title: Some("Color".to_string()),
                        source: "palette".to_string(),
                        converter: Some("shout".to_string()),
                        ..Default::default()
                    }),
                )),
            FormBindings::new()
                .source("palette", |_| Ok(vec![json!("red"), json!("green"), json!("blue")]))
                .converter("shout", move |v| {
                    converter_calls.fetch_add(1, Ordering::SeqCst);
                    display_value(v).to_uppercase()
                }),
        );
        catalog
    }

    #[tokio::test]
    async fn test_select_assigns_chosen_candidate() {
        let calls = Arc::new(AtomicUsize::new(0));
        let catalog = color_catalog(Arc::clone(&calls));
        let plan = compile(&catalog, "Paint");
        let surface = ScriptedSurface::new([Answer::Select(1)]);

        let result = Executor::new(&surface)
            .run(&plan, FormInstance::new("Paint"))
            .await
            .unwrap();

        assert_eq!(result.get("color"), Some(&json!("green")));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        let requests = surface.select_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].labels, vec!["RED", "GREEN", "BLUE"]);
        assert_eq!(requests[0].title, "Color");
    }

    #[tokio::test]
    async fn test_select_out_of_range_fails() {
        let catalog = color_catalog(Arc::new(AtomicUsize::new(0)));
        let plan = compile(&catalog, "Paint");
        let surface = ScriptedSurface::new([Answer::Select(7)]);

        let failure = Executor::new(&surface)
            .run(&plan, FormInstance::new("Paint"))
            .await
            .unwrap_err();
        assert!(matches!(
            failure.error,
            ExecutionError::Prompt {
                source: PromptError::InvalidSelection { index: 7, len: 3 },
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_property_source_with_no_candidates() {
        let mut catalog = FormCatalog::new();
        catalog.declare(
            TypeDeclaration::new("Invite")
                .member(MemberDeclaration::property(
                    "teams",
                    FieldType::List(Box::new(FieldType::Text)),
                ))
                .member(MemberDeclaration::property("team", FieldType::Text).tagged(
                    PromptTag::SelectPrompt(SelectOptions {
                        source: "teams".to_string(),
                        ..Default::default()
                    }),
                )),
        );
        let plan = compile(&catalog, "Invite");
        let surface = ScriptedSurface::empty();

        let failure = Executor::new(&surface)
            .run(&plan, FormInstance::new("Invite"))
            .await
            .unwrap_err();
        assert_eq!(failure.error.member(), "team");
        assert!(matches!(
            failure.error,
            ExecutionError::Prompt {
                source: PromptError::NoCandidates(_),
                ..
            }
        ));

        let mut seeded = FormInstance::new("Invite");
        seeded.set("teams", json!(["core", "web"]));
        let surface = ScriptedSurface::new([Answer::Select(0)]);
        let done = Executor::new(&surface).run(&plan, seeded).await.unwrap();
        assert_eq!(done.get_str("team"), Some("core"));
    }

    #[tokio::test]
    async fn test_nested_form_assigns_child() {
        let mut catalog = FormCatalog::new();
        catalog
            .declare(TypeDeclaration::new("Outer").member(nested("inner", "Inner")))
            .declare(TypeDeclaration::new("Inner").member(text("x", FieldType::Text)));
        let plan = compile(&catalog, "Outer");
        let surface = ScriptedSurface::new([Answer::text("hello")]);

        let outer = Executor::new(&surface)
            .run(&plan, FormInstance::new("Outer"))
            .await
            .unwrap();
        assert_eq!(outer.get("inner"), Some(&json!({ "x": "hello" })));
    }

    #[tokio::test]
    async fn test_nested_form_reuses_existing_child() {
        let mut catalog = FormCatalog::new();
        catalog
            .declare(TypeDeclaration::new("Outer").member(nested("inner", "Inner")))
            .declare(
                TypeDeclaration::new("Inner")
                    .member(MemberDeclaration::property("id", FieldType::Integer).required())
                    .member(text("x", FieldType::Text)),
            );
        let plan = compile(&catalog, "Outer");

        let surface = ScriptedSurface::empty();
        let failure = Executor::new(&surface)
            .run(&plan, FormInstance::new("Outer"))
            .await
            .unwrap_err();
        assert!(matches!(
            &failure.error,
            ExecutionError::MissingDependency { member } if member == "inner.id"
        ));

        let mut outer = FormInstance::new("Outer");
        outer.set("inner", json!({ "id": 4 }));
        let surface = ScriptedSurface::new([Answer::text("hi")]);
        let done = Executor::new(&surface).run(&plan, outer).await.unwrap();
        assert_eq!(done.get("inner"), Some(&json!({ "id": 4, "x": "hi" })));
    }

    #[tokio::test]
    async fn test_failing_step_keeps_earlier_members() {
        let mut catalog = FormCatalog::new();
        catalog.register(
            TypeDeclaration::new("Order")
                .member(text("item", FieldType::Text))
                .member(sync_step("reserve"))
                .member(text("note", FieldType::Text)),
            FormBindings::new().step("reserve", |_| Err(StepError::failed("out of stock"))),
        );
        let plan = compile(&catalog, "Order");
        let surface = ScriptedSurface::new([Answer::text("lamp"), Answer::text("unused")]);

        let failure = Executor::new(&surface)
            .run(&plan, FormInstance::new("Order"))
            .await
            .unwrap_err();
        assert_eq!(failure.state, RunState::Failed);
        assert_eq!(failure.error.member(), "reserve");
        assert_eq!(failure.partial.get_str("item"), Some("lamp"));
        assert!(!failure.partial.is_set("note"));
        assert_eq!(surface.remaining(), 1);
        assert!(failure.to_string().contains("out of stock"));
    }

    #[tokio::test]
    async fn test_nested_failure_keeps_child_answers() {
        let mut catalog = FormCatalog::new();
        catalog
            .declare(
                TypeDeclaration::new("Outer")
                    .member(text("top", FieldType::Text))
                    .member(nested("inner", "Inner")),
            )
            .declare(
                TypeDeclaration::new("Inner")
                    .member(text("name", FieldType::Text))
                    .member(text("age", FieldType::Integer)),
            );
        let plan = compile(&catalog, "Outer");
        let surface =
            ScriptedSurface::new([Answer::text("t"), Answer::text("ada"), Answer::text("old")]);

        let failure = Executor::new(&surface)
            .run(&plan, FormInstance::new("Outer"))
            .await
            .unwrap_err();
        assert_eq!(failure.error.member(), "inner.age");
        assert!(matches!(
            failure.error,
            ExecutionError::Prompt {
                source: PromptError::InvalidInput(_),
                ..
            }
        ));
        assert_eq!(failure.partial.get_str("top"), Some("t"));
        assert_eq!(failure.partial.get("inner"), Some(&json!({ "name": "ada" })));
    }

    #[tokio::test]
    async fn test_nested_cancellation_keeps_child_answers() {
        let mut catalog = FormCatalog::new();
        catalog
            .declare(TypeDeclaration::new("Outer").member(nested("inner", "Inner")))
            .declare(
                TypeDeclaration::new("Inner")
                    .member(text("name", FieldType::Text))
                    .member(text("email", FieldType::Text)),
            );
        let plan = compile(&catalog, "Outer");
        let surface = ScriptedSurface::new([Answer::text("ada"), Answer::Hang]);
        let token = CancellationToken::new();

        let executor = Executor::new(&surface).with_cancellation(token.clone());
        let cancel = async {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            token.cancel();
        };
        let (outcome, ()) = tokio::join!(executor.run(&plan, FormInstance::new("Outer")), cancel);

        let failure = outcome.unwrap_err();
        assert!(failure.error.is_cancelled());
        assert_eq!(failure.partial.get("inner"), Some(&json!({ "name": "ada" })));
    }

    #[tokio::test]
    async fn test_async_step_with_status() {
        let mut catalog = FormCatalog::new();
        catalog.register(
            TypeDeclaration::new("Signup")
                .member(text("name", FieldType::Text))
                .member(
                    MemberDeclaration::method(
                        "register",
                        vec![],
                        ReturnShape::Deferred(Box::new(ReturnShape::Unit)),
                    )
                    .tagged(PromptTag::TaskStep(StepOptions {
                        use_status: true,
                        status_text: Some("Registering...".to_string()),
                    })),
                ),
            FormBindings::new().async_step("register", |inst| {
                Box::pin(async move {
                    tokio::task::yield_now().await;
                    let id = format!("acct-{}", inst.get_str("name").unwrap_or_default());
                    inst.set("account_id", id);
                    Ok(())
                })
            }),
        );
        let plan = compile(&catalog, "Signup");
        assert!(plan.is_async());
        let surface = ScriptedSurface::new([Answer::text("ada")]);

        let done = Executor::new(&surface)
            .run(&plan, FormInstance::new("Signup"))
            .await
            .unwrap();
        assert_eq!(done.get_str("account_id"), Some("acct-ada"));
        assert_eq!(surface.statuses(), vec!["Registering...".to_string()]);
    }

    #[tokio::test]
    async fn test_run_is_idempotent_for_equal_inputs() {
        let mut catalog = FormCatalog::new();
        catalog.declare(
            TypeDeclaration::new("Profile")
                .member(text("name", FieldType::Text))
                .member(text("age", FieldType::Integer))
                .member(text("newsletter", FieldType::Boolean)),
        );
        let plan = compile(&catalog, "Profile");
        let script = || [Answer::text("Ada"), Answer::text(" 36 "), Answer::text("Yes")];

        let first_surface = ScriptedSurface::new(script());
        let second_surface = ScriptedSurface::new(script());
        let first = Executor::new(&first_surface)
            .run(&plan, FormInstance::new("Profile"))
            .await
            .unwrap();
        let second = Executor::new(&second_surface)
            .run(&plan, FormInstance::new("Profile"))
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(first.get("age"), Some(&json!(36)));
        assert_eq!(first.get("newsletter"), Some(&json!(true)));
    }

    #[tokio::test]
    async fn test_cancellation_names_pending_member() {
        let mut catalog = FormCatalog::new();
        catalog.declare(
            TypeDeclaration::new("Slow")
                .member(text("first", FieldType::Text))
                .member(text("second", FieldType::Text)),
        );
        let plan = compile(&catalog, "Slow");
        let surface = ScriptedSurface::new([Answer::text("a"), Answer::Hang]);
        let token = CancellationToken::new();

        let executor = Executor::new(&surface).with_cancellation(token.clone());
        let cancel = async {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            token.cancel();
        };
        let (outcome, ()) = tokio::join!(executor.run(&plan, FormInstance::new("Slow")), cancel);

        let failure = outcome.unwrap_err();
        assert!(failure.error.is_cancelled());
        assert_eq!(failure.error.member(), "second");
        assert_eq!(failure.partial.get_str("first"), Some("a"));
    }

    #[tokio::test]
    async fn test_culture_falls_back_to_form_then_default() {
        let mut catalog = FormCatalog::new();
        catalog.declare(
            TypeDeclaration::new("Greeting")
                .with_culture("fr-FR")
                .member(text("a", FieldType::Text))
                .member(MemberDeclaration::property("b", FieldType::Text).tagged(
                    PromptTag::TextPrompt(TextOptions {
                        culture: Some("de-DE".to_string()),
                        ..Default::default()
                    }),
                )),
        );
        let plan = compile(&catalog, "Greeting");
        let surface = ScriptedSurface::new([Answer::text("x"), Answer::text("y")]);
        Executor::new(&surface)
            .with_default_culture(Some("en-US".to_string()))
            .run(&plan, FormInstance::new("Greeting"))
            .await
            .unwrap();

        let cultures: Vec<Option<String>> =
            surface.text_requests().into_iter().map(|r| r.culture).collect();
        assert_eq!(cultures, vec![Some("fr-FR".to_string()), Some("de-DE".to_string())]);
    }

    #[tokio::test]
    async fn test_select_culture_overrides_form_culture() {
        let mut catalog = FormCatalog::new();
        catalog.declare(
            TypeDeclaration::new("Invite")
                .with_culture("fr-FR")
                .member(MemberDeclaration::property(
                    "teams",
                    FieldType::List(Box::new(FieldType::Text)),
                ))
                .member(MemberDeclaration::property("team", FieldType::Text).tagged(
                    PromptTag::SelectPrompt(SelectOptions {
                        source: "teams".to_string(),
                        culture: Some("it-IT".to_string()),
                        ..Default::default()
                    }),
                ))
                .member(MemberDeclaration::property("backup", FieldType::Text).tagged(
                    PromptTag::SelectPrompt(SelectOptions {
                        source: "teams".to_string(),
                        ..Default::default()
                    }),
                )),
        );
        let plan = compile(&catalog, "Invite");
        let mut seeded = FormInstance::new("Invite");
        seeded.set("teams", json!(["core", "web"]));
        let surface = ScriptedSurface::new([Answer::Select(0), Answer::Select(1)]);

        Executor::new(&surface).run(&plan, seeded).await.unwrap();

        let cultures: Vec<Option<String>> =
            surface.select_requests().into_iter().map(|r| r.culture).collect();
        assert_eq!(cultures, vec![Some("it-IT".to_string()), Some("fr-FR".to_string())]);
    }

    #[test]
    fn test_construct_requires_dependencies() {
        let mut catalog = FormCatalog::new();
        catalog.declare(
            TypeDeclaration::new("Invite")
                .constructor(formspec_types::declaration::ConstructorDeclaration::new(vec![(
                    "inviter",
                    FieldType::Text,
                )]))
                .member(text("email", FieldType::Text)),
        );
        let plan = compile(&catalog, "Invite");

        let err = construct_instance(&plan, Map::new()).unwrap_err();
        assert_eq!(err.member(), "inviter");

        let mut supplied = Map::new();
        supplied.insert("inviter".to_string(), json!("ada"));
        supplied.insert("extra".to_string(), json!(1));
        let inst = construct_instance(&plan, supplied).unwrap();
        assert_eq!(inst.type_name(), "Invite");
        assert_eq!(inst.get_str("inviter"), Some("ada"));
        assert!(inst.is_set("extra"));
    }

    #[test]
    fn test_coerce_text() {
        assert_eq!(coerce_text("42", &FieldType::Integer).unwrap(), json!(42));
        assert_eq!(coerce_text("2.5", &FieldType::Decimal).unwrap(), json!(2.5));
        assert_eq!(coerce_text("N", &FieldType::Boolean).unwrap(), json!(false));
        assert_eq!(coerce_text(" keep ", &FieldType::Text).unwrap(), json!(" keep "));
        assert!(coerce_text("4x", &FieldType::Integer).is_err());
        assert!(coerce_text("maybe", &FieldType::Boolean).is_err());
        assert!(coerce_text("NaN", &FieldType::Decimal).is_err());
    }
}
