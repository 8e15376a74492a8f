use thiserror::Error;

/// Structural defects found while extracting, resolving, or lowering a form.
///
/// These are build-time failures: a plan is never produced for a type that
/// raises one, and they are never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("unknown form type '{0}'")]
    UnknownType(String),

    #[error("duplicate member '{type_name}.{member}'")]
    DuplicateMember { type_name: String, member: String },

    #[error("member '{type_name}.{member}' carries conflicting tags: {tags}")]
    ConflictingTags {
        type_name: String,
        member: String,
        tags: String,
    },

    #[error("invalid member '{type_name}.{member}': {reason}")]
    InvalidMemberType {
        type_name: String,
        member: String,
        reason: String,
    },

    #[error("unresolved choices source '{source_name}' for member '{type_name}.{member}'")]
    UnresolvedSource {
        type_name: String,
        member: String,
        source_name: String,
    },

    #[error("unresolved converter '{converter}' for member '{type_name}.{member}'")]
    UnresolvedConverter {
        type_name: String,
        member: String,
        converter: String,
    },

    #[error("ambiguous binding '{name}' for member '{type_name}.{member}': {candidates} candidates")]
    AmbiguousBinding {
        type_name: String,
        member: String,
        name: String,
        candidates: usize,
    },

    #[error("incompatible signature for '{name}' bound to '{type_name}.{member}': {reason}")]
    IncompatibleSignature {
        type_name: String,
        member: String,
        name: String,
        reason: String,
    },

    #[error("no implementation registered for '{type_name}.{name}'")]
    MissingImplementation { type_name: String, name: String },

    #[error("ambiguous constructor for type '{0}'")]
    AmbiguousConstructor(String),

    #[error("duplicate required dependency '{type_name}.{name}'")]
    DuplicateDependency { type_name: String, name: String },

    #[error("constructor parameter '{type_name}.{name}' is also a prompted member")]
    ConflictingDependency { type_name: String, name: String },

    #[error("cyclic nested form reference: {0}")]
    CyclicNesting(String),

    #[error("nested form depth {depth} exceeds maximum {max} at type '{type_name}'")]
    NestingTooDeep {
        type_name: String,
        depth: u32,
        max: u32,
    },

    #[error("form '{0}' contains asynchronous operations and cannot run synchronously")]
    AsyncPlanRequiresAsyncRun(String),
}

/// Errors raised by a prompting surface while collecting input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PromptError {
    #[error("prompt cancelled by user")]
    Cancelled,

    #[error("no candidates available for '{0}'")]
    NoCandidates(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("selection {index} out of range ({len} candidates)")]
    InvalidSelection { index: usize, len: usize },

    #[error("terminal I/O error: {0}")]
    Io(String),
}

/// Errors raised by a task step body. Opaque to the executor.
#[derive(Debug, Error)]
pub enum StepError {
    #[error("{0}")]
    Failed(String),

    #[error(transparent)]
    Source(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl StepError {
    pub fn failed(message: impl Into<String>) -> Self {
        StepError::Failed(message.into())
    }
}
