use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoverError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid slug '{0}': must be lowercase alphanumeric with hyphens")]
    InvalidSlug(String),

    #[error("project not found: {0}")]
    ProjectNotFound(String),

    #[error("corrupt workflow state for '{slug}': {reason}")]
    CorruptState { slug: String, reason: String },

    #[error("unknown step: {0}")]
    UnknownStep(String),

    #[error("step '{requested}' is out of order: next step is {expected}")]
    StepOutOfOrder { requested: String, expected: String },

    #[error("step '{step}' is already running for '{slug}'")]
    StepAlreadyRunning { slug: String, step: String },

    #[error("all steps are complete for '{0}'")]
    AllStepsComplete(String),

    #[error("invalid transition for step '{step}': {from} -> {to}")]
    InvalidTransition {
        step: String,
        from: String,
        to: String,
    },

    #[error("step '{step}' may not read the artifact of '{dependency}'")]
    UndeclaredDependency { step: String, dependency: String },

    #[error("step '{step}' failed: {message}")]
    Collaborator { step: String, message: String },

    #[error("config error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl CoverError {
    /// Summary persisted into `step_results` when a step fails.
    ///
    /// Collaborator failures record the collaborator's own message so it can
    /// be shown verbatim; everything else records the full display string.
    pub fn summary(&self) -> String {
        match self {
            CoverError::Collaborator { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CoverError>;
