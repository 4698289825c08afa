use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use covergen_core::CoverError;

// ---------------------------------------------------------------------------
// Internal sentinels for explicit statuses
// ---------------------------------------------------------------------------

/// Carries an explicit HTTP 409 through the `anyhow::Error` chain without a
/// matching `CoverError` variant.
#[derive(Debug)]
struct ConflictError(String);

impl std::fmt::Display for ConflictError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for ConflictError {}

/// Carries an explicit HTTP 404 for things that are not projects.
#[derive(Debug)]
struct NotFoundError(String);

impl std::fmt::Display for NotFoundError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for NotFoundError {}

// ---------------------------------------------------------------------------
// AppError: unified error type for HTTP responses
// ---------------------------------------------------------------------------

/// Any handler error; the status comes from the wrapped `CoverError` or
/// sentinel, defaulting to 500.
#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

impl AppError {
    /// HTTP 409, e.g. a second run for a project that already has one.
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self(ConflictError(msg.into()).into())
    }

    /// HTTP 404 for a missing file inside an existing project.
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self(NotFoundError(msg.into()).into())
    }

    /// A `spawn_blocking` task that never returned.
    pub fn join(err: tokio::task::JoinError) -> Self {
        Self(anyhow::anyhow!("task join error: {err}"))
    }
}

fn status_for(err: &CoverError) -> StatusCode {
    match err {
        CoverError::InvalidInput(_) | CoverError::InvalidSlug(_) | CoverError::UnknownStep(_) => {
            StatusCode::BAD_REQUEST
        }
        CoverError::ProjectNotFound(_) => StatusCode::NOT_FOUND,
        CoverError::StepOutOfOrder { .. }
        | CoverError::StepAlreadyRunning { .. }
        | CoverError::AllStepsComplete(_)
        | CoverError::InvalidTransition { .. } => StatusCode::CONFLICT,
        CoverError::Collaborator { .. } => StatusCode::BAD_GATEWAY,
        CoverError::CorruptState { .. }
        | CoverError::UndeclaredDependency { .. }
        | CoverError::Config(_)
        | CoverError::Io(_)
        | CoverError::Yaml(_)
        | CoverError::Json(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let Some(c) = self.0.downcast_ref::<ConflictError>() {
            let body = serde_json::json!({ "error": c.0.clone() });
            return (StatusCode::CONFLICT, axum::Json(body)).into_response();
        }
        if let Some(n) = self.0.downcast_ref::<NotFoundError>() {
            let body = serde_json::json!({ "error": n.0.clone() });
            return (StatusCode::NOT_FOUND, axum::Json(body)).into_response();
        }

        let status = self
            .0
            .downcast_ref::<CoverError>()
            .map(status_for)
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            tracing::error!(error = %format!("{:#}", self.0), "request failed");
        }

        let body = serde_json::json!({ "error": format!("{:#}", self.0) });
        (status, axum::Json(body)).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
