use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use covergen_core::paths;
use covergen_core::project::BookInfo;
use covergen_core::stages::GenerationResults;
use covergen_core::store::StateStore as _;
use serde::Deserialize;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CreateProjectBody {
    pub title: String,
    pub author: String,
    pub genre: String,
    pub description: String,
}

/// GET /api/projects: every project, most recently updated first.
pub async fn list_projects(
    State(app): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let controller = app.controller.clone();
    let projects = tokio::task::spawn_blocking(move || controller.list_projects())
        .await
        .map_err(AppError::join)??;

    let list: Vec<serde_json::Value> = projects
        .iter()
        .map(|p| {
            let recorded = p.status.as_ref().is_some_and(|s| s.is_running);
            let mut value = serde_json::to_value(p).unwrap_or_default();
            value["is_running"] = serde_json::json!(recorded || app.is_active(&p.slug));
            value
        })
        .collect();
    Ok(Json(serde_json::json!(list)))
}

/// POST /api/projects: create a project from book details.
pub async fn create_project(
    State(app): State<AppState>,
    Json(body): Json<CreateProjectBody>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    let book = BookInfo::new(body.title, body.author, body.genre, body.description);
    let controller = app.controller.clone();
    let result = tokio::task::spawn_blocking(move || {
        let slug = controller.create_project(&book)?;
        let status = controller.get_status(&slug)?;
        Ok::<_, covergen_core::CoverError>(serde_json::json!({
            "slug": slug,
            "status": status,
        }))
    })
    .await
    .map_err(AppError::join)??;

    Ok((StatusCode::CREATED, Json(result)))
}

/// GET /api/projects/{slug}: input, workflow record, status and covers.
pub async fn get_project(
    State(app): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let controller = app.controller.clone();
    let active = app.is_active(&slug);
    let result = tokio::task::spawn_blocking(move || {
        let handle = controller.resolve_project(&slug)?;
        let covers = match controller.store().read_file(&slug, paths::GENERATION_FILE)? {
            Some(raw) => serde_json::from_slice::<GenerationResults>(&raw)?.images,
            None => Vec::new(),
        };
        let status = covergen_core::status::StatusSummary::from_state(&handle.state);
        Ok::<_, covergen_core::CoverError>(serde_json::json!({
            "slug": handle.slug,
            "input": handle.input,
            "state": handle.state,
            "is_running": status.is_running || active,
            "status": status,
            "covers": covers,
        }))
    })
    .await
    .map_err(AppError::join)??;

    Ok(Json(result))
}

/// GET /api/projects/{slug}/status: progress for polling clients.
pub async fn get_status(
    State(app): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let controller = app.controller.clone();
    let active = app.is_active(&slug);
    let status = tokio::task::spawn_blocking(move || controller.get_status(&slug))
        .await
        .map_err(AppError::join)??;

    let mut value = serde_json::to_value(&status)?;
    value["is_running"] = serde_json::json!(status.is_running || active);
    Ok(Json(value))
}
