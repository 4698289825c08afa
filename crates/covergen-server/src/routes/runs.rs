use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use covergen_core::state::WorkflowState;
use covergen_core::store::StateStore as _;
use covergen_core::CoverError;
use serde::Deserialize;
use tracing::{info, warn};

use crate::error::AppError;
use crate::state::{AppState, RunEvent, RunGuard};

#[derive(Debug, Clone)]
enum Job {
    All,
    Step { step: String, rerun: bool },
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct StepQuery {
    pub rerun: bool,
}

/// Run `job` on the blocking pool. The guard is released before
/// `run_finished` is sent so a client reacting to it can start another run.
fn spawn_job(app: &AppState, guard: RunGuard, slug: String, job: Job) {
    let step = match &job {
        Job::All => None,
        Job::Step { step, .. } => Some(step.clone()),
    };
    app.emit(RunEvent::RunStarted {
        slug: slug.clone(),
        step,
    });

    let app = app.clone();
    tokio::task::spawn_blocking(move || {
        let controller = &app.controller;
        let result = match &job {
            Job::All => controller.run_all(&slug),
            Job::Step { step, rerun: true } => controller.rerun(&slug, step),
            Job::Step { step, rerun: false } => controller.run_step(&slug, Some(step)),
        };
        drop(guard);

        let error = match result {
            Ok(state) => {
                info!(
                    slug = %slug,
                    completed = state.completed_steps(),
                    total = state.total_steps(),
                    "background run finished"
                );
                None
            }
            Err(e) => {
                warn!(slug = %slug, error = %e, "background run failed");
                Some(e.summary())
            }
        };
        app.emit(RunEvent::RunFinished {
            slug,
            ok: error.is_none(),
            error,
        });
    });
}

fn claim(app: &AppState, slug: &str) -> Result<RunGuard, AppError> {
    app.try_begin_run(slug)
        .ok_or_else(|| AppError::conflict(format!("a run is already active for '{slug}'")))
}

/// Load `slug` after recovering a step whose owning process has died, so a
/// crashed CLI run does not block the web flow.
async fn recovered_state(app: &AppState, slug: &str) -> Result<WorkflowState, AppError> {
    let controller = app.controller.clone();
    let slug = slug.to_string();
    let state = tokio::task::spawn_blocking(move || {
        if let Some(step) = controller.reconcile(&slug)? {
            info!(slug = %slug, step = %step, "recovered interrupted step");
        }
        controller.store().load_state(&slug)
    })
    .await
    .map_err(AppError::join)??;
    Ok(state)
}

/// POST /api/projects/{slug}/generate: run every remaining step in the
/// background. Returns 202 immediately; poll status or listen on events.
pub async fn generate(
    State(app): State<AppState>,
    Path(slug): Path<String>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    let state = recovered_state(&app, &slug).await?;
    // Running under another process (e.g. the CLI).
    if let Some(step) = state.running_step() {
        return Err(CoverError::StepAlreadyRunning {
            slug,
            step: step.to_string(),
        }
        .into());
    }

    let guard = claim(&app, &slug)?;
    info!(slug = %slug, "generation requested");
    spawn_job(&app, guard, slug.clone(), Job::All);

    Ok((
        StatusCode::ACCEPTED,
        Json(serde_json::json!({
            "slug": slug,
            "started": true,
            "current_step": state.current_step(),
        })),
    ))
}

/// POST /api/projects/{slug}/steps/{step}[?rerun=true]: run one step in the
/// background. The step must be the next pending one unless `rerun` is set.
pub async fn run_step(
    State(app): State<AppState>,
    Path((slug, step)): Path<(String, String)>,
    Query(query): Query<StepQuery>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    let name = app.controller.pipeline().resolve(&step)?.1.name.clone();

    let state = recovered_state(&app, &slug).await?;
    state.check_runnable(&name, query.rerun)?;

    let guard = claim(&app, &slug)?;
    info!(slug = %slug, step = %name, rerun = query.rerun, "step requested");
    spawn_job(
        &app,
        guard,
        slug.clone(),
        Job::Step {
            step: name.clone(),
            rerun: query.rerun,
        },
    );

    Ok((
        StatusCode::ACCEPTED,
        Json(serde_json::json!({
            "slug": slug,
            "step": name,
            "rerun": query.rerun,
            "started": true,
        })),
    ))
}
