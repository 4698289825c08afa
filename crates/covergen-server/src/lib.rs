pub mod error;
pub mod routes;
pub mod state;

use axum::routing::{get, post};
use axum::Router;
use std::path::PathBuf;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use state::AppState;

/// Build the axum Router with all API routes and middleware.
/// Used by `serve()` and available for integration testing.
pub fn build_router(app_state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Events (SSE)
        .route("/api/events", get(routes::events::sse_events))
        // Projects
        .route(
            "/api/projects",
            get(routes::projects::list_projects).post(routes::projects::create_project),
        )
        .route("/api/projects/{slug}", get(routes::projects::get_project))
        .route(
            "/api/projects/{slug}/status",
            get(routes::projects::get_status),
        )
        // Runs
        .route("/api/projects/{slug}/generate", post(routes::runs::generate))
        .route(
            "/api/projects/{slug}/steps/{step}",
            post(routes::runs::run_step),
        )
        // Covers
        .route("/api/covers/{slug}/{file}", get(routes::covers::get_cover))
        // Genres
        .route("/api/genres", get(routes::genres::list_genres))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

/// Load config, recover steps left running by a dead process, and build the
/// router.
async fn prepare(root: PathBuf) -> anyhow::Result<Router> {
    let app_state = AppState::open(root)?;
    let controller = app_state.controller.clone();
    let recovered = tokio::task::spawn_blocking(move || controller.reconcile_all()).await??;
    for (slug, step) in &recovered {
        tracing::warn!(slug = %slug, step = %step, "step was interrupted; it will rerun on resume");
    }
    Ok(build_router(app_state))
}

/// Start the covergen HTTP API.
pub async fn serve(root: PathBuf, port: u16, open_browser: bool) -> anyhow::Result<()> {
    let app = prepare(root).await?;

    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("covergen server listening on http://localhost:{port}");

    if open_browser {
        let url = format!("http://localhost:{port}/api/projects");
        let _ = open::that(&url);
    }

    axum::serve(listener, app).await?;
    Ok(())
}

/// Start the covergen HTTP API on a pre-bound listener.
///
/// Unlike `serve`, this accepts a `TcpListener` that was already bound so the
/// caller can read the actual port before starting (useful when `port = 0` and
/// the OS picks a free port).
pub async fn serve_on(
    root: PathBuf,
    listener: tokio::net::TcpListener,
    open_browser: bool,
) -> anyhow::Result<()> {
    let actual_port = listener.local_addr()?.port();
    let app = prepare(root).await?;

    tracing::info!("covergen server listening on http://localhost:{actual_port}");

    if open_browser {
        let url = format!("http://localhost:{actual_port}/api/projects");
        let _ = open::that(&url);
    }

    axum::serve(listener, app).await?;
    Ok(())
}
