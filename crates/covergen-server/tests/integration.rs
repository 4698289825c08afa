use axum::http::StatusCode;
use covergen_core::config::{Config, ImageProvider};
use covergen_core::store::StateStore as _;
use covergen_server::{build_router, AppState};
use http_body_util::BodyExt;
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// A workspace configured for offline placeholder images.
fn init_workspace(dir: &TempDir) -> AppState {
    let mut config = Config::default();
    config.images.provider = ImageProvider::Placeholder;
    config.save(dir.path()).unwrap();
    AppState::open(dir.path().to_path_buf()).unwrap()
}

/// Send a GET request via `oneshot` and return (status, parsed JSON body).
async fn get(app: axum::Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let req = axum::http::Request::builder()
        .uri(uri)
        .body(axum::body::Body::empty())
        .unwrap();
    let response = app.oneshot(req).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    (status, json)
}

/// Send a POST request with a JSON body via `oneshot` and return (status, parsed JSON body).
async fn post_json(
    app: axum::Router,
    uri: &str,
    body: serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let req = axum::http::Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(axum::body::Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap();
    let response = app.oneshot(req).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    (status, json)
}

async fn post(app: axum::Router, uri: &str) -> (StatusCode, serde_json::Value) {
    post_json(app, uri, serde_json::json!({})).await
}

async fn create_book(app: &AppState) -> String {
    let (status, json) = post_json(
        build_router(app.clone()),
        "/api/projects",
        serde_json::json!({
            "title": "Blood Moon Rising",
            "author": "Sara Riouch",
            "genre": "paranormal romance",
            "description": "A werewolf alpha and a hunted witch."
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{json}");
    json["slug"].as_str().unwrap().to_string()
}

/// Poll the status route until no run is active, returning the final status.
async fn wait_idle(app: &AppState, slug: &str) -> serde_json::Value {
    for _ in 0..200 {
        let (status, json) = get(
            build_router(app.clone()),
            &format!("/api/projects/{slug}/status"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        if json["is_running"] == false {
            return json;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("run for {slug} did not finish");
}

// ---------------------------------------------------------------------------
// Projects
// ---------------------------------------------------------------------------

#[tokio::test]
async fn list_projects_starts_empty() {
    let dir = TempDir::new().unwrap();
    let app = init_workspace(&dir);
    let (status, json) = get(build_router(app), "/api/projects").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, serde_json::json!([]));
}

#[tokio::test]
async fn create_then_get_project() {
    let dir = TempDir::new().unwrap();
    let app = init_workspace(&dir);
    let slug = create_book(&app).await;
    assert_eq!(slug, "blood-moon-rising-sara-riouch");

    let (status, json) = get(build_router(app.clone()), &format!("/api/projects/{slug}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["input"]["book_info"]["title"], "Blood Moon Rising");
    assert_eq!(json["status"]["total_steps"], 6);
    assert_eq!(json["status"]["current_step_name"], "Input Collection");
    assert_eq!(json["covers"], serde_json::json!([]));

    let (_, list) = get(build_router(app), "/api/projects").await;
    assert_eq!(list.as_array().unwrap().len(), 1);
    assert_eq!(list[0]["slug"], slug.as_str());
    assert_eq!(list[0]["is_running"], false);
}

#[tokio::test]
async fn create_without_title_is_400() {
    let dir = TempDir::new().unwrap();
    let app = init_workspace(&dir);
    let (status, json) = post_json(
        build_router(app),
        "/api/projects",
        serde_json::json!({ "author": "Sara Riouch", "genre": "romance" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("title"));
}

#[tokio::test]
async fn unknown_project_is_404() {
    let dir = TempDir::new().unwrap();
    let app = init_workspace(&dir);
    let (status, json) = get(build_router(app.clone()), "/api/projects/ghost/status").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(json["error"].is_string());

    let (status, _) = post(build_router(app), "/api/projects/ghost/generate").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Runs
// ---------------------------------------------------------------------------

#[tokio::test]
async fn generate_runs_pipeline_in_background() {
    let dir = TempDir::new().unwrap();
    let app = init_workspace(&dir);
    let slug = create_book(&app).await;

    let (status, json) = post(build_router(app.clone()), &format!("/api/projects/{slug}/generate")).await;
    assert_eq!(status, StatusCode::ACCEPTED, "{json}");
    assert_eq!(json["started"], true);

    let done = wait_idle(&app, &slug).await;
    assert_eq!(done["is_complete"], true, "{done}");
    assert_eq!(done["completed_steps"], 6);
    assert_eq!(done["percent_complete"], 100);

    let (_, project) = get(build_router(app.clone()), &format!("/api/projects/{slug}")).await;
    let covers = project["covers"].as_array().unwrap();
    assert_eq!(covers.len(), 8);

    // Serve the first cover back.
    let file = covers[0]["file"].as_str().unwrap().trim_start_matches("covers/");
    let req = axum::http::Request::builder()
        .uri(format!("/api/covers/{slug}/{file}"))
        .body(axum::body::Body::empty())
        .unwrap();
    let response = build_router(app).oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let ct = response
        .headers()
        .get(axum::http::header::CONTENT_TYPE)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(ct.starts_with("text/plain"), "{ct}");
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert!(!body.is_empty());
}

#[tokio::test]
async fn step_route_enforces_order() {
    let dir = TempDir::new().unwrap();
    let app = init_workspace(&dir);
    let slug = create_book(&app).await;

    let (status, json) = post(
        build_router(app.clone()),
        &format!("/api/projects/{slug}/steps/image_generation"),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT, "{json}");

    let (status, _) = post(
        build_router(app.clone()),
        &format!("/api/projects/{slug}/steps/binding"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, json) = post(
        build_router(app.clone()),
        &format!("/api/projects/{slug}/steps/input_collection"),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(json["step"], "Input Collection");

    let done = wait_idle(&app, &slug).await;
    assert_eq!(done["completed_steps"], 1);
    assert_eq!(done["current_step_name"], "Market Research");
}

#[tokio::test]
async fn completed_project_step_rerun() {
    let dir = TempDir::new().unwrap();
    let app = init_workspace(&dir);
    let slug = create_book(&app).await;
    post(build_router(app.clone()), &format!("/api/projects/{slug}/generate")).await;
    wait_idle(&app, &slug).await;

    let (status, _) = post(
        build_router(app.clone()),
        &format!("/api/projects/{slug}/steps/output_organization"),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = post(
        build_router(app.clone()),
        &format!("/api/projects/{slug}/steps/output_organization?rerun=true"),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    let done = wait_idle(&app, &slug).await;
    assert_eq!(done["is_complete"], true);
}

#[tokio::test]
async fn second_generate_while_active_is_409() {
    let dir = TempDir::new().unwrap();
    let app = init_workspace(&dir);
    let slug = create_book(&app).await;

    // Hold the claim as an in-flight run would.
    let _guard = app.try_begin_run(&slug).unwrap();
    let (status, json) = post(build_router(app.clone()), &format!("/api/projects/{slug}/generate")).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(json["error"].as_str().unwrap().contains("already active"));

    let (_, status_json) = get(build_router(app), &format!("/api/projects/{slug}/status")).await;
    assert_eq!(status_json["is_running"], true);
}

#[tokio::test]
async fn generate_recovers_step_left_by_dead_process() {
    let dir = TempDir::new().unwrap();
    let app = init_workspace(&dir);
    let slug = create_book(&app).await;

    // A CLI run that died mid-step while the server was up.
    let store = app.controller.store();
    store.mark_step_running(&slug, "Input Collection").unwrap();
    let mut state = store.load_state(&slug).unwrap();
    if let Some(record) = state.step_results.get_mut("Input Collection") {
        record.owner_pid = Some(u32::MAX - 1);
        record.owner_token = Some("crashed-cli".into());
    }
    store.save_state(&slug, &state).unwrap();

    let (status, json) = post(build_router(app.clone()), &format!("/api/projects/{slug}/generate")).await;
    assert_eq!(status, StatusCode::ACCEPTED, "{json}");
    assert_eq!(json["current_step"], "Input Collection");

    let done = wait_idle(&app, &slug).await;
    assert_eq!(done["is_complete"], true, "{done}");
}

#[tokio::test]
async fn step_route_recovers_step_left_by_dead_process() {
    let dir = TempDir::new().unwrap();
    let app = init_workspace(&dir);
    let slug = create_book(&app).await;

    let store = app.controller.store();
    store.mark_step_running(&slug, "Input Collection").unwrap();
    let mut state = store.load_state(&slug).unwrap();
    if let Some(record) = state.step_results.get_mut("Input Collection") {
        record.owner_pid = Some(u32::MAX - 1);
        record.owner_token = Some("crashed-cli".into());
    }
    store.save_state(&slug, &state).unwrap();

    let (status, json) = post(
        build_router(app.clone()),
        &format!("/api/projects/{slug}/steps/input_collection"),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED, "{json}");
    let done = wait_idle(&app, &slug).await;
    assert_eq!(done["completed_steps"], 1);
}

// ---------------------------------------------------------------------------
// Covers and genres
// ---------------------------------------------------------------------------

#[tokio::test]
async fn missing_cover_is_404() {
    let dir = TempDir::new().unwrap();
    let app = init_workspace(&dir);
    let slug = create_book(&app).await;
    let (status, _) = get(build_router(app), &format!("/api/covers/{slug}/nope.png")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn cover_path_traversal_is_rejected() {
    let dir = TempDir::new().unwrap();
    let app = init_workspace(&dir);
    let slug = create_book(&app).await;
    let (status, _) = get(
        build_router(app.clone()),
        &format!("/api/covers/{slug}/..%2Finput.json"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = get(build_router(app), "/api/covers/..%2F..%2Fetc/passwd").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn genres_are_listed() {
    let dir = TempDir::new().unwrap();
    let app = init_workspace(&dir);
    let (status, json) = get(build_router(app), "/api/genres").await;
    assert_eq!(status, StatusCode::OK);
    let genres = json["genres"].as_array().unwrap();
    assert!(genres.iter().any(|g| g == "paranormal romance"));
}
