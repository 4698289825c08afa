use axum::extract::{Path, State};
use axum::http::header;
use axum::response::IntoResponse;
use covergen_core::paths;
use covergen_core::store::StateStore as _;

use crate::error::AppError;
use crate::state::AppState;

/// GET /api/covers/{slug}/{file}: a generated cover image or placeholder.
pub async fn get_cover(
    State(app): State<AppState>,
    Path((slug, file)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    paths::validate_slug(&slug)?;
    let name = format!("{}/{file}", paths::COVERS_DIR);
    paths::validate_artifact_name(&name)?;

    let store = app.controller.store().clone();
    let lookup = name.clone();
    let data = tokio::task::spawn_blocking(move || store.read_file(&slug, &lookup))
        .await
        .map_err(AppError::join)??
        .ok_or_else(|| AppError::not_found(format!("cover not found: {name}")))?;

    let mime = mime_guess::from_path(&file).first_or_octet_stream();
    Ok(([(header::CONTENT_TYPE, mime.to_string())], data))
}
