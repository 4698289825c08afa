use axum::Json;
use covergen_core::collab::research::SUPPORTED_GENRES;

/// GET /api/genres: genres with dedicated market research.
pub async fn list_genres() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "genres": SUPPORTED_GENRES }))
}
