use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Viewer Router Module
///
/// Read access to the catalog. Wrapped in `auth::viewer_guard`, which
/// answers 401 for unauthenticated callers and 403 for identities holding
/// neither USER nor ADMIN.
pub fn viewer_routes() -> Router<AppState> {
    Router::new()
        // GET /animes
        // Every anime, in storage order.
        .route("/animes", get(handlers::list_animes))
        // GET /animes/{id}
        // A single anime; 404 "Anime not found" when the id is unknown.
        .route("/animes/{id}", get(handlers::get_anime))
}
