use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{post, put},
};

/// Admin Router Module
///
/// Every catalog write. Wrapped in `auth::admin_guard`: unauthenticated
/// callers get 401, authenticated callers without ADMIN get 403, and the
/// handler never runs in either case.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // POST /animes
        // Creates one anime; the store assigns the id. 400 on an empty name.
        .route("/animes", post(handlers::create_anime))
        // POST /animes/batch
        // Creates several animes in order. Names are checked after each insert.
        .route("/animes/batch", post(handlers::batch_create_animes))
        // PUT/DELETE /animes/{id}
        // Replaces the name of, or removes, an existing anime. 404 when absent.
        .route(
            "/animes/{id}",
            put(handlers::update_anime).delete(handlers::delete_anime),
        )
}
