use axum::{
    Router,
    extract::FromRef,
    http::HeaderName,
    middleware,
};
use utoipa::OpenApi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Core application services and components.
pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod service;

// Module for routing segregation (Viewer, Authenticated, Admin).
pub mod routes;
use routes::{admin, authenticated, viewer};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use repository::{InMemoryRepository, PostgresRepository, RepositoryState};
pub use service::AnimeService;

/// ApiDoc
///
/// Auto-generated OpenAPI document for the catalog, served at
/// `/api-docs/openapi.json` behind authentication.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::list_animes, handlers::get_anime, handlers::create_anime,
        handlers::batch_create_animes, handlers::update_anime, handlers::delete_anime
    ),
    components(schemas(models::Anime, error::ErrorBody)),
    tags(
        (name = "anime-catalog", description = "Anime catalog API")
    )
)]
pub struct ApiDoc;

/// AppState
///
/// The single, cloneable container of everything handlers and extractors need.
/// The service is built on the same repository the auth extractor reads users from.
#[derive(Clone)]
pub struct AppState {
    /// Repository Layer: anime rows and credentials.
    pub repo: RepositoryState,
    /// Service Layer: catalog rules on top of `repo`.
    pub animes: AnimeService,
}

impl AppState {
    pub fn new(repo: RepositoryState) -> Self {
        Self {
            animes: AnimeService::new(repo.clone()),
            repo,
        }
    }
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for AnimeService {
    fn from_ref(app_state: &AppState) -> AnimeService {
        app_state.animes.clone()
    }
}

/// create_router
///
/// Assembles the routing structure, applies the role guards per access tier,
/// the global error formatter, and the observability layers.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS Configuration
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    // Header name constant for Request Correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    // 2. Base Router Assembly
    let base_router = Router::new()
        // Viewer Routes: every catalog read, USER or ADMIN.
        .merge(
            viewer::viewer_routes()
                .route_layer(middleware::from_fn_with_state(state.clone(), auth::viewer_guard)),
        )
        // Authenticated Routes: any identity. Only the API docs live here.
        .merge(
            authenticated::authenticated_routes()
                .route_layer(middleware::from_fn_with_state(state.clone(), auth::auth_middleware)),
        )
        // Admin Routes: ADMIN only. Shares paths with the viewer tier; axum
        // merges the method routers, each method keeping its own guard.
        .merge(
            admin::admin_routes()
                .route_layer(middleware::from_fn_with_state(state.clone(), auth::admin_guard)),
        )
        // Anything else still demands credentials before answering 404.
        .fallback(handlers::fallback)
        .with_state(state);

    // 3. Error formatting sits inside the observability stack so it can read the request id.
    base_router
        .layer(middleware::from_fn(error::format_errors))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        // 4. CORS Layer
        .layer(cors)
}

/// trace_span_logger
///
/// Span factory for `TraceLayer`: method, URI and the generated `x-request-id`.
/// `user` is filled in by the `AuthUser` extractor once credentials check out.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
        user = tracing::field::Empty,
    )
}
