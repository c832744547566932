use crate::{ApiDoc, AppState};
use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Authenticated Router Module
///
/// Routes open to any identity that passes HTTP Basic authentication,
/// regardless of its roles: the Swagger UI and the OpenAPI document.
/// Wrapped in `auth::auth_middleware`.
pub fn authenticated_routes() -> Router<AppState> {
    Router::new()
        // GET /swagger-ui, GET /api-docs/openapi.json
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
