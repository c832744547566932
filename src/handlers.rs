use crate::{
    auth::AuthUser,
    error::{AppError, AppResult, ErrorBody},
    models::Anime,
    service::AnimeService,
};
use axum::{
    Json,
    extract::{FromRequest, Path, Request, State, rejection::JsonRejection},
    http::{StatusCode, Uri},
};
use serde::de::DeserializeOwned;
use validator::Validate;

// --- Extractors ---

/// ValidatedJson
///
/// JSON body extractor that runs `validator::Validate` on the decoded value.
/// Decoding failures and validation failures both reject with
/// `AppError::Validation` (400).
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        value
            .validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;
        Ok(ValidatedJson(value))
    }
}

/// Path id extractor that reports non-integer ids in the JSON error shape.
pub struct AnimeId(pub i32);

impl<S> axum::extract::FromRequestParts<S> for AnimeId
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        state: &S,
    ) -> Result<Self, Self::Rejection> {
        let Path(id) = Path::<i32>::from_request_parts(parts, state).await?;
        Ok(AnimeId(id))
    }
}

// --- Handlers ---

/// list_animes
///
/// [Viewer Route] Lists every anime in storage order.
#[utoipa::path(
    get,
    path = "/animes",
    responses(
        (status = 200, description = "All animes", body = [Anime]),
        (status = 401, description = "Missing or bad credentials", body = ErrorBody),
        (status = 403, description = "Caller lacks USER/ADMIN", body = ErrorBody)
    )
)]
pub async fn list_animes(State(service): State<AnimeService>) -> AppResult<Json<Vec<Anime>>> {
    Ok(Json(service.find_all().await?))
}

/// get_anime
///
/// [Viewer Route] Fetches one anime; 404 "Anime not found" when absent.
#[utoipa::path(
    get,
    path = "/animes/{id}",
    params(("id" = i32, Path, description = "Anime ID")),
    responses(
        (status = 200, description = "Found", body = Anime),
        (status = 401, description = "Missing or bad credentials", body = ErrorBody),
        (status = 403, description = "Caller lacks USER/ADMIN", body = ErrorBody),
        (status = 404, description = "Anime not found", body = ErrorBody)
    )
)]
pub async fn get_anime(
    State(service): State<AnimeService>,
    AnimeId(id): AnimeId,
) -> AppResult<Json<Anime>> {
    Ok(Json(service.find_by_id(id).await?))
}

/// create_anime
///
/// [Admin Route] Stores a new anime. A client-supplied id is ignored.
#[utoipa::path(
    post,
    path = "/animes",
    request_body = Anime,
    responses(
        (status = 201, description = "Created", body = Anime),
        (status = 400, description = "Invalid name", body = ErrorBody),
        (status = 403, description = "Caller lacks ADMIN", body = ErrorBody)
    )
)]
pub async fn create_anime(
    State(service): State<AnimeService>,
    ValidatedJson(anime): ValidatedJson<Anime>,
) -> AppResult<(StatusCode, Json<Anime>)> {
    let saved = service.save(anime).await?;
    Ok((StatusCode::CREATED, Json(saved)))
}

/// batch_create_animes
///
/// [Admin Route] Stores several animes in order.
///
/// *Note*: names are checked only after each insert, so a request containing an
/// empty name answers 400 "Invalid name" while the rows written before it (and
/// the offending row itself) remain stored.
#[utoipa::path(
    post,
    path = "/animes/batch",
    request_body = [Anime],
    responses(
        (status = 201, description = "Created", body = [Anime]),
        (status = 400, description = "Invalid name", body = ErrorBody)
    )
)]
pub async fn batch_create_animes(
    State(service): State<AnimeService>,
    payload: Result<Json<Vec<Anime>>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Vec<Anime>>)> {
    let Json(animes) = payload?;
    let saved = service.batch_save(animes).await?;
    Ok((StatusCode::CREATED, Json(saved)))
}

/// update_anime
///
/// [Admin Route] Replaces the name of an existing anime. The path id wins over
/// any id in the body.
#[utoipa::path(
    put,
    path = "/animes/{id}",
    params(("id" = i32, Path, description = "Anime ID")),
    request_body = Anime,
    responses(
        (status = 204, description = "Updated"),
        (status = 400, description = "Invalid name", body = ErrorBody),
        (status = 404, description = "Anime not found", body = ErrorBody)
    )
)]
pub async fn update_anime(
    State(service): State<AnimeService>,
    AnimeId(id): AnimeId,
    ValidatedJson(anime): ValidatedJson<Anime>,
) -> AppResult<StatusCode> {
    service.update(anime.with_id(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// delete_anime
///
/// [Admin Route] Removes an anime after checking that it exists.
#[utoipa::path(
    delete,
    path = "/animes/{id}",
    params(("id" = i32, Path, description = "Anime ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Anime not found", body = ErrorBody)
    )
)]
pub async fn delete_anime(
    State(service): State<AnimeService>,
    AnimeId(id): AnimeId,
) -> AppResult<StatusCode> {
    service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// fallback
///
/// Unknown paths still require an authenticated caller (401 first), then 404.
pub async fn fallback(_auth_user: AuthUser, uri: Uri) -> AppError {
    AppError::NotFound(format!("No route for {}", uri.path()))
}
