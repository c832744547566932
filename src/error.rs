//! Failure taxonomy and the global JSON error formatter.
//!
//! Handlers, extractors and the role guards return [`AppError`]. Turning an
//! `AppError` into a response only stamps the status and attaches an
//! [`ErrorReport`]; [`format_errors`] is the single place where the wire body
//! `{timestamp, path, status, error, message, requestId[, trace]}` is built.
//! It also rewrites error responses produced by axum itself (e.g. 405).

use axum::{
    Json,
    body::to_bytes,
    extract::{
        Request,
        rejection::{JsonRejection, PathRejection},
    },
    http::{HeaderValue, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::error::Error as _;
use thiserror::Error;
use ts_rs::TS;
use utoipa::ToSchema;

/// Realm advertised in `WWW-Authenticate` on 401 responses.
pub const AUTH_REALM: &str = "anime-catalog";

// Framework error bodies are plain text and small; anything bigger is not worth echoing.
const MAX_FRAMEWORK_BODY: usize = 4 * 1024;

#[derive(Debug, Error)]
pub enum AppError {
    /// Input failed decoding or validation.
    #[error("{0}")]
    Validation(String),

    /// A business rule rejected the request.
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Access Denied")]
    Forbidden,

    #[error("database error")]
    Database(#[from] sqlx::Error),

    #[error("{0}")]
    Internal(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message exposed to clients. Server-side failures stay generic; the
    /// detail is only available through the trace.
    pub fn public_message(&self) -> String {
        if self.status_code().is_server_error() {
            "Internal Server Error".to_string()
        } else {
            self.to_string()
        }
    }

    /// Debug rendering of the error followed by its `source()` chain.
    pub fn trace(&self) -> String {
        let mut trace = format!("{self:?}");
        let mut source = self.source();
        while let Some(cause) = source {
            trace.push_str(&format!("\ncaused by: {cause}"));
            source = cause.source();
        }
        trace
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

/// ErrorReport
///
/// What an `AppError` leaves on its response for [`format_errors`] to render.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub message: String,
    pub trace: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self.trace(), "request failed");
        }

        let report = ErrorReport {
            message: self.public_message(),
            trace: self.trace(),
        };

        let mut response = status.into_response();
        if status == StatusCode::UNAUTHORIZED {
            if let Ok(challenge) =
                HeaderValue::from_str(&format!("Basic realm=\"{AUTH_REALM}\""))
            {
                response
                    .headers_mut()
                    .insert(header::WWW_AUTHENTICATE, challenge);
            }
        }
        response.extensions_mut().insert(report);
        response
    }
}

/// ErrorBody
///
/// The JSON error contract shared by every failing endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ErrorBody {
    pub timestamp: String,
    pub path: String,
    #[schema(example = 404)]
    pub status: u16,
    #[schema(example = "Not Found")]
    pub error: String,
    #[schema(example = "Anime not found")]
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<String>,
}

/// `?trace=true` (or a bare `?trace`) asks for the error trace.
fn wants_trace(query: Option<&str>) -> bool {
    query
        .unwrap_or_default()
        .split('&')
        .filter_map(|pair| {
            let mut kv = pair.splitn(2, '=');
            match (kv.next(), kv.next()) {
                (Some("trace"), Some(value)) => Some(value),
                (Some("trace"), None) => Some(""),
                _ => None,
            }
        })
        .any(|value| !value.eq_ignore_ascii_case("false"))
}

/// format_errors
///
/// Middleware that renders every 4xx/5xx response as an [`ErrorBody`].
/// Responses carrying an [`ErrorReport`] use its message and trace; other
/// error responses (router 405s, stray rejections) use their original text body.
pub async fn format_errors(request: Request, next: Next) -> Response {
    let path = request.uri().path().to_string();
    let include_trace = wants_trace(request.uri().query());
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    let response = next.run(request).await;
    let status = response.status();
    if !status.is_client_error() && !status.is_server_error() {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let report = match parts.extensions.remove::<ErrorReport>() {
        Some(report) => report,
        None => {
            let text = to_bytes(body, MAX_FRAMEWORK_BODY)
                .await
                .map(|bytes| String::from_utf8_lossy(&bytes).trim().to_string())
                .unwrap_or_default();
            ErrorReport {
                message: text.clone(),
                trace: text,
            }
        }
    };

    let error_body = ErrorBody {
        timestamp: Utc::now().to_rfc3339(),
        path,
        status: status.as_u16(),
        error: status.canonical_reason().unwrap_or("Unknown").to_string(),
        message: report.message,
        request_id,
        trace: include_trace.then_some(report.trace),
    };

    parts.headers.remove(header::CONTENT_LENGTH);
    parts.headers.remove(header::CONTENT_TYPE);
    let rendered = Json(error_body).into_response();
    let (json_parts, json_body) = rendered.into_parts();
    parts.headers.extend(json_parts.headers);

    Response::from_parts(parts, json_body)
}

/// Result type for service and handler operations.
pub type AppResult<T> = Result<T, AppError>;
