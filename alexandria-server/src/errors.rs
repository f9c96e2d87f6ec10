//! Maps the closed `AlexandriaError` set to HTTP responses. Every error body
//! follows `{success:false, error:{code, message, details?}}`; `message` is
//! always `AlexandriaError::public_message()`, never the raw `Display`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use alexandria_contracts::error::AlexandriaError;

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: &'static str,
    message: String,
}

pub struct ApiError(pub AlexandriaError);

impl From<AlexandriaError> for ApiError {
    fn from(err: AlexandriaError) -> Self {
        ApiError(err)
    }
}

impl From<alexandria_core::error::CoreError> for ApiError {
    fn from(err: alexandria_core::error::CoreError) -> Self {
        ApiError(AlexandriaError::from(err))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            AlexandriaError::Validation(_) => StatusCode::BAD_REQUEST,
            AlexandriaError::NotFound(_) => StatusCode::NOT_FOUND,
            AlexandriaError::RateLimitExceeded(_) => StatusCode::TOO_MANY_REQUESTS,
            AlexandriaError::Provider(_)
            | AlexandriaError::Isbndb(_)
            | AlexandriaError::GoogleBooks(_)
            | AlexandriaError::Openlibrary(_) => StatusCode::SERVICE_UNAVAILABLE,
            AlexandriaError::Database(_) | AlexandriaError::DatabaseTimeout(_) => StatusCode::SERVICE_UNAVAILABLE,
            AlexandriaError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = ErrorBody { success: false, error: ErrorDetail { code: self.0.code(), message: self.0.public_message() } };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_for(err: AlexandriaError) -> StatusCode {
        ApiError(err).into_response().status()
    }

    #[test]
    fn validation_maps_to_bad_request() {
        assert_eq!(status_for(AlexandriaError::Validation("bad isbn".to_string())), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn not_found_maps_to_404() {
        assert_eq!(status_for(AlexandriaError::NotFound("no such edition".to_string())), StatusCode::NOT_FOUND);
    }

    #[test]
    fn rate_limit_maps_to_429() {
        assert_eq!(status_for(AlexandriaError::RateLimitExceeded("daily quota spent".to_string())), StatusCode::TOO_MANY_REQUESTS);
    }

    #[test]
    fn provider_failures_map_to_503() {
        assert_eq!(status_for(AlexandriaError::Provider("timeout".to_string())), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(status_for(AlexandriaError::Isbndb("500".to_string())), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(status_for(AlexandriaError::Database("connection reset".to_string())), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn internal_maps_to_500() {
        assert_eq!(status_for(AlexandriaError::Internal("unreachable".to_string())), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
