use axum::{http::StatusCode, response::IntoResponse, response::Response};
use thiserror::Error;

use crate::store::StoreError;

/// Error surface of the whole API. Every failure collapses to exactly one
/// of these; messages are static and leak nothing.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ApiError {
    /// Missing/malformed body or field, failed credentials, or a referenced
    /// question/answer that does not resolve.
    #[error("expectations failed")]
    BadRequest,
    /// Missing, unknown, malformed, or expired access token.
    #[error("access forbidden")]
    Unauthorized,
    /// Duplicate email or duplicate rating.
    #[error("entity has already been found")]
    Conflict,
    #[error("internal error")]
    Internal,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest => StatusCode::EXPECTATION_FAILED,
            ApiError::Unauthorized => StatusCode::FORBIDDEN,
            ApiError::Conflict => StatusCode::CONFLICT,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), self.to_string()).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate => ApiError::Conflict,
            StoreError::Backend(e) => {
                tracing::error!(error = %e, "store failure");
                ApiError::Internal
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_match_the_wire_contract() {
        assert_eq!(ApiError::BadRequest.status(), StatusCode::EXPECTATION_FAILED);
        assert_eq!(ApiError::Unauthorized.status(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::Conflict.status(), StatusCode::CONFLICT);
        assert_eq!(ApiError::Internal.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn messages_are_short_and_static() {
        assert_eq!(ApiError::BadRequest.to_string(), "expectations failed");
        assert_eq!(ApiError::Unauthorized.to_string(), "access forbidden");
        assert_eq!(ApiError::Conflict.to_string(), "entity has already been found");
        assert_eq!(ApiError::Internal.to_string(), "internal error");
    }

    #[test]
    fn duplicate_store_errors_become_conflict() {
        let err: ApiError = StoreError::Duplicate.into();
        assert_eq!(err, ApiError::Conflict);
        let err: ApiError = StoreError::Backend(anyhow::anyhow!("boom")).into();
        assert_eq!(err, ApiError::Internal);
    }
}
