//! HTTP error mapping for the request pipeline.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use warden_core::AuthError;

/// Failures surfaced by the two middleware stages.
///
/// 401 for missing/invalid/expired tokens, 403 for unknown role, policy
/// denial, or ownership violation, 500 for internal errors. Response
/// bodies are plain-text descriptions.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// No `Authorization: Bearer <token>` header on the request.
    #[error("missing bearer token")]
    MissingToken,

    /// Stage two ran without stage one attaching claims first.
    #[error("authentication context missing")]
    MissingContext,

    /// The request body could not be buffered for ownership inspection.
    #[error("failed to read request body")]
    BodyRead,

    /// A typed rejection from the core.
    #[error(transparent)]
    Auth(#[from] AuthError),
}

impl PipelineError {
    fn status(&self) -> StatusCode {
        match self {
            Self::MissingToken => StatusCode::UNAUTHORIZED,
            Self::MissingContext => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BodyRead => StatusCode::BAD_REQUEST,
            Self::Auth(e) => {
                StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }
}

impl IntoResponse for PipelineError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            // Internal detail stays out of the response body.
            Self::MissingContext | Self::Auth(AuthError::Internal(_)) => {
                tracing::error!(error = %self, "internal pipeline error");
                "internal error".to_string()
            }
            Self::Auth(AuthError::ConfigUnavailable(_)) => {
                tracing::error!(error = %self, "configuration unavailable");
                "configuration unavailable".to_string()
            }
            other => other.to_string(),
        };

        (status, message).into_response()
    }
}
