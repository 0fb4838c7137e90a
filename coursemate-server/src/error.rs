use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use coursemate_rag::RagError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// An HTTP error rendered as `{"error": message}`.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self { status, message: message.into() }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }
}

impl From<RagError> for ApiError {
    fn from(e: RagError) -> Self {
        let status = match &e {
            RagError::NoContent | RagError::AlreadyIndexing(_) => StatusCode::CONFLICT,
            RagError::NotFound(_) => StatusCode::NOT_FOUND,
            RagError::Config(_) => StatusCode::BAD_REQUEST,
            RagError::EmbeddingProvider { .. }
            | RagError::Generation { .. }
            | RagError::Fetch(_) => StatusCode::BAD_GATEWAY,
            RagError::Extraction(_) | RagError::Store { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!(error = %e, "request failed");
        }
        Self::new(status, e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rag_errors_map_to_statuses() {
        assert_eq!(ApiError::from(RagError::NoContent).status, StatusCode::CONFLICT);
        assert_eq!(ApiError::from(RagError::NotFound("x".into())).status, StatusCode::NOT_FOUND);
        assert_eq!(ApiError::from(RagError::Config("x".into())).status, StatusCode::BAD_REQUEST);
        let upstream = RagError::Generation { provider: "p".into(), message: "m".into() };
        assert_eq!(ApiError::from(upstream).status, StatusCode::BAD_GATEWAY);
        let store = RagError::Store { backend: "b".into(), message: "m".into() };
        assert_eq!(ApiError::from(store).status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn no_content_keeps_waiting_message() {
        let err = ApiError::from(RagError::NoContent);
        assert_eq!(
            err.message,
            "No processed chunks available. Please wait for document processing to complete."
        );
    }
}
