use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// ServiceError
///
/// The failure taxonomy shared by the account service and the repository
/// layer. Each variant carries enough detail (field, record, policy) for the
/// transport layer to build an accurate client-facing response without
/// inspecting internal state.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// A required candidate field is missing or malformed. Local to the
    /// request; never retried.
    #[error("validation failed on '{field}': {message}")]
    Validation {
        field: &'static str,
        message: &'static str,
    },

    /// A referenced User or Role does not exist in its store.
    #[error("{0}")]
    NotFound(String),

    /// The caller lacks the authority required by the invoked operation.
    /// Checked before any store access; never suppressed.
    #[error("{0}")]
    Authorization(String),

    /// A uniqueness constraint was violated in the store, typically by a
    /// concurrent creation of the same username or role name.
    #[error("{0}")]
    Conflict(String),

    /// The persistence backend failed. Opaque to clients.
    #[error("storage failure: {0}")]
    Storage(String),
}

/// HTTP status mapping used by every handler:
/// Validation -> 400, NotFound -> 404, Authorization -> 403, Conflict -> 409,
/// Storage -> 500 (message replaced by a generic one, detail goes to the log).
impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ServiceError::Validation { .. } => (StatusCode::BAD_REQUEST, self.to_string()),
            ServiceError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            ServiceError::Authorization(_) => (StatusCode::FORBIDDEN, self.to_string()),
            ServiceError::Conflict(_) => (StatusCode::CONFLICT, self.to_string()),
            ServiceError::Storage(detail) => {
                tracing::error!(error = %detail, "request failed in the persistence backend");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal storage failure".to_string(),
                )
            }
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}
