//! Error types shared by the calculators, the backend client and the
//! HTTP layer.

use axum::{http::StatusCode, response::IntoResponse, response::Response, Json};

/// Crate-wide result type.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Every failure is scoped to the single operation that raised it;
/// none of them leaves a partially applied balance or document behind.
#[derive(thiserror::Error, Debug)]
pub enum EngineError {
    /// Rejected input, raised before any network call is made.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The backend has no record with the requested id.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The backend answered a mutation with a non-2xx status.
    #[error("Backend rejected the request ({status}): {message}")]
    BackendRejection { status: u16, message: String },

    /// A price-list lookup could not be completed.
    #[error("Price lookup failed: {0}")]
    Lookup(String),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl EngineError {
    pub fn validation(msg: impl Into<String>) -> Self {
        EngineError::Validation(msg.into())
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        EngineError::NotFound(resource.into())
    }

    pub fn lookup(msg: impl Into<String>) -> Self {
        EngineError::Lookup(msg.into())
    }

    pub fn configuration(msg: impl Into<String>) -> Self {
        EngineError::Configuration(msg.into())
    }

    /// HTTP status used when the error is returned by the engine's own API.
    pub fn status_code(&self) -> StatusCode {
        match self {
            EngineError::Validation(_) | EngineError::Json(_) => StatusCode::BAD_REQUEST,
            EngineError::NotFound(_) => StatusCode::NOT_FOUND,
            EngineError::BackendRejection { .. }
            | EngineError::Lookup(_)
            | EngineError::Http(_) => StatusCode::BAD_GATEWAY,
            EngineError::Io(_) | EngineError::Configuration(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for EngineError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(serde_json::json!({
            "error": {
                "message": self.to_string(),
                "code": status.as_u16(),
            }
        }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_maps_to_bad_request() {
        let err = EngineError::validation("no employee selected");
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "Validation error: no employee selected");
    }

    #[test]
    fn test_backend_rejection_maps_to_bad_gateway() {
        let err = EngineError::BackendRejection {
            status: 500,
            message: "boom".into(),
        };
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
    }
}
