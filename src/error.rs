//! Error types for Palaver.
//!
//! Uses thiserror for ergonomic error definitions that integrate
//! with axum's response system.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    // Input errors
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Payload too large: limit {max}")]
    PayloadTooLarge { max: usize },

    // Store errors
    #[error("Store connection error: {0}")]
    Connection(String),

    #[error("Statement failed: {0}")]
    Statement(sqlx::Error),

    // Generic errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400
            Self::Validation(_) => StatusCode::BAD_REQUEST,

            // 404
            Self::NotFound(_) => StatusCode::NOT_FOUND,

            // 413
            Self::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,

            // 500
            Self::Connection(_) | Self::Statement(_) | Self::Internal(_) | Self::Other(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::NotFound(_) => "NOT_FOUND",
            Self::PayloadTooLarge { .. } => "PAYLOAD_TOO_LARGE",
            Self::Connection(_) => "CONNECTION_ERROR",
            Self::Statement(_) => "STATEMENT_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
            Self::Other(_) => "UNKNOWN_ERROR",
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.error_code();
        let message = self.to_string();

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(code, "{}", message);
        }

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        match err {
            // Pool exhaustion and transport failures: the store was never
            // reached or the connection died underneath us.
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
                Self::Connection(err.to_string())
            }
            sqlx::Error::Io(_) | sqlx::Error::Tls(_) => Self::Connection(err.to_string()),
            // The store received and rejected the statement.
            _ => Self::Statement(err),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(err.to_string())
    }
}
