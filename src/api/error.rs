use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::domain::DomainError;
use crate::import::ImportError;

/// Failure of an RPC call, rendered as `{"error": {"code", "message"}}`.
#[derive(Debug, Error)]
pub enum RpcError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("Admin access required")]
    Forbidden,
    #[error("{0} not found")]
    NotFound(String),
    #[error("No procedure named '{0}'")]
    UnknownProcedure(String),
    #[error("'{0}' is a mutation and must be called with POST")]
    MethodNotAllowed(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl RpcError {
    pub fn status(&self) -> StatusCode {
        match self {
            RpcError::Validation(_) => StatusCode::BAD_REQUEST,
            RpcError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            RpcError::Forbidden => StatusCode::FORBIDDEN,
            RpcError::NotFound(_) | RpcError::UnknownProcedure(_) => StatusCode::NOT_FOUND,
            RpcError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            RpcError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            RpcError::Validation(_) => "BAD_REQUEST",
            RpcError::Unauthorized(_) => "UNAUTHORIZED",
            RpcError::Forbidden => "FORBIDDEN",
            RpcError::NotFound(_) | RpcError::UnknownProcedure(_) => "NOT_FOUND",
            RpcError::MethodNotAllowed(_) => "METHOD_NOT_SUPPORTED",
            RpcError::Internal(_) => "INTERNAL_SERVER_ERROR",
        }
    }
}

impl IntoResponse for RpcError {
    fn into_response(self) -> Response {
        let message = match &self {
            RpcError::Internal(detail) => {
                tracing::error!("RPC call failed: {}", detail);
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        (
            self.status(),
            Json(json!({
                "error": { "code": self.code(), "message": message }
            })),
        )
            .into_response()
    }
}

impl From<DomainError> for RpcError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(msg) => RpcError::Validation(msg),
            DomainError::NotFound => RpcError::NotFound("Resource".to_string()),
            DomainError::Database(e) => RpcError::Internal(e.to_string()),
        }
    }
}

impl From<ImportError> for RpcError {
    fn from(err: ImportError) -> Self {
        match err {
            ImportError::Storage(e) => RpcError::Internal(format!("import rolled back: {}", e)),
            ImportError::Source(msg) => RpcError::Validation(msg),
        }
    }
}
