//! API error handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use core_kernel::{CoreError, PortError};
use domain_ledger::LedgerError;

/// API error types
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Dependency failure: {0}")]
    Dependency(String),

    #[error("Store failure: {0}")]
    Store(String),

    #[error("Validation error: {message}")]
    Validation {
        message: String,
        details: Option<Vec<String>>,
    },
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation {
            message: message.into(),
            details: None,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) | ApiError::Validation { .. } => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) | ApiError::Dependency(_) | ApiError::Store(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<String>>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (error_type, message, details) = match self {
            ApiError::NotFound(msg) => ("not_found", msg, None),
            ApiError::BadRequest(msg) => ("bad_request", msg, None),
            ApiError::Conflict(msg) => ("conflict", msg, None),
            ApiError::Internal(msg) => ("internal_error", msg, None),
            ApiError::Dependency(msg) => ("dependency_error", msg, None),
            ApiError::Store(msg) => ("store_error", msg, None),
            ApiError::Validation { message, details } => ("validation_error", message, details),
        };

        if status.is_server_error() {
            error!(error = %error_type, %message, "Request failed");
        }

        let body = ErrorResponse {
            error: error_type.to_string(),
            message,
            details,
        };

        (status, Json(body)).into_response()
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        let message = err.to_string();
        match err {
            LedgerError::Validation { message, .. } => ApiError::validation(message),
            LedgerError::NotFound { .. } => ApiError::NotFound(message),
            LedgerError::Duplicate { .. } => ApiError::Conflict(message),
            LedgerError::Dependency { compensated, .. } => {
                ApiError::Dependency(with_compensation(message, compensated))
            }
            LedgerError::Store { compensated, .. } => {
                ApiError::Store(with_compensation(message, compensated))
            }
        }
    }
}

fn with_compensation(message: String, compensated: bool) -> String {
    if compensated {
        format!("{} (rolled back)", message)
    } else {
        format!("{} (not rolled back, manual reconciliation required)", message)
    }
}

impl From<PortError> for ApiError {
    fn from(err: PortError) -> Self {
        match err {
            PortError::NotFound { entity_type, id } => {
                ApiError::NotFound(format!("{} not found: {}", entity_type, id))
            }
            PortError::Validation { message, .. } => ApiError::validation(message),
            PortError::Conflict { message } => ApiError::Conflict(message),
            other => ApiError::Store(other.to_string()),
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::NotFound(msg) => ApiError::NotFound(msg),
            CoreError::Configuration(msg) => ApiError::Internal(msg),
            other => ApiError::validation(other.to_string()),
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut details: Vec<String> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| match &e.message {
                    Some(message) => message.to_string(),
                    None => format!("{}: {}", field, e.code),
                })
            })
            .collect();
        details.sort();

        let message = match details.first() {
            Some(first) if details.len() == 1 => first.clone(),
            _ => "Required fields missing".to_string(),
        };

        ApiError::Validation {
            message,
            details: Some(details),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::{VoucherKey, VoucherType};

    #[test]
    fn test_ledger_errors_map_to_status() {
        let key = VoucherKey::new(VoucherType::Rv, 1);
        assert_eq!(
            ApiError::from(LedgerError::voucher_not_found(&key)).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(LedgerError::Duplicate { key }).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(LedgerError::validation("bad")).status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_port_conflict_is_conflict() {
        let err = ApiError::from(PortError::conflict("Unit Alpha already exists"));
        assert_eq!(err.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_transient_port_errors_are_store_failures() {
        let err = ApiError::from(PortError::Timeout {
            operation: "save_unit".to_string(),
            duration_ms: 5000,
        });
        assert!(matches!(err, ApiError::Store(_)));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
