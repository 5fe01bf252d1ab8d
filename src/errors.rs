//! Error handling for the CRUD surface.
//!
//! Failures map onto a small taxonomy: invalid input (400), not found (404),
//! unsupported operation (400), and store failures (500). Internal details
//! such as raw database errors are logged via `tracing` but never sent to
//! clients; the response body is always the uniform
//! `{code, message, data}` envelope.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sea_orm::DbErr;
use std::fmt;

use crate::models::ApiResponse;

/// API error with automatic logging and a sanitized envelope response.
#[derive(Debug)]
pub enum ApiError {
    /// 400 Bad Request - bad id, malformed body, invalid query spec
    InvalidInput { message: String },

    /// 404 Not Found - no row, including past the soft-delete boundary
    NotFound {
        resource: String,
        id: Option<String>,
    },

    /// 400 Bad Request - unknown batch verb
    UnsupportedOperation { operation: String },

    /// 500 Internal Server Error - store or transaction failure
    /// (details logged, not exposed)
    Store { message: String, internal: DbErr },

    /// 500 Internal Server Error - anything else
    Internal {
        message: String,
        internal: Option<String>,
    },
}

impl ApiError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    pub fn not_found(resource: impl Into<String>, id: Option<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
            id,
        }
    }

    pub fn unsupported_operation(operation: impl Into<String>) -> Self {
        Self::UnsupportedOperation {
            operation: operation.into(),
        }
    }

    /// Wrap a database error. The `DbErr` is logged but the client only
    /// sees a generic message.
    pub fn store(err: DbErr) -> Self {
        Self::Store {
            message: "store operation failed".to_string(),
            internal: err,
        }
    }

    pub fn internal(message: impl Into<String>, internal: Option<String>) -> Self {
        Self::Internal {
            message: message.into(),
            internal,
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidInput { .. } | Self::UnsupportedOperation { .. } => {
                StatusCode::BAD_REQUEST
            }
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Store { .. } | Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn user_message(&self) -> String {
        match self {
            Self::InvalidInput { message } => message.clone(),
            Self::NotFound { resource, id } => match id {
                Some(id) => format!("{resource} with id '{id}' not found"),
                None => format!("{resource} not found"),
            },
            Self::UnsupportedOperation { operation } => {
                format!("unsupported operation '{operation}'")
            }
            Self::Store { message, .. } | Self::Internal { message, .. } => message.clone(),
        }
    }

    /// Log internal details. Never sent to the client.
    fn log_internal(&self) {
        match self {
            Self::Store { internal, .. } => {
                tracing::error!(error = ?internal, "store error");
            }
            Self::Internal {
                internal: Some(details),
                ..
            } => {
                tracing::error!(details = %details, "internal error");
            }
            _ => {
                tracing::debug!(
                    error = %self.user_message(),
                    status = %self.status_code(),
                    "request failed"
                );
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.log_internal();

        let status = self.status_code();
        let body = ApiResponse::<Option<()>> {
            code: status.as_u16(),
            message: self.user_message(),
            data: None,
            page: None,
        };
        (status, Json(body)).into_response()
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.user_message())
    }
}

impl std::error::Error for ApiError {}

/// `DbErr::RecordNotFound` maps to 404; every other variant is a store
/// failure surfaced as 500.
impl From<DbErr> for ApiError {
    fn from(err: DbErr) -> Self {
        match &err {
            DbErr::RecordNotFound(msg) => {
                let resource = msg.split_whitespace().next().unwrap_or("record");
                Self::NotFound {
                    resource: resource.to_string(),
                    id: None,
                }
            }
            _ => Self::store(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_with_id() {
        let err = ApiError::not_found("user", Some("42".to_string()));
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.user_message(), "user with id '42' not found");
    }

    #[test]
    fn not_found_without_id() {
        let err = ApiError::not_found("user", None);
        assert_eq!(err.user_message(), "user not found");
    }

    #[test]
    fn invalid_input_is_400() {
        let err = ApiError::invalid_input("invalid id");
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.user_message(), "invalid id");
    }

    #[test]
    fn unsupported_operation_is_400() {
        let err = ApiError::unsupported_operation("soft");
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.user_message(), "unsupported operation 'soft'");
    }

    #[test]
    fn store_error_is_sanitized() {
        let err = ApiError::store(DbErr::Custom("secret connection string".to_string()));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.user_message(), "store operation failed");
    }

    #[test]
    fn dberr_record_not_found_becomes_404() {
        let err: ApiError = DbErr::RecordNotFound("user not found".to_string()).into();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn other_dberr_become_500() {
        for db_err in [
            DbErr::Custom("boom".to_string()),
            DbErr::Type("type".to_string()),
            DbErr::Json("json".to_string()),
        ] {
            let err: ApiError = db_err.into();
            assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
            assert_eq!(err.user_message(), "store operation failed");
        }
    }
}
