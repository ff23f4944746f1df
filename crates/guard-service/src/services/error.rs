//! Service layer error types
//!
//! Provides a unified error type for all service operations.

use guard_common::AppError;
use guard_core::DomainError;
use std::fmt;

/// Service layer error type
#[derive(Debug)]
pub enum ServiceError {
    /// Domain rule violation or collaborator failure
    Domain(DomainError),

    /// Application error (validation, configuration, etc.)
    App(AppError),

    /// An external call exceeded its time bound
    Timeout(String),

    /// Sender may not run this command
    PermissionDenied { command: String },

    /// Validation error
    Validation(String),

    /// Internal error
    Internal(String),
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Domain(e) => write!(f, "{e}"),
            Self::App(e) => write!(f, "{e}"),
            Self::Timeout(what) => write!(f, "{what} timed out"),
            Self::PermissionDenied { command } => {
                write!(f, "Not allowed to run command: {command}")
            }
            Self::Validation(msg) => write!(f, "Validation error: {msg}"),
            Self::Internal(msg) => write!(f, "Internal error: {msg}"),
        }
    }
}

impl std::error::Error for ServiceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Domain(e) => Some(e),
            Self::App(e) => Some(e),
            _ => None,
        }
    }
}

impl ServiceError {
    /// Create a permission denied error
    pub fn permission_denied(command: impl Into<String>) -> Self {
        Self::PermissionDenied {
            command: command.into(),
        }
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Domain(e) => {
                if e.is_not_found() {
                    404
                } else if e.is_validation() {
                    400
                } else if e.is_collaborator() {
                    502
                } else {
                    500
                }
            }
            Self::App(e) => e.status_code(),
            Self::Timeout(_) => 504,
            Self::PermissionDenied { .. } => 403,
            Self::Validation(_) => 400,
            Self::Internal(_) => 500,
        }
    }

    /// Get the error code for API responses
    pub fn error_code(&self) -> &str {
        match self {
            Self::Domain(e) => e.code(),
            Self::App(e) => e.error_code(),
            Self::Timeout(_) => "TIMEOUT",
            Self::PermissionDenied { .. } => "PERMISSION_DENIED",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<DomainError> for ServiceError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Timeout(what) => Self::Timeout(what),
            other => Self::Domain(other),
        }
    }
}

impl From<AppError> for ServiceError {
    fn from(err: AppError) -> Self {
        Self::App(err)
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Domain(e) => AppError::Domain(e),
            ServiceError::App(e) => e,
            ServiceError::Timeout(what) => AppError::Domain(DomainError::Timeout(what)),
            ServiceError::PermissionDenied { command } => AppError::SenderNotAllowed(command),
            ServiceError::Validation(msg) => AppError::Validation(msg),
            ServiceError::Internal(msg) => AppError::Internal(anyhow::anyhow!(msg)),
        }
    }
}

/// Result type for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_denied_error() {
        let err = ServiceError::permission_denied("block");
        assert_eq!(err.status_code(), 403);
        assert_eq!(err.error_code(), "PERMISSION_DENIED");
        assert!(err.to_string().contains("block"));
    }

    #[test]
    fn test_domain_timeout_becomes_timeout() {
        let err = ServiceError::from(DomainError::Timeout("roster fetch".into()));
        assert!(matches!(err, ServiceError::Timeout(_)));
        assert_eq!(err.status_code(), 504);
        assert_eq!(err.to_string(), "roster fetch timed out");
    }

    #[test]
    fn test_collaborator_failure_is_bad_gateway() {
        let err = ServiceError::from(DomainError::gateway("send_group_msg", "down"));
        assert_eq!(err.status_code(), 502);
        assert_eq!(err.error_code(), "GATEWAY_ERROR");
    }

    #[test]
    fn test_validation_error() {
        let err = ServiceError::validation("user id must be numeric");
        assert_eq!(err.status_code(), 400);
        assert_eq!(err.error_code(), "VALIDATION_ERROR");
    }

    #[test]
    fn test_convert_to_app_error() {
        let app_err: AppError = ServiceError::permission_denied("block").into();
        assert_eq!(app_err.status_code(), 403);
        assert_eq!(app_err.error_code(), "SENDER_NOT_ALLOWED");
    }
}
