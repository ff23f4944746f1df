//! Domain errors - error types for the domain layer

use thiserror::Error;

/// Domain layer errors
#[derive(Debug, Error)]
pub enum DomainError {
    // =========================================================================
    // Not Found Errors
    // =========================================================================
    #[error("Group is not managed: {0}")]
    GroupNotManaged(String),

    #[error("Member not found in group")]
    MemberNotFound,

    // =========================================================================
    // Validation Errors
    // =========================================================================
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Unknown quit type: {0}")]
    UnknownQuitType(String),

    // =========================================================================
    // Collaborator Errors
    // =========================================================================
    #[error("Gateway call {action} failed: {message}")]
    GatewayError { action: &'static str, message: String },

    #[error("Language model call failed: {0}")]
    LlmError(String),

    #[error("Language model returned malformed output: {0}")]
    MalformedLlmOutput(String),

    #[error("{0} timed out")]
    Timeout(String),

    // =========================================================================
    // Infrastructure Errors (wrapped)
    // =========================================================================
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl DomainError {
    /// Get an error code string for logs and API responses
    pub fn code(&self) -> &'static str {
        match self {
            Self::GroupNotManaged(_) => "UNKNOWN_GROUP",
            Self::MemberNotFound => "UNKNOWN_MEMBER",
            Self::ValidationError(_) => "VALIDATION_ERROR",
            Self::UnknownQuitType(_) => "UNKNOWN_QUIT_TYPE",
            Self::GatewayError { .. } => "GATEWAY_ERROR",
            Self::LlmError(_) => "LLM_ERROR",
            Self::MalformedLlmOutput(_) => "LLM_MALFORMED_OUTPUT",
            Self::Timeout(_) => "TIMEOUT",
            Self::DatabaseError(_) => "DATABASE_ERROR",
            Self::InternalError(_) => "INTERNAL_ERROR",
        }
    }

    /// Create a gateway error for a named call
    pub fn gateway(action: &'static str, message: impl Into<String>) -> Self {
        Self::GatewayError {
            action,
            message: message.into(),
        }
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::GroupNotManaged(_) | Self::MemberNotFound)
    }

    /// Check if this is a validation error
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::ValidationError(_) | Self::UnknownQuitType(_))
    }

    /// Check if an outbound collaborator (gateway or language model) failed
    pub fn is_collaborator(&self) -> bool {
        matches!(
            self,
            Self::GatewayError { .. }
                | Self::LlmError(_)
                | Self::MalformedLlmOutput(_)
                | Self::Timeout(_)
        )
    }

    /// Check if this is an infrastructure error
    pub fn is_infrastructure(&self) -> bool {
        matches!(self, Self::DatabaseError(_) | Self::InternalError(_))
    }
}
