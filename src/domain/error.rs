use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failures reported by the fetch and mutation collaborators
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum ApiError {
    /// Transient: leave state untouched, the caller may re-invoke
    #[error("Network error: {0}")]
    Network(String),
    /// Session is no longer valid
    #[error("Not authorized: {0}")]
    Auth(String),
    #[error("Not found: {0}")]
    NotFound(String),
    /// The server rejected a mutation
    #[error("Rejected: {0}")]
    Validation(String),
}

impl ApiError {
    /// Whether re-issuing the same request can succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, ApiError::Network(_))
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, ApiError::Auth(_))
    }

    /// Message suitable for an inline error banner
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Network(_) => "Failed to reach the server. Please try again.".to_string(),
            ApiError::Auth(_) => "Please log in again to continue.".to_string(),
            ApiError::NotFound(_) => "This item no longer exists.".to_string(),
            ApiError::Validation(reason) => reason.clone(),
        }
    }
}
