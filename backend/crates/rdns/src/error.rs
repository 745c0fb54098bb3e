//! Registration Error Types
//!
//! This module provides the error variants of the registration core and
//! integrates them with the unified `kernel::error::AppError` system.

use crate::domain::repository::StoreError;
use kernel::error::{app_error::AppError, kind::ErrorKind};
use thiserror::Error;

/// Registration result type alias
pub type RdnsResult<T> = Result<T, RdnsError>;

/// Registration error variants
#[derive(Debug, Error)]
pub enum RdnsError {
    /// The domain name cannot be mapped to a storage path
    #[error("Invalid domain name: {0:?}")]
    InvalidDomain(String),

    /// The host cannot be stored as a collision-free key
    #[error("Invalid host: {0:?}")]
    InvalidHost(String),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Domain, registration or token does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// No free slug was found within the attempt bound
    #[error("No free subdomain after {attempts} attempts")]
    SlugExhausted { attempts: u32 },

    /// The write collides with the current shape of the store
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A write expected prior existence that was not met
    #[error("Precondition failed: {0}")]
    PreconditionFailed(String),

    /// The presented token does not match the token origin
    #[error("Token does not match the owner of {0}")]
    TokenMismatch(String),

    /// The store is unreachable
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// A stored value failed to parse into its expected form
    #[error("Malformed value at {key}: {reason}")]
    DataIntegrity { key: String, reason: String },

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl RdnsError {
    /// Get the ErrorKind for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            RdnsError::InvalidDomain(_) | RdnsError::InvalidHost(_) => ErrorKind::BadRequest,
            RdnsError::NotFound(_) => ErrorKind::NotFound,
            RdnsError::Conflict(_) => ErrorKind::Conflict,
            RdnsError::PreconditionFailed(_) => ErrorKind::PreconditionFailed,
            RdnsError::TokenMismatch(_) => ErrorKind::Forbidden,
            RdnsError::SlugExhausted { .. } | RdnsError::StoreUnavailable(_) => {
                ErrorKind::ServiceUnavailable
            }
            RdnsError::InvalidConfig(_)
            | RdnsError::DataIntegrity { .. }
            | RdnsError::Internal(_) => ErrorKind::InternalServerError,
        }
    }

    /// Log the error with appropriate level
    pub fn log(&self) {
        match self {
            RdnsError::StoreUnavailable(msg) => {
                tracing::error!(message = %msg, "Key-value store unavailable");
            }
            RdnsError::DataIntegrity { key, reason } => {
                tracing::error!(key = %key, reason = %reason, "Stored value is malformed");
            }
            RdnsError::InvalidConfig(msg) | RdnsError::Internal(msg) => {
                tracing::error!(message = %msg, "Registration internal error");
            }
            RdnsError::SlugExhausted { attempts } => {
                tracing::warn!(attempts = attempts, "Subdomain slugs exhausted");
            }
            RdnsError::TokenMismatch(fqdn) => {
                tracing::warn!(fqdn = %fqdn, "Token origin mismatch");
            }
            _ => {
                tracing::debug!(error = %self, "Registration error");
            }
        }
    }
}

impl From<StoreError> for RdnsError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::KeyNotFound(key) => RdnsError::NotFound(key),
            StoreError::PreconditionFailed(key) => RdnsError::PreconditionFailed(key),
            StoreError::NodeExists(key) => RdnsError::Conflict(format!("{key} already exists")),
            StoreError::NotAFile(key) => RdnsError::Conflict(format!("{key} is a directory")),
            StoreError::NotADir(key) => RdnsError::Conflict(format!("{key} is not a directory")),
            StoreError::Unavailable(msg) => RdnsError::StoreUnavailable(msg),
            StoreError::Protocol(msg) => RdnsError::Internal(msg),
        }
    }
}

impl From<RdnsError> for AppError {
    fn from(err: RdnsError) -> Self {
        let kind = err.kind();
        let message = err.to_string();
        let app_err = AppError::new(kind, message);
        match err {
            RdnsError::SlugExhausted { .. } => app_err.with_action("Retry later"),
            RdnsError::PreconditionFailed(_) => {
                app_err.with_action("Create the domain before renewing or updating it")
            }
            _ => app_err,
        }
    }
}
