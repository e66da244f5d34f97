//! Error types for the Prestapp core

use thiserror::Error;

use crate::repository::StoreError;

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Business rule violation: {0}")]
    BusinessRule(String),

    /// A secondary effect failed after the primary write succeeded.
    /// Service entry points collect these into `warnings`/`errors` lists
    /// instead of returning them, so the primary effect stands.
    #[error("Dependency failure: {0}")]
    Dependency(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
