use models::errors::ModelError;
use thiserror::Error;

use crate::user::repository::RepoError;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("store error: {0}")]
    Store(String),
}

impl ServiceError {
    /// Stable numeric code for external mapping/logging
    pub fn code(&self) -> u16 {
        match self {
            ServiceError::Validation(_) => 1001,
            ServiceError::Conflict(_) => 1002,
            ServiceError::NotFound(_) => 1003,
            ServiceError::Store(_) => 1200,
        }
    }
}

impl From<ModelError> for ServiceError {
    fn from(value: ModelError) -> Self {
        match value {
            ModelError::Validation(msg) => Self::Validation(msg),
        }
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(email) => Self::NotFound(format!("user {email} not found")),
            RepoError::AlreadyExists(email) => Self::Conflict(format!("user {email} already exists")),
            RepoError::StoreFailure(msg) => Self::Store(msg),
        }
    }
}
