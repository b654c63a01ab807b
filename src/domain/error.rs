//! Service Error Types
//!
//! Error kinds shared by every entity service. Storage errors are classified
//! here: not-found and conflict kinds keep their identity, everything else
//! collapses into `StorageFault`.

use thiserror::Error;

use super::credentials::CredentialError;
use super::transaction::InvalidDate;
use crate::store::StoreError;

/// Errors returned by the entity services.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The identified row does not exist (or is not owned by the caller)
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Another user already uses this email
    #[error("Email already registered: {0}")]
    DuplicateEmail(String),

    /// The store reported a uniqueness violation
    #[error("Duplicate {0}")]
    DuplicateEntry(&'static str),

    /// Unknown email or wrong password; deliberately indistinguishable
    #[error("Invalid email or password")]
    Unauthorized,

    /// The hashing primitive failed
    #[error("Password hashing failed")]
    HashingError(String),

    /// The verification primitive failed (not a mismatch)
    #[error("Credential validation failed")]
    CredentialValidationError(String),

    /// A referenced row (category, bank account) does not exist
    #[error("Invalid reference: {0}")]
    InvalidReference(&'static str),

    /// Delete rejected because dependents exist and the policy is `restrict`
    #[error("{entity} {id} still has dependent records")]
    HasDependents { entity: &'static str, id: String },

    #[error(transparent)]
    InvalidDate(#[from] InvalidDate),

    /// Any other persistence failure
    #[error("Storage fault")]
    StorageFault(#[source] StoreError),
}

impl ServiceError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn has_dependents(entity: &'static str, id: impl ToString) -> Self {
        Self::HasDependents {
            entity,
            id: id.to_string(),
        }
    }

    /// Check if this is a client error (caller's fault)
    pub fn is_client_error(&self) -> bool {
        !matches!(
            self,
            Self::HashingError(_) | Self::CredentialValidationError(_) | Self::StorageFault(_)
        )
    }

    /// Check if this is a conflict with existing state
    pub fn is_conflict_error(&self) -> bool {
        matches!(
            self,
            Self::DuplicateEmail(_) | Self::DuplicateEntry(_) | Self::HasDependents { .. }
        )
    }
}

impl From<CredentialError> for ServiceError {
    fn from(error: CredentialError) -> Self {
        match error {
            CredentialError::Hashing(msg) => Self::HashingError(msg),
            CredentialError::Validation(msg) => Self::CredentialValidationError(msg),
        }
    }
}

/// Default classification of a store error outside any entity-specific
/// context. Services map the conflict kinds themselves before falling back
/// to this.
impl From<StoreError> for ServiceError {
    fn from(error: StoreError) -> Self {
        Self::StorageFault(error)
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
