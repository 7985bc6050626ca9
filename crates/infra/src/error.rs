//! Error type shared by the registry and the ledger.

use thiserror::Error;

use herdbook_core::DomainError;

use crate::tabular::StoreError;

pub type HerdResult<T> = Result<T, HerdError>;

/// Failure of a registry or ledger operation.
///
/// Either the request itself was rejected (`Domain`: validation, missing id, layout
/// mismatch) or the store could not serve it (`Store`).
#[derive(Debug, Error)]
pub enum HerdError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl HerdError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, HerdError::Domain(e) if e.is_not_found())
    }

    pub fn is_connection(&self) -> bool {
        matches!(self, HerdError::Store(e) if e.is_connection())
    }
}
