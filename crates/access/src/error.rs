//! Engine error taxonomy.
//!
//! Ordinary negative outcomes ("permission denied", "module not enabled") are
//! normal return values, never errors. Only two things are exceptional here:
//! an authorization *violation* (acting on a foreign company) and a store
//! connectivity failure. Callers are expected to degrade both to a safe
//! default rather than fail to render.

use thiserror::Error;

use crate::store::StoreError;

pub type AccessResult<T> = Result<T, AccessError>;

#[derive(Debug, Error)]
pub enum AccessError {
    /// The caller attempted a resolution it is not entitled to perform
    /// (e.g. a company admin resolving a user outside their company).
    /// Distinct from a `granted=false` decision.
    #[error("authorization violation: {0}")]
    Authorization(String),

    /// The external data service failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AccessError {
    pub fn authorization(msg: impl Into<String>) -> Self {
        Self::Authorization(msg.into())
    }
}
