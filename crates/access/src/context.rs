//! Explicit resolution context.
//!
//! Every resolver call takes the acting identity as an argument; there is no
//! ambient "current user" state anywhere in the engine.

use spendgate_core::{CompanyId, Role, UserId};

/// Authenticated identity a resolution runs for.
///
/// Produced by the caller from an already-validated session; the engine never
/// authenticates anyone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessContext {
    pub user_id: UserId,
    pub role: Role,
    /// Company the user is acting within. `None` for identities not bound to
    /// a company (e.g. platform operators browsing outside a company scope).
    pub company_id: Option<CompanyId>,
}

impl AccessContext {
    pub fn new(user_id: UserId, role: Role, company_id: Option<CompanyId>) -> Self {
        Self {
            user_id,
            role,
            company_id,
        }
    }
}
