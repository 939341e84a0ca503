use spendgate_access::AccessContext;
use spendgate_core::{CompanyId, Role, UserId};

/// Company context for a request. Absent for identities acting outside any
/// company scope.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct CompanyContext {
    company_id: Option<CompanyId>,
}

impl CompanyContext {
    pub fn new(company_id: Option<CompanyId>) -> Self {
        Self { company_id }
    }

    pub fn company_id(&self) -> Option<CompanyId> {
        self.company_id
    }
}

/// Principal context for a request (authenticated identity + role).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalContext {
    user_id: UserId,
    role: Role,
}

impl PrincipalContext {
    pub fn new(user_id: UserId, role: Role) -> Self {
        Self { user_id, role }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn role(&self) -> &Role {
        &self.role
    }

    pub fn access_context(&self, company: &CompanyContext) -> AccessContext {
        AccessContext::new(self.user_id, self.role.clone(), company.company_id())
    }
}
