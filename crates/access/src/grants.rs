//! Per-user overrides and permission policy rows.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use spendgate_core::{CompanyId, ModuleId, PermissionId, PermissionKey, Role, UserId};

/// Static catalog entry for a named capability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionRecord {
    pub id: PermissionId,
    pub key: PermissionKey,
    pub name: String,
    pub category: Option<String>,
    /// Set when the capability is scoped to one module.
    pub module_id: Option<ModuleId>,
}

/// Key-indexed view of the permission catalog.
#[derive(Debug, Clone, Default)]
pub struct PermissionCatalog {
    by_key: HashMap<PermissionKey, PermissionRecord>,
}

impl PermissionCatalog {
    pub fn new(records: Vec<PermissionRecord>) -> Self {
        let mut by_key = HashMap::with_capacity(records.len());
        for record in records {
            by_key.entry(record.key.clone()).or_insert(record);
        }
        Self { by_key }
    }

    pub fn by_key(&self, key: &PermissionKey) -> Option<&PermissionRecord> {
        self.by_key.get(key)
    }

    /// The wildcard catalog entry, if the deployment defines one.
    pub fn wildcard(&self) -> Option<&PermissionRecord> {
        self.by_key.get(&PermissionKey::new("*"))
    }
}

/// Explicit per-user grant or denial of one permission, upserted per
/// (user, permission, company). An expired row behaves as if absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPermissionGrant {
    pub user_id: UserId,
    pub permission_id: PermissionId,
    pub company_id: CompanyId,
    pub is_granted: bool,
    pub granted_by: UserId,
    pub expires_at: Option<DateTime<Utc>>,
}

impl UserPermissionGrant {
    /// Whether the grant is in force at `now`.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) => expires_at > now,
            None => true,
        }
    }
}

/// Baseline permission a role has before any explicit grant/deny.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolePermissionDefault {
    pub role: Role,
    pub permission_id: PermissionId,
    pub module_id: Option<ModuleId>,
    pub is_default: bool,
}

/// Per-user module enable/disable that supersedes the company setting.
///
/// Absence of a row means "defer to company setting". A disabled override
/// always wins over an enabled company setting; an enabled override only
/// re-affirms what company policy and role eligibility already allow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserModuleOverride {
    pub user_id: UserId,
    pub company_id: CompanyId,
    pub module_id: ModuleId,
    pub is_enabled: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn grant(expires_at: Option<DateTime<Utc>>) -> UserPermissionGrant {
        UserPermissionGrant {
            user_id: UserId::new(),
            permission_id: PermissionId::new(),
            company_id: CompanyId::new(),
            is_granted: true,
            granted_by: UserId::new(),
            expires_at,
        }
    }

    #[test]
    fn grant_without_expiry_is_active() {
        assert!(grant(None).is_active(Utc::now()));
    }

    #[test]
    fn expired_grant_is_inactive() {
        let now = Utc::now();
        assert!(!grant(Some(now - Duration::minutes(1))).is_active(now));
        assert!(grant(Some(now + Duration::minutes(1))).is_active(now));
    }

    #[test]
    fn permission_catalog_keeps_first_record_per_key() {
        let key = PermissionKey::new("expenses.read");
        let first = PermissionRecord {
            id: PermissionId::new(),
            key: key.clone(),
            name: "Read expenses".to_string(),
            category: Some("expenses".to_string()),
            module_id: None,
        };
        let mut second = first.clone();
        second.id = PermissionId::new();

        let catalog = PermissionCatalog::new(vec![first.clone(), second]);
        assert_eq!(catalog.by_key(&key).unwrap().id, first.id);
    }
}
