//! Permission resolution.
//!
//! The central decision function reused by route guards, in-component checks
//! and the menu composer. Pure: callers supply a snapshot of the policy rows,
//! the resolver never performs IO.

use chrono::{DateTime, Utc};
use serde::Serialize;

use spendgate_core::{PermissionKey, Role};

use crate::grants::{PermissionCatalog, RolePermissionDefault, UserPermissionGrant};

/// Which rule decided a permission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionSource {
    /// An unexpired explicit denial row.
    ExplicitDeny,
    /// An unexpired explicit grant row.
    ExplicitGrant,
    /// The role's baseline default.
    RoleDefault,
    /// No matching rule; denied.
    FailClosed,
    /// The data source was unavailable; denied conservatively.
    StoreUnavailable,
}

/// Outcome of a single permission check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PermissionDecision {
    pub key: PermissionKey,
    pub granted: bool,
    pub source: DecisionSource,
}

impl PermissionDecision {
    pub fn denied(key: PermissionKey, source: DecisionSource) -> Self {
        Self {
            key,
            granted: false,
            source,
        }
    }

    pub fn granted(key: PermissionKey, source: DecisionSource) -> Self {
        Self {
            key,
            granted: true,
            source,
        }
    }
}

/// Resolve one permission key. First decisive rule wins:
///
/// 1. unexpired explicit denial → denied
/// 2. unexpired explicit grant → granted
/// 3. role default (`is_default = true`), directly or via the wildcard entry
/// 4. nothing matched → denied
pub fn check_permission(
    key: &PermissionKey,
    role: &Role,
    catalog: &PermissionCatalog,
    grants: &[UserPermissionGrant],
    defaults: &[RolePermissionDefault],
    now: DateTime<Utc>,
) -> PermissionDecision {
    let Some(record) = catalog.by_key(key) else {
        return PermissionDecision::denied(key.clone(), DecisionSource::FailClosed);
    };

    let active = grants
        .iter()
        .filter(|g| g.permission_id == record.id && g.is_active(now));

    let mut explicit_grant = false;
    for grant in active {
        if !grant.is_granted {
            return PermissionDecision::denied(key.clone(), DecisionSource::ExplicitDeny);
        }
        explicit_grant = true;
    }
    if explicit_grant {
        return PermissionDecision::granted(key.clone(), DecisionSource::ExplicitGrant);
    }

    let role_default = defaults.iter().any(|d| {
        d.is_default
            && d.role == *role
            && (d.permission_id == record.id
                || catalog.wildcard().is_some_and(|w| d.permission_id == w.id))
    });
    if role_default {
        return PermissionDecision::granted(key.clone(), DecisionSource::RoleDefault);
    }

    PermissionDecision::denied(key.clone(), DecisionSource::FailClosed)
}

/// Batch variant: one decision per key, in input order.
///
/// Never short-circuits; a key that cannot be resolved yields a fail-closed
/// decision rather than aborting the batch.
pub fn check_multiple_permissions(
    keys: &[PermissionKey],
    role: &Role,
    catalog: &PermissionCatalog,
    grants: &[UserPermissionGrant],
    defaults: &[RolePermissionDefault],
    now: DateTime<Utc>,
) -> Vec<PermissionDecision> {
    keys.iter()
        .map(|key| check_permission(key, role, catalog, grants, defaults, now))
        .collect()
}

/// Logical OR over a batch of decisions. An errored/fail-closed check
/// contributes `false`, never an error.
pub fn has_any(decisions: &[PermissionDecision]) -> bool {
    decisions.iter().any(|d| d.granted)
}

/// Logical AND over a batch of decisions. Empty input is `true`.
pub fn has_all(decisions: &[PermissionDecision]) -> bool {
    decisions.iter().all(|d| d.granted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use spendgate_core::role::roles;
    use spendgate_core::{CompanyId, PermissionId, UserId};

    use crate::grants::PermissionRecord;

    struct Fixture {
        catalog: PermissionCatalog,
        approve: PermissionId,
        user_id: UserId,
        company_id: CompanyId,
    }

    fn fixture() -> Fixture {
        let approve = PermissionId::new();
        let catalog = PermissionCatalog::new(vec![PermissionRecord {
            id: approve,
            key: PermissionKey::new("expenses.approve"),
            name: "Approve expenses".to_string(),
            category: Some("expenses".to_string()),
            module_id: None,
        }]);
        Fixture {
            catalog,
            approve,
            user_id: UserId::new(),
            company_id: CompanyId::new(),
        }
    }

    fn grant(f: &Fixture, is_granted: bool, expires_at: Option<DateTime<Utc>>) -> UserPermissionGrant {
        UserPermissionGrant {
            user_id: f.user_id,
            permission_id: f.approve,
            company_id: f.company_id,
            is_granted,
            granted_by: UserId::new(),
            expires_at,
        }
    }

    fn role_default(f: &Fixture, role: &str) -> RolePermissionDefault {
        RolePermissionDefault {
            role: Role::new(role.to_string()),
            permission_id: f.approve,
            module_id: None,
            is_default: true,
        }
    }

    fn key() -> PermissionKey {
        PermissionKey::new("expenses.approve")
    }

    #[test]
    fn explicit_deny_beats_role_default() {
        let f = fixture();
        let decision = check_permission(
            &key(),
            &Role::new(roles::CONTROLLER),
            &f.catalog,
            &[grant(&f, false, None)],
            &[role_default(&f, roles::CONTROLLER)],
            Utc::now(),
        );
        assert!(!decision.granted);
        assert_eq!(decision.source, DecisionSource::ExplicitDeny);
    }

    #[test]
    fn explicit_grant_beats_missing_role_default() {
        let f = fixture();
        let decision = check_permission(
            &key(),
            &Role::new(roles::USER),
            &f.catalog,
            &[grant(&f, true, None)],
            &[],
            Utc::now(),
        );
        assert!(decision.granted);
        assert_eq!(decision.source, DecisionSource::ExplicitGrant);
    }

    #[test]
    fn expired_grant_falls_back_to_role_default() {
        let f = fixture();
        let now = Utc::now();
        let expired = grant(&f, true, Some(now - Duration::hours(1)));

        let decision = check_permission(
            &key(),
            &Role::new(roles::CONTROLLER),
            &f.catalog,
            &[expired.clone()],
            &[role_default(&f, roles::CONTROLLER)],
            now,
        );
        assert!(decision.granted);
        assert_eq!(decision.source, DecisionSource::RoleDefault);

        // And an expired deny no longer denies.
        let mut expired_deny = expired;
        expired_deny.is_granted = false;
        let decision = check_permission(
            &key(),
            &Role::new(roles::CONTROLLER),
            &f.catalog,
            &[expired_deny],
            &[role_default(&f, roles::CONTROLLER)],
            now,
        );
        assert!(decision.granted);
    }

    #[test]
    fn unknown_key_fails_closed() {
        let f = fixture();
        let decision = check_permission(
            &PermissionKey::new("vendors.merge"),
            &Role::new(roles::ADMIN),
            &f.catalog,
            &[],
            &[],
            Utc::now(),
        );
        assert!(!decision.granted);
        assert_eq!(decision.source, DecisionSource::FailClosed);
    }

    #[test]
    fn role_default_requires_matching_role() {
        let f = fixture();
        let decision = check_permission(
            &key(),
            &Role::new(roles::USER),
            &f.catalog,
            &[],
            &[role_default(&f, roles::CONTROLLER)],
            Utc::now(),
        );
        assert!(!decision.granted);
        assert_eq!(decision.source, DecisionSource::FailClosed);
    }

    #[test]
    fn wildcard_role_default_grants_everything() {
        let wildcard_id = PermissionId::new();
        let approve = PermissionId::new();
        let catalog = PermissionCatalog::new(vec![
            PermissionRecord {
                id: wildcard_id,
                key: PermissionKey::new("*"),
                name: "All permissions".to_string(),
                category: None,
                module_id: None,
            },
            PermissionRecord {
                id: approve,
                key: PermissionKey::new("expenses.approve"),
                name: "Approve expenses".to_string(),
                category: None,
                module_id: None,
            },
        ]);
        let defaults = [RolePermissionDefault {
            role: Role::new(roles::SUPER_ADMIN),
            permission_id: wildcard_id,
            module_id: None,
            is_default: true,
        }];

        let decision = check_permission(
            &key(),
            &Role::new(roles::SUPER_ADMIN),
            &catalog,
            &[],
            &defaults,
            Utc::now(),
        );
        assert!(decision.granted);
        assert_eq!(decision.source, DecisionSource::RoleDefault);
    }

    #[test]
    fn batch_check_returns_partial_results() {
        let f = fixture();
        let keys = [key(), PermissionKey::new("definitely.missing")];
        let decisions = check_multiple_permissions(
            &keys,
            &Role::new(roles::CONTROLLER),
            &f.catalog,
            &[],
            &[role_default(&f, roles::CONTROLLER)],
            Utc::now(),
        );
        assert_eq!(decisions.len(), 2);
        assert!(decisions[0].granted);
        assert!(!decisions[1].granted);
        assert!(has_any(&decisions));
        assert!(!has_all(&decisions));
    }

    #[test]
    fn has_all_is_true_for_empty_batch() {
        assert!(has_all(&[]));
        assert!(!has_any(&[]));
    }
}
