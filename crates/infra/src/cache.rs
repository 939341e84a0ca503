//! Short-TTL cache for permission decisions.
//!
//! Keyed `(user, key, company)`. Entries are independent; invalidation is
//! explicit and synchronous: every mutation clears the affected entries
//! before reporting success, so a same-process read immediately after a
//! grant change never sees the stale decision.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Duration, Utc};

use spendgate_access::{DecisionSource, PermissionDecision};
use spendgate_core::{CompanyId, PermissionKey, UserId};

type CacheKey = (UserId, PermissionKey, Option<CompanyId>);

#[derive(Debug, Clone, Copy)]
struct CachedDecision {
    granted: bool,
    source: DecisionSource,
    cached_at: DateTime<Utc>,
}

/// TTL cache for `(user, key, company) -> decision`.
#[derive(Debug)]
pub struct DecisionCache {
    ttl: Duration,
    entries: RwLock<HashMap<CacheKey, CachedDecision>>,
}

impl DecisionCache {
    /// Grants rarely change mid-session; a few minutes is the intended TTL.
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn get(
        &self,
        user_id: UserId,
        key: &PermissionKey,
        company_id: Option<CompanyId>,
        now: DateTime<Utc>,
    ) -> Option<PermissionDecision> {
        let entries = self.entries.read().ok()?;
        let cached = entries.get(&(user_id, key.clone(), company_id))?;
        if now - cached.cached_at >= self.ttl {
            return None;
        }
        Some(PermissionDecision {
            key: key.clone(),
            granted: cached.granted,
            source: cached.source,
        })
    }

    pub fn insert(
        &self,
        user_id: UserId,
        company_id: Option<CompanyId>,
        decision: &PermissionDecision,
        now: DateTime<Utc>,
    ) {
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(
                (user_id, decision.key.clone(), company_id),
                CachedDecision {
                    granted: decision.granted,
                    source: decision.source,
                    cached_at: now,
                },
            );
        }
    }

    /// Drop every entry for one user (grant or override changed).
    pub fn invalidate_user(&self, user_id: UserId) {
        if let Ok(mut entries) = self.entries.write() {
            entries.retain(|(user, _, _), _| *user != user_id);
        }
    }

    /// Drop every entry scoped to one company (module enablement changed).
    pub fn invalidate_company(&self, company_id: CompanyId) {
        if let Ok(mut entries) = self.entries.write() {
            entries.retain(|(_, _, company), _| *company != Some(company_id));
        }
    }

    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.write() {
            entries.clear();
        }
    }
}
