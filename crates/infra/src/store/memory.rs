//! In-memory store for tests/dev.
//!
//! Mirrors the upsert semantics of the external service: one logical row per
//! natural key, no hard deletes. A connectivity toggle lets tests exercise
//! the engine's degraded paths.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;

use spendgate_access::{
    AccessStore, CompanyModuleSetting, PermissionRecord, RolePermissionDefault, StoreError,
    StoreResult, SystemModule, UserModuleOverride, UserPermissionGrant,
};
use spendgate_core::{CompanyId, ModuleId, PermissionId, Role, UserId};
use spendgate_menu::{MenuItemPreference, PreferenceStore};

#[derive(Debug, Default)]
struct Tables {
    modules: Vec<SystemModule>,
    permissions: Vec<PermissionRecord>,
    settings: HashMap<(CompanyId, ModuleId), CompanyModuleSetting>,
    overrides: HashMap<(UserId, CompanyId, ModuleId), UserModuleOverride>,
    grants: HashMap<(UserId, PermissionId, CompanyId), UserPermissionGrant>,
    role_defaults: Vec<RolePermissionDefault>,
    preferences: HashMap<UserId, Vec<MenuItemPreference>>,
}

/// In-memory implementation of [`AccessStore`] and [`PreferenceStore`].
#[derive(Debug, Default)]
pub struct InMemoryAccessStore {
    tables: RwLock<Tables>,
    unavailable: AtomicBool,
}

impl InMemoryAccessStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate the external service being unreachable.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> StoreResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::unavailable("in-memory store marked offline"));
        }
        Ok(())
    }

    pub fn seed_modules(&self, modules: Vec<SystemModule>) {
        if let Ok(mut tables) = self.tables.write() {
            tables.modules = modules;
        }
    }

    pub fn seed_permissions(&self, permissions: Vec<PermissionRecord>) {
        if let Ok(mut tables) = self.tables.write() {
            tables.permissions = permissions;
        }
    }

    pub fn seed_role_defaults(&self, defaults: Vec<RolePermissionDefault>) {
        if let Ok(mut tables) = self.tables.write() {
            tables.role_defaults = defaults;
        }
    }
}

#[async_trait]
impl AccessStore for InMemoryAccessStore {
    async fn system_modules(&self) -> StoreResult<Vec<SystemModule>> {
        self.check_available()?;
        let tables = self
            .tables
            .read()
            .map_err(|_| StoreError::unavailable("poisoned lock"))?;
        Ok(tables.modules.clone())
    }

    async fn permissions(&self) -> StoreResult<Vec<PermissionRecord>> {
        self.check_available()?;
        let tables = self
            .tables
            .read()
            .map_err(|_| StoreError::unavailable("poisoned lock"))?;
        Ok(tables.permissions.clone())
    }

    async fn company_module_settings(
        &self,
        company_id: CompanyId,
    ) -> StoreResult<Vec<CompanyModuleSetting>> {
        self.check_available()?;
        let tables = self
            .tables
            .read()
            .map_err(|_| StoreError::unavailable("poisoned lock"))?;
        Ok(tables
            .settings
            .iter()
            .filter(|((company, _), _)| *company == company_id)
            .map(|(_, setting)| *setting)
            .collect())
    }

    async fn user_module_overrides(
        &self,
        user_id: UserId,
        company_id: CompanyId,
    ) -> StoreResult<Vec<UserModuleOverride>> {
        self.check_available()?;
        let tables = self
            .tables
            .read()
            .map_err(|_| StoreError::unavailable("poisoned lock"))?;
        Ok(tables
            .overrides
            .iter()
            .filter(|((user, company, _), _)| *user == user_id && *company == company_id)
            .map(|(_, o)| *o)
            .collect())
    }

    async fn permission_grants(
        &self,
        user_id: UserId,
        company_id: CompanyId,
    ) -> StoreResult<Vec<UserPermissionGrant>> {
        self.check_available()?;
        let tables = self
            .tables
            .read()
            .map_err(|_| StoreError::unavailable("poisoned lock"))?;
        Ok(tables
            .grants
            .iter()
            .filter(|((user, _, company), _)| *user == user_id && *company == company_id)
            .map(|(_, g)| g.clone())
            .collect())
    }

    async fn role_permission_defaults(
        &self,
        role: &Role,
    ) -> StoreResult<Vec<RolePermissionDefault>> {
        self.check_available()?;
        let tables = self
            .tables
            .read()
            .map_err(|_| StoreError::unavailable("poisoned lock"))?;
        Ok(tables
            .role_defaults
            .iter()
            .filter(|d| d.role == *role)
            .cloned()
            .collect())
    }

    async fn upsert_permission_grant(&self, grant: UserPermissionGrant) -> StoreResult<()> {
        self.check_available()?;
        let mut tables = self
            .tables
            .write()
            .map_err(|_| StoreError::unavailable("poisoned lock"))?;
        tables
            .grants
            .insert((grant.user_id, grant.permission_id, grant.company_id), grant);
        Ok(())
    }

    async fn upsert_module_override(&self, module_override: UserModuleOverride) -> StoreResult<()> {
        self.check_available()?;
        let mut tables = self
            .tables
            .write()
            .map_err(|_| StoreError::unavailable("poisoned lock"))?;
        tables.overrides.insert(
            (
                module_override.user_id,
                module_override.company_id,
                module_override.module_id,
            ),
            module_override,
        );
        Ok(())
    }

    async fn upsert_company_module_setting(
        &self,
        setting: CompanyModuleSetting,
    ) -> StoreResult<()> {
        self.check_available()?;
        let mut tables = self
            .tables
            .write()
            .map_err(|_| StoreError::unavailable("poisoned lock"))?;
        tables
            .settings
            .insert((setting.company_id, setting.module_id), setting);
        Ok(())
    }
}

#[async_trait]
impl PreferenceStore for InMemoryAccessStore {
    async fn load_preferences(&self, user_id: UserId) -> StoreResult<Vec<MenuItemPreference>> {
        self.check_available()?;
        let tables = self
            .tables
            .read()
            .map_err(|_| StoreError::unavailable("poisoned lock"))?;
        Ok(tables.preferences.get(&user_id).cloned().unwrap_or_default())
    }

    async fn save_preferences(
        &self,
        user_id: UserId,
        preferences: Vec<MenuItemPreference>,
    ) -> StoreResult<()> {
        self.check_available()?;
        let mut tables = self
            .tables
            .write()
            .map_err(|_| StoreError::unavailable("poisoned lock"))?;
        tables.preferences.insert(user_id, preferences);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[tokio::test]
    async fn grant_upsert_replaces_the_logical_row() {
        let store = InMemoryAccessStore::new();
        let user_id = UserId::new();
        let company_id = CompanyId::new();
        let permission_id = PermissionId::new();

        let mut grant = UserPermissionGrant {
            user_id,
            permission_id,
            company_id,
            is_granted: true,
            granted_by: UserId::new(),
            expires_at: None,
        };
        store.upsert_permission_grant(grant.clone()).await.unwrap();

        grant.is_granted = false;
        grant.expires_at = Some(Utc::now());
        store.upsert_permission_grant(grant).await.unwrap();

        let grants = store.permission_grants(user_id, company_id).await.unwrap();
        assert_eq!(grants.len(), 1);
        assert!(!grants[0].is_granted);
    }

    #[tokio::test]
    async fn unavailable_store_fails_every_read() {
        let store = InMemoryAccessStore::new();
        store.set_unavailable(true);
        assert!(store.system_modules().await.is_err());
        assert!(store.load_preferences(UserId::new()).await.is_err());

        store.set_unavailable(false);
        assert!(store.system_modules().await.is_ok());
    }

    #[tokio::test]
    async fn preferences_round_trip_per_user() {
        let store = InMemoryAccessStore::new();
        let user_id = UserId::new();

        assert!(store.load_preferences(user_id).await.unwrap().is_empty());

        let prefs = vec![
            MenuItemPreference::visible("billing"),
            MenuItemPreference::hidden("dashboard"),
        ];
        store.save_preferences(user_id, prefs.clone()).await.unwrap();
        assert_eq!(store.load_preferences(user_id).await.unwrap(), prefs);

        // Another user is untouched.
        assert!(store.load_preferences(UserId::new()).await.unwrap().is_empty());
    }
}
