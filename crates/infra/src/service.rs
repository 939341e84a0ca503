//! The service facade callers talk to.
//!
//! Wires the pure resolvers to a store, a preference adapter and the
//! decision cache. Store failures degrade to the safest default (deny,
//! hide, default menu) with a warning; they never propagate to a caller
//! that is trying to render.

use std::collections::HashSet;

use chrono::{Duration, Utc};

use spendgate_access::{
    check_permission as resolve_permission, has_all as fold_all, has_any as fold_any,
    resolve_user_modules, AccessContext, AccessError, AccessResult, AccessSnapshot, AccessStore,
    CompanyModuleSetting, DecisionSource, ModuleAccess, ModuleCatalog, ModuleQuery,
    PermissionDecision, UserModuleOverride, UserPermissionGrant,
};
use spendgate_core::{CompanyId, PermissionKey, UserId};
use spendgate_menu::{
    compose_menu, required_permission_keys, ComposedMenuItem, MenuAccessView, MenuItem,
    MenuItemPreference, MenuMode, PreferenceStore,
};

use crate::cache::DecisionCache;

const DEFAULT_CACHE_TTL_MINUTES: i64 = 5;

/// Permission, module-access and menu resolution over a store pair.
pub struct AccessService<S, P> {
    store: S,
    preferences: P,
    cache: DecisionCache,
}

impl<S, P> AccessService<S, P>
where
    S: AccessStore,
    P: PreferenceStore,
{
    pub fn new(store: S, preferences: P) -> Self {
        Self::with_cache_ttl(store, preferences, Duration::minutes(DEFAULT_CACHE_TTL_MINUTES))
    }

    pub fn with_cache_ttl(store: S, preferences: P, ttl: Duration) -> Self {
        Self {
            store,
            preferences,
            cache: DecisionCache::new(ttl),
        }
    }

    /// Resolve one permission for the calling identity.
    ///
    /// Never fails: a store outage yields a conservative denial with
    /// `source = StoreUnavailable`. Degraded decisions are not cached.
    pub async fn check_permission(
        &self,
        ctx: &AccessContext,
        key: &PermissionKey,
    ) -> PermissionDecision {
        let now = Utc::now();
        if let Some(cached) = self.cache.get(ctx.user_id, key, ctx.company_id, now) {
            return cached;
        }

        let snapshot = match AccessSnapshot::load(&self.store, ctx).await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                tracing::warn!(user_id = %ctx.user_id, %key, error = %err, "permission check degraded to deny");
                return PermissionDecision::denied(key.clone(), DecisionSource::StoreUnavailable);
            }
        };

        let decision = resolve_permission(
            key,
            &ctx.role,
            &snapshot.permissions,
            &snapshot.grants,
            &snapshot.role_defaults,
            now,
        );
        self.cache.insert(ctx.user_id, ctx.company_id, &decision, now);
        decision
    }

    /// Batch variant: one decision per key, never short-circuiting. A store
    /// outage degrades every key to a denial rather than erroring the batch.
    pub async fn check_permissions(
        &self,
        ctx: &AccessContext,
        keys: &[PermissionKey],
    ) -> Vec<PermissionDecision> {
        let now = Utc::now();
        let snapshot = match AccessSnapshot::load(&self.store, ctx).await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                tracing::warn!(user_id = %ctx.user_id, error = %err, "batch permission check degraded to deny");
                return keys
                    .iter()
                    .map(|key| {
                        PermissionDecision::denied(key.clone(), DecisionSource::StoreUnavailable)
                    })
                    .collect();
            }
        };

        keys.iter()
            .map(|key| {
                let decision = resolve_permission(
                    key,
                    &ctx.role,
                    &snapshot.permissions,
                    &snapshot.grants,
                    &snapshot.role_defaults,
                    now,
                );
                self.cache.insert(ctx.user_id, ctx.company_id, &decision, now);
                decision
            })
            .collect()
    }

    pub async fn has_any(&self, ctx: &AccessContext, keys: &[PermissionKey]) -> bool {
        fold_any(&self.check_permissions(ctx, keys).await)
    }

    pub async fn has_all(&self, ctx: &AccessContext, keys: &[PermissionKey]) -> bool {
        fold_all(&self.check_permissions(ctx, keys).await)
    }

    /// Resolve a permission for another identity.
    ///
    /// Only super-admins may cross a company boundary; anyone else asking
    /// about a foreign company is an authorization violation, a real error
    /// distinct from a denied decision.
    pub async fn check_permission_for(
        &self,
        caller: &AccessContext,
        subject: &AccessContext,
        key: &PermissionKey,
    ) -> AccessResult<PermissionDecision> {
        if !caller.role.is_super_admin() && caller.company_id != subject.company_id {
            return Err(AccessError::authorization(format!(
                "user {} may not resolve access outside their company",
                caller.user_id
            )));
        }
        Ok(self.check_permission(subject, key).await)
    }

    /// Effective module list for the calling identity. Degrades to an empty
    /// list on store failure (hide everything gated).
    pub async fn get_user_modules(
        &self,
        ctx: &AccessContext,
        query: &ModuleQuery,
    ) -> Vec<ModuleAccess> {
        match AccessSnapshot::load(&self.store, ctx).await {
            Ok(snapshot) => {
                resolve_user_modules(&ctx.role, &snapshot.catalog, &snapshot.overrides, query)
            }
            Err(err) => {
                tracing::warn!(user_id = %ctx.user_id, error = %err, "module resolution degraded to empty");
                Vec::new()
            }
        }
    }

    /// Company-level module check by name, independent of any user.
    pub async fn check_company_module_access(
        &self,
        company_id: CompanyId,
        module_name: &str,
    ) -> bool {
        let modules = self.store.system_modules().await;
        let settings = self.store.company_module_settings(company_id).await;
        match (modules, settings) {
            (Ok(modules), Ok(settings)) => {
                ModuleCatalog::new(modules, settings).company_module_access(module_name)
            }
            (Err(err), _) | (_, Err(err)) => {
                tracing::warn!(%company_id, module_name, error = %err, "company module check degraded to deny");
                false
            }
        }
    }

    /// Compose the menu for one view mode.
    ///
    /// All inputs are read together; on store failure the composition still
    /// runs over an empty catalog and overlay, yielding the default-ordered
    /// menu with every gated item withheld.
    pub async fn compose_menu(
        &self,
        ctx: &AccessContext,
        tree: &[MenuItem],
        mode: MenuMode,
    ) -> Vec<ComposedMenuItem> {
        let now = Utc::now();
        let snapshot = match AccessSnapshot::load(&self.store, ctx).await {
            Ok(snapshot) => Some(snapshot),
            Err(err) => {
                tracing::warn!(user_id = %ctx.user_id, error = %err, "menu composition degraded to defaults");
                None
            }
        };

        let preferences = match self.preferences.load_preferences(ctx.user_id).await {
            Ok(preferences) => preferences,
            Err(err) => {
                tracing::warn!(user_id = %ctx.user_id, error = %err, "menu preferences degraded to empty overlay");
                Vec::new()
            }
        };

        let required = required_permission_keys(tree);
        let granted: HashSet<PermissionKey> = match &snapshot {
            Some(snapshot) => required
                .iter()
                .filter(|key| {
                    resolve_permission(
                        key,
                        &ctx.role,
                        &snapshot.permissions,
                        &snapshot.grants,
                        &snapshot.role_defaults,
                        now,
                    )
                    .granted
                })
                .cloned()
                .collect(),
            None => Default::default(),
        };

        let empty_catalog = ModuleCatalog::default();
        let (catalog, overrides): (&ModuleCatalog, &[UserModuleOverride]) = match &snapshot {
            Some(snapshot) => (&snapshot.catalog, &snapshot.overrides),
            None => (&empty_catalog, &[]),
        };

        let view = MenuAccessView {
            role: &ctx.role,
            company_id: ctx.company_id,
            catalog,
            overrides,
            granted: &granted,
        };
        compose_menu(tree, &view, &preferences, mode)
    }

    /// Persist the user's menu order/hidden overlay.
    pub async fn save_preferences(
        &self,
        user_id: UserId,
        preferences: Vec<MenuItemPreference>,
    ) -> AccessResult<()> {
        self.preferences.save_preferences(user_id, preferences).await?;
        self.cache.invalidate_user(user_id);
        Ok(())
    }

    /// Upsert an explicit grant/denial and invalidate before returning.
    pub async fn set_permission_grant(&self, grant: UserPermissionGrant) -> AccessResult<()> {
        let user_id = grant.user_id;
        self.store.upsert_permission_grant(grant).await?;
        self.cache.invalidate_user(user_id);
        Ok(())
    }

    /// Upsert a per-user module override and invalidate before returning.
    pub async fn set_module_override(
        &self,
        module_override: UserModuleOverride,
    ) -> AccessResult<()> {
        let user_id = module_override.user_id;
        self.store.upsert_module_override(module_override).await?;
        self.cache.invalidate_user(user_id);
        Ok(())
    }

    /// Upsert a company module setting and invalidate the company's entries.
    pub async fn set_company_module(&self, setting: CompanyModuleSetting) -> AccessResult<()> {
        let company_id = setting.company_id;
        self.store.upsert_company_module_setting(setting).await?;
        self.cache.invalidate_company(company_id);
        Ok(())
    }
}
