//! Data-access seam for the engine.
//!
//! The external relational data service is reached through [`AccessStore`];
//! the engine owns no persistence. [`AccessSnapshot`] bundles everything one
//! resolution needs, fetched together so a partially refreshed view can never
//! mix stale and fresh rows.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use spendgate_core::{CompanyId, Role, UserId};

use crate::catalog::{CompanyModuleSetting, ModuleCatalog, SystemModule};
use crate::context::AccessContext;
use crate::grants::{
    PermissionCatalog, PermissionRecord, RolePermissionDefault, UserModuleOverride,
    UserPermissionGrant,
};

/// Failure talking to the external data service.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

impl StoreError {
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Row-level access to the four policy tables and the permission catalog.
///
/// Reads are independent and potentially concurrent; mutations are upserts
/// (one logical row per natural key).
#[async_trait]
pub trait AccessStore: Send + Sync {
    async fn system_modules(&self) -> StoreResult<Vec<SystemModule>>;

    async fn permissions(&self) -> StoreResult<Vec<PermissionRecord>>;

    async fn company_module_settings(
        &self,
        company_id: CompanyId,
    ) -> StoreResult<Vec<CompanyModuleSetting>>;

    async fn user_module_overrides(
        &self,
        user_id: UserId,
        company_id: CompanyId,
    ) -> StoreResult<Vec<UserModuleOverride>>;

    async fn permission_grants(
        &self,
        user_id: UserId,
        company_id: CompanyId,
    ) -> StoreResult<Vec<UserPermissionGrant>>;

    async fn role_permission_defaults(&self, role: &Role)
        -> StoreResult<Vec<RolePermissionDefault>>;

    async fn upsert_permission_grant(&self, grant: UserPermissionGrant) -> StoreResult<()>;

    async fn upsert_module_override(&self, module_override: UserModuleOverride) -> StoreResult<()>;

    async fn upsert_company_module_setting(
        &self,
        setting: CompanyModuleSetting,
    ) -> StoreResult<()>;
}

#[async_trait]
impl<S> AccessStore for Arc<S>
where
    S: AccessStore + ?Sized,
{
    async fn system_modules(&self) -> StoreResult<Vec<SystemModule>> {
        (**self).system_modules().await
    }

    async fn permissions(&self) -> StoreResult<Vec<PermissionRecord>> {
        (**self).permissions().await
    }

    async fn company_module_settings(
        &self,
        company_id: CompanyId,
    ) -> StoreResult<Vec<CompanyModuleSetting>> {
        (**self).company_module_settings(company_id).await
    }

    async fn user_module_overrides(
        &self,
        user_id: UserId,
        company_id: CompanyId,
    ) -> StoreResult<Vec<UserModuleOverride>> {
        (**self).user_module_overrides(user_id, company_id).await
    }

    async fn permission_grants(
        &self,
        user_id: UserId,
        company_id: CompanyId,
    ) -> StoreResult<Vec<UserPermissionGrant>> {
        (**self).permission_grants(user_id, company_id).await
    }

    async fn role_permission_defaults(
        &self,
        role: &Role,
    ) -> StoreResult<Vec<RolePermissionDefault>> {
        (**self).role_permission_defaults(role).await
    }

    async fn upsert_permission_grant(&self, grant: UserPermissionGrant) -> StoreResult<()> {
        (**self).upsert_permission_grant(grant).await
    }

    async fn upsert_module_override(&self, module_override: UserModuleOverride) -> StoreResult<()> {
        (**self).upsert_module_override(module_override).await
    }

    async fn upsert_company_module_setting(
        &self,
        setting: CompanyModuleSetting,
    ) -> StoreResult<()> {
        (**self).upsert_company_module_setting(setting).await
    }
}

/// Everything one resolution needs, read as of a single point in time.
///
/// Invalidation refetches the whole snapshot rather than patching pieces, so
/// a just-revoked grant can never coexist with a stale module view.
#[derive(Debug, Clone)]
pub struct AccessSnapshot {
    pub catalog: ModuleCatalog,
    pub permissions: PermissionCatalog,
    pub overrides: Vec<UserModuleOverride>,
    pub grants: Vec<UserPermissionGrant>,
    pub role_defaults: Vec<RolePermissionDefault>,
    pub fetched_at: DateTime<Utc>,
}

impl AccessSnapshot {
    /// Fetch all inputs for `ctx` together.
    ///
    /// Identities without a company scope get empty company settings,
    /// overrides and grants: only role defaults can apply to them.
    pub async fn load<S: AccessStore>(store: &S, ctx: &AccessContext) -> StoreResult<Self> {
        let modules = store.system_modules().await?;
        let permissions = store.permissions().await?;
        let role_defaults = store.role_permission_defaults(&ctx.role).await?;

        let (settings, overrides, grants) = match ctx.company_id {
            Some(company_id) => {
                let settings = store.company_module_settings(company_id).await?;
                let overrides = store.user_module_overrides(ctx.user_id, company_id).await?;
                let grants = store.permission_grants(ctx.user_id, company_id).await?;
                (settings, overrides, grants)
            }
            None => (Vec::new(), Vec::new(), Vec::new()),
        };

        Ok(Self {
            catalog: ModuleCatalog::new(modules, settings),
            permissions: PermissionCatalog::new(permissions),
            overrides,
            grants,
            role_defaults,
            fetched_at: Utc::now(),
        })
    }
}
