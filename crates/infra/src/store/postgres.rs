//! Postgres binding for the external relational data service.
//!
//! The schema belongs to the external collaborator; this adapter only reads
//! and upserts the four policy tables plus the per-user preference document:
//!
//! ```sql
//! system_modules          (id, name, module_type, category, allowed_roles)
//! permissions             (id, key, name, category, module_id)
//! company_module_settings (company_id, module_id, is_enabled, is_locked_by_system)
//! user_module_overrides   (user_id, company_id, module_id, is_enabled)
//! user_permission_grants  (user_id, permission_id, company_id, is_granted, granted_by, expires_at)
//! role_permission_defaults(role, permission_id, module_id, is_default)
//! user_menu_preferences   (user_id, document)
//! ```
//!
//! Shape ambiguities are normalized here: an unparseable `module_type` drops
//! the row, a malformed `allowed_roles` document degrades to "all roles",
//! and the preference document goes through the legacy normalizer.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use spendgate_access::{
    AccessStore, CompanyModuleSetting, ModuleType, PermissionRecord, RolePermissionDefault,
    StoreError, StoreResult, SystemModule, UserModuleOverride, UserPermissionGrant,
};
use spendgate_core::{CompanyId, ModuleId, PermissionId, PermissionKey, Role, UserId};
use spendgate_menu::{normalize_preference_document, MenuItemPreference, PreferenceStore};

/// Postgres-backed [`AccessStore`] and [`PreferenceStore`].
#[derive(Debug, Clone)]
pub struct PgAccessStore {
    pool: PgPool,
}

impl PgAccessStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn backend(err: sqlx::Error) -> StoreError {
    StoreError::Backend(err.into())
}

fn parse_module_type(raw: &str) -> Option<ModuleType> {
    match raw {
        "core" => Some(ModuleType::Core),
        "super" => Some(ModuleType::Super),
        "add-on" => Some(ModuleType::AddOn),
        _ => None,
    }
}

fn parse_allowed_roles(raw: Option<serde_json::Value>) -> Option<Vec<Role>> {
    let value = raw?;
    if value.is_null() {
        return None;
    }
    match serde_json::from_value::<Vec<String>>(value) {
        Ok(names) => Some(names.into_iter().map(Role::new).collect()),
        Err(err) => {
            tracing::warn!(error = %err, "malformed allowed_roles document; treating as all roles");
            None
        }
    }
}

#[async_trait]
impl AccessStore for PgAccessStore {
    async fn system_modules(&self) -> StoreResult<Vec<SystemModule>> {
        let rows = sqlx::query(
            "SELECT id, name, module_type, category, allowed_roles FROM system_modules ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        let mut modules = Vec::with_capacity(rows.len());
        for row in rows {
            let raw_type: String = row.try_get("module_type").map_err(backend)?;
            let Some(module_type) = parse_module_type(&raw_type) else {
                tracing::warn!(module_type = %raw_type, "unknown module type; dropping row");
                continue;
            };
            modules.push(SystemModule {
                id: ModuleId::from_uuid(row.try_get::<Uuid, _>("id").map_err(backend)?),
                name: row.try_get("name").map_err(backend)?,
                module_type,
                category: row.try_get("category").map_err(backend)?,
                allowed_roles: parse_allowed_roles(
                    row.try_get::<Option<serde_json::Value>, _>("allowed_roles")
                        .map_err(backend)?,
                ),
            });
        }
        Ok(modules)
    }

    async fn permissions(&self) -> StoreResult<Vec<PermissionRecord>> {
        let rows = sqlx::query("SELECT id, key, name, category, module_id FROM permissions")
            .fetch_all(&self.pool)
            .await
            .map_err(backend)?;

        rows.into_iter()
            .map(|row| {
                Ok(PermissionRecord {
                    id: PermissionId::from_uuid(row.try_get::<Uuid, _>("id").map_err(backend)?),
                    key: PermissionKey::new(row.try_get::<String, _>("key").map_err(backend)?),
                    name: row.try_get("name").map_err(backend)?,
                    category: row.try_get("category").map_err(backend)?,
                    module_id: row
                        .try_get::<Option<Uuid>, _>("module_id")
                        .map_err(backend)?
                        .map(ModuleId::from_uuid),
                })
            })
            .collect()
    }

    async fn company_module_settings(
        &self,
        company_id: CompanyId,
    ) -> StoreResult<Vec<CompanyModuleSetting>> {
        let rows = sqlx::query(
            "SELECT company_id, module_id, is_enabled, is_locked_by_system \
             FROM company_module_settings WHERE company_id = $1",
        )
        .bind(company_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        rows.into_iter()
            .map(|row| {
                Ok(CompanyModuleSetting {
                    company_id: CompanyId::from_uuid(
                        row.try_get::<Uuid, _>("company_id").map_err(backend)?,
                    ),
                    module_id: ModuleId::from_uuid(
                        row.try_get::<Uuid, _>("module_id").map_err(backend)?,
                    ),
                    is_enabled: row.try_get("is_enabled").map_err(backend)?,
                    is_locked_by_system: row.try_get("is_locked_by_system").map_err(backend)?,
                })
            })
            .collect()
    }

    async fn user_module_overrides(
        &self,
        user_id: UserId,
        company_id: CompanyId,
    ) -> StoreResult<Vec<UserModuleOverride>> {
        let rows = sqlx::query(
            "SELECT user_id, company_id, module_id, is_enabled \
             FROM user_module_overrides WHERE user_id = $1 AND company_id = $2",
        )
        .bind(user_id.as_uuid())
        .bind(company_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        rows.into_iter()
            .map(|row| {
                Ok(UserModuleOverride {
                    user_id: UserId::from_uuid(row.try_get::<Uuid, _>("user_id").map_err(backend)?),
                    company_id: CompanyId::from_uuid(
                        row.try_get::<Uuid, _>("company_id").map_err(backend)?,
                    ),
                    module_id: ModuleId::from_uuid(
                        row.try_get::<Uuid, _>("module_id").map_err(backend)?,
                    ),
                    is_enabled: row.try_get("is_enabled").map_err(backend)?,
                })
            })
            .collect()
    }

    async fn permission_grants(
        &self,
        user_id: UserId,
        company_id: CompanyId,
    ) -> StoreResult<Vec<UserPermissionGrant>> {
        let rows = sqlx::query(
            "SELECT user_id, permission_id, company_id, is_granted, granted_by, expires_at \
             FROM user_permission_grants WHERE user_id = $1 AND company_id = $2",
        )
        .bind(user_id.as_uuid())
        .bind(company_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        rows.into_iter()
            .map(|row| {
                Ok(UserPermissionGrant {
                    user_id: UserId::from_uuid(row.try_get::<Uuid, _>("user_id").map_err(backend)?),
                    permission_id: PermissionId::from_uuid(
                        row.try_get::<Uuid, _>("permission_id").map_err(backend)?,
                    ),
                    company_id: CompanyId::from_uuid(
                        row.try_get::<Uuid, _>("company_id").map_err(backend)?,
                    ),
                    is_granted: row.try_get("is_granted").map_err(backend)?,
                    granted_by: UserId::from_uuid(
                        row.try_get::<Uuid, _>("granted_by").map_err(backend)?,
                    ),
                    expires_at: row
                        .try_get::<Option<DateTime<Utc>>, _>("expires_at")
                        .map_err(backend)?,
                })
            })
            .collect()
    }

    async fn role_permission_defaults(
        &self,
        role: &Role,
    ) -> StoreResult<Vec<RolePermissionDefault>> {
        let rows = sqlx::query(
            "SELECT role, permission_id, module_id, is_default \
             FROM role_permission_defaults WHERE role = $1",
        )
        .bind(role.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        rows.into_iter()
            .map(|row| {
                Ok(RolePermissionDefault {
                    role: Role::new(row.try_get::<String, _>("role").map_err(backend)?),
                    permission_id: PermissionId::from_uuid(
                        row.try_get::<Uuid, _>("permission_id").map_err(backend)?,
                    ),
                    module_id: row
                        .try_get::<Option<Uuid>, _>("module_id")
                        .map_err(backend)?
                        .map(ModuleId::from_uuid),
                    is_default: row.try_get("is_default").map_err(backend)?,
                })
            })
            .collect()
    }

    async fn upsert_permission_grant(&self, grant: UserPermissionGrant) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO user_permission_grants \
             (user_id, permission_id, company_id, is_granted, granted_by, expires_at) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             ON CONFLICT (user_id, permission_id, company_id) DO UPDATE SET \
             is_granted = EXCLUDED.is_granted, \
             granted_by = EXCLUDED.granted_by, \
             expires_at = EXCLUDED.expires_at",
        )
        .bind(grant.user_id.as_uuid())
        .bind(grant.permission_id.as_uuid())
        .bind(grant.company_id.as_uuid())
        .bind(grant.is_granted)
        .bind(grant.granted_by.as_uuid())
        .bind(grant.expires_at)
        .execute(&self.pool)
        .await
        .map_err(backend)?;
        Ok(())
    }

    async fn upsert_module_override(&self, module_override: UserModuleOverride) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO user_module_overrides (user_id, company_id, module_id, is_enabled) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (user_id, company_id, module_id) DO UPDATE SET \
             is_enabled = EXCLUDED.is_enabled",
        )
        .bind(module_override.user_id.as_uuid())
        .bind(module_override.company_id.as_uuid())
        .bind(module_override.module_id.as_uuid())
        .bind(module_override.is_enabled)
        .execute(&self.pool)
        .await
        .map_err(backend)?;
        Ok(())
    }

    async fn upsert_company_module_setting(
        &self,
        setting: CompanyModuleSetting,
    ) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO company_module_settings \
             (company_id, module_id, is_enabled, is_locked_by_system) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (company_id, module_id) DO UPDATE SET \
             is_enabled = EXCLUDED.is_enabled, \
             is_locked_by_system = EXCLUDED.is_locked_by_system",
        )
        .bind(setting.company_id.as_uuid())
        .bind(setting.module_id.as_uuid())
        .bind(setting.is_enabled)
        .bind(setting.is_locked_by_system)
        .execute(&self.pool)
        .await
        .map_err(backend)?;
        Ok(())
    }
}

#[async_trait]
impl PreferenceStore for PgAccessStore {
    async fn load_preferences(&self, user_id: UserId) -> StoreResult<Vec<MenuItemPreference>> {
        let row = sqlx::query("SELECT document FROM user_menu_preferences WHERE user_id = $1")
            .bind(user_id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;

        match row {
            Some(row) => {
                let document: serde_json::Value = row.try_get("document").map_err(backend)?;
                Ok(normalize_preference_document(&document))
            }
            None => Ok(Vec::new()),
        }
    }

    async fn save_preferences(
        &self,
        user_id: UserId,
        preferences: Vec<MenuItemPreference>,
    ) -> StoreResult<()> {
        let document = serde_json::to_value(&preferences)
            .map_err(|e| StoreError::Backend(e.into()))?;
        sqlx::query(
            "INSERT INTO user_menu_preferences (user_id, document) VALUES ($1, $2) \
             ON CONFLICT (user_id) DO UPDATE SET document = EXCLUDED.document",
        )
        .bind(user_id.as_uuid())
        .bind(document)
        .execute(&self.pool)
        .await
        .map_err(backend)?;
        Ok(())
    }
}
