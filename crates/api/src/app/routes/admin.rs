//! Administrative mutations: grants, module overrides, company settings.
//!
//! Every mutation invalidates cached decisions before responding, so a
//! caller that re-checks immediately after sees the new state.

use std::sync::Arc;

use axum::{
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use spendgate_access::{CompanyModuleSetting, UserModuleOverride, UserPermissionGrant};
use spendgate_core::role::roles;
use spendgate_core::{CompanyId, ModuleId, PermissionId, UserId};

use crate::app::AppState;
use crate::context::{CompanyContext, PrincipalContext};
use crate::errors;

pub fn router() -> Router {
    Router::new()
        .route("/grants", post(set_grant))
        .route("/module-overrides", post(set_module_override))
        .route("/company-modules", post(set_company_module))
}

/// Admins mutate their own company; super-admins mutate any.
fn authorize_company_scope(
    principal: &PrincipalContext,
    company: &CompanyContext,
    target: CompanyId,
) -> Result<(), axum::response::Response> {
    let role = principal.role();
    if role.is_super_admin() {
        return Ok(());
    }
    if role.as_str() != roles::ADMIN {
        return Err(errors::json_error(
            StatusCode::FORBIDDEN,
            "authorization_violation",
            "only admins may change access settings",
        ));
    }
    if company.company_id() != Some(target) {
        return Err(errors::json_error(
            StatusCode::FORBIDDEN,
            "authorization_violation",
            "admins may only change settings within their own company",
        ));
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
struct SetGrantBody {
    user_id: UserId,
    permission_id: PermissionId,
    company_id: CompanyId,
    is_granted: bool,
    expires_at: Option<DateTime<Utc>>,
}

/// POST /admin/grants - Upsert an explicit grant or denial.
async fn set_grant(
    Extension(state): Extension<Arc<AppState>>,
    Extension(principal): Extension<PrincipalContext>,
    Extension(company): Extension<CompanyContext>,
    Json(body): Json<SetGrantBody>,
) -> axum::response::Response {
    if let Err(response) = authorize_company_scope(&principal, &company, body.company_id) {
        return response;
    }

    let grant = UserPermissionGrant {
        user_id: body.user_id,
        permission_id: body.permission_id,
        company_id: body.company_id,
        is_granted: body.is_granted,
        granted_by: principal.user_id(),
        expires_at: body.expires_at,
    };
    match state.service.set_permission_grant(grant).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => errors::access_error_to_response(err),
    }
}

#[derive(Debug, Deserialize)]
struct SetModuleOverrideBody {
    user_id: UserId,
    company_id: CompanyId,
    module_id: ModuleId,
    is_enabled: bool,
}

/// POST /admin/module-overrides - Upsert a per-user module enable/disable.
async fn set_module_override(
    Extension(state): Extension<Arc<AppState>>,
    Extension(principal): Extension<PrincipalContext>,
    Extension(company): Extension<CompanyContext>,
    Json(body): Json<SetModuleOverrideBody>,
) -> axum::response::Response {
    if let Err(response) = authorize_company_scope(&principal, &company, body.company_id) {
        return response;
    }

    let module_override = UserModuleOverride {
        user_id: body.user_id,
        company_id: body.company_id,
        module_id: body.module_id,
        is_enabled: body.is_enabled,
    };
    match state.service.set_module_override(module_override).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => errors::access_error_to_response(err),
    }
}

#[derive(Debug, Deserialize)]
struct SetCompanyModuleBody {
    company_id: CompanyId,
    module_id: ModuleId,
    is_enabled: bool,
    #[serde(default)]
    is_locked_by_system: bool,
}

/// POST /admin/company-modules - Upsert a company-level module setting.
/// Only super-admins may set the system lock.
async fn set_company_module(
    Extension(state): Extension<Arc<AppState>>,
    Extension(principal): Extension<PrincipalContext>,
    Extension(company): Extension<CompanyContext>,
    Json(body): Json<SetCompanyModuleBody>,
) -> axum::response::Response {
    if let Err(response) = authorize_company_scope(&principal, &company, body.company_id) {
        return response;
    }
    if body.is_locked_by_system && !principal.role().is_super_admin() {
        return errors::json_error(
            StatusCode::FORBIDDEN,
            "authorization_violation",
            "only super-admins may lock a module",
        );
    }

    let setting = CompanyModuleSetting {
        company_id: body.company_id,
        module_id: body.module_id,
        is_enabled: body.is_enabled,
        is_locked_by_system: body.is_locked_by_system,
    };
    match state.service.set_company_module(setting).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => errors::access_error_to_response(err),
    }
}
