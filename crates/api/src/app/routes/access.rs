//! Permission and module resolution endpoints.
//!
//! A denied permission is an ordinary 200 with `granted: false`; only
//! authorization violations and store loss map to error statuses.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use spendgate_access::{has_all, has_any, ModuleQuery, ModuleType};
use spendgate_core::{CompanyId, PermissionKey};

use crate::app::AppState;
use crate::context::{CompanyContext, PrincipalContext};
use crate::errors;

pub fn router() -> Router {
    Router::new()
        .route("/permissions/check", get(check_one).post(check_many))
        .route("/modules", get(list_modules))
        .route("/companies/:company_id/modules/:module_name", get(company_module))
}

#[derive(Debug, Deserialize)]
struct CheckOneQuery {
    key: String,
}

/// GET /access/permissions/check?key=expenses.approve
async fn check_one(
    Extension(state): Extension<Arc<AppState>>,
    Extension(principal): Extension<PrincipalContext>,
    Extension(company): Extension<CompanyContext>,
    Query(query): Query<CheckOneQuery>,
) -> axum::response::Response {
    let ctx = principal.access_context(&company);
    let decision = state
        .service
        .check_permission(&ctx, &PermissionKey::new(query.key))
        .await;
    (StatusCode::OK, Json(decision)).into_response()
}

#[derive(Debug, Deserialize)]
struct CheckManyBody {
    keys: Vec<String>,
}

/// POST /access/permissions/check - Batch check; partial results, never 500s
/// for a missing key.
async fn check_many(
    Extension(state): Extension<Arc<AppState>>,
    Extension(principal): Extension<PrincipalContext>,
    Extension(company): Extension<CompanyContext>,
    Json(body): Json<CheckManyBody>,
) -> axum::response::Response {
    let ctx = principal.access_context(&company);
    let keys: Vec<PermissionKey> = body.keys.into_iter().map(PermissionKey::new).collect();
    let decisions = state.service.check_permissions(&ctx, &keys).await;

    let response = serde_json::json!({
        "has_any": has_any(&decisions),
        "has_all": has_all(&decisions),
        "decisions": decisions,
    });
    (StatusCode::OK, Json(response)).into_response()
}

#[derive(Debug, Deserialize)]
struct ListModulesQuery {
    #[serde(default)]
    include_disabled: bool,
    module_type: Option<String>,
    category: Option<String>,
}

/// GET /access/modules - Effective module list for the caller.
async fn list_modules(
    Extension(state): Extension<Arc<AppState>>,
    Extension(principal): Extension<PrincipalContext>,
    Extension(company): Extension<CompanyContext>,
    Query(query): Query<ListModulesQuery>,
) -> axum::response::Response {
    let filter_by_type = match query.module_type.as_deref() {
        None => None,
        Some(raw) => match parse_module_type(raw) {
            Ok(t) => Some(t),
            Err(response) => return response,
        },
    };

    let ctx = principal.access_context(&company);
    let modules = state
        .service
        .get_user_modules(
            &ctx,
            &ModuleQuery {
                include_disabled: query.include_disabled,
                filter_by_type,
                filter_by_category: query.category,
            },
        )
        .await;

    (StatusCode::OK, Json(serde_json::json!({ "modules": modules }))).into_response()
}

/// GET /access/companies/:company_id/modules/:module_name - Company-level
/// module check. Callers may only ask about their own company unless they
/// are super-admins.
async fn company_module(
    Extension(state): Extension<Arc<AppState>>,
    Extension(principal): Extension<PrincipalContext>,
    Extension(company): Extension<CompanyContext>,
    Path((company_id, module_name)): Path<(CompanyId, String)>,
) -> axum::response::Response {
    if !principal.role().is_super_admin() && company.company_id() != Some(company_id) {
        return errors::json_error(
            StatusCode::FORBIDDEN,
            "authorization_violation",
            "cannot inspect another company's modules",
        );
    }

    let has_access = state
        .service
        .check_company_module_access(company_id, &module_name)
        .await;
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "module_name": module_name,
            "has_access": has_access,
        })),
    )
        .into_response()
}

fn parse_module_type(raw: &str) -> Result<ModuleType, axum::response::Response> {
    match raw {
        "core" => Ok(ModuleType::Core),
        "super" => Ok(ModuleType::Super),
        "add-on" => Ok(ModuleType::AddOn),
        _ => Err(errors::json_error(
            StatusCode::BAD_REQUEST,
            "invalid_module_type",
            "module_type must be one of: core, super, add-on",
        )),
    }
}
