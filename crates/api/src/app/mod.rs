//! Application wiring: state, router, default menu tree.

use std::sync::Arc;

use axum::{middleware as axum_middleware, Extension, Router};

use spendgate_access::AccessStore;
use spendgate_core::role::roles;
use spendgate_core::{PermissionKey, Role};
use spendgate_infra::AccessService;
use spendgate_menu::{MenuItem, PreferenceStore};

use crate::middleware::identity_middleware;

pub mod routes;

pub type SharedService = AccessService<Arc<dyn AccessStore>, Arc<dyn PreferenceStore>>;

pub struct AppState {
    pub service: SharedService,
    pub menu: Vec<MenuItem>,
}

/// Build the router over any store pair.
///
/// The same router serves production and tests; only the store behind it
/// changes.
pub fn build_app(
    store: Arc<dyn AccessStore>,
    preferences: Arc<dyn PreferenceStore>,
    menu: Vec<MenuItem>,
) -> Router {
    let state = Arc::new(AppState {
        service: AccessService::new(store, preferences),
        menu,
    });

    Router::new()
        .merge(routes::system::router())
        .nest("/access", routes::access::router())
        .nest("/menu", routes::menu::router())
        .nest("/admin", routes::admin::router())
        .layer(axum_middleware::from_fn(identity_middleware))
        .layer(Extension(state))
}

/// The static declarative menu of the expense platform.
///
/// Module associations (`module_id`) are wired from deployment data at
/// startup; the skeleton here carries the permission/role gates.
pub fn default_menu() -> Vec<MenuItem> {
    vec![
        MenuItem::leaf("dashboard", "Dashboard", "/dashboard"),
        MenuItem::leaf("expenses", "Expenses", "/expenses").company_required(),
        MenuItem::leaf("vendors", "Vendors", "/vendors").company_required(),
        MenuItem::group(
            "approvals",
            "Approvals",
            vec![
                MenuItem::leaf("approval-queue", "Approval queue", "/approvals")
                    .with_required_permissions(vec![PermissionKey::new("expenses.approve")]),
                MenuItem::leaf("approval-policies", "Policies", "/approvals/policies")
                    .with_required_permissions(vec![PermissionKey::new("policies.manage")]),
            ],
        ),
        MenuItem::leaf("automations", "Automations", "/automations")
            .company_required()
            .with_required_roles(vec![
                Role::new(roles::ADMIN),
                Role::new(roles::CONTROLLER),
                Role::new(roles::SUPER_ADMIN),
            ]),
        MenuItem::group(
            "admin",
            "Administration",
            vec![
                MenuItem::leaf("admin-users", "Users", "/admin/users")
                    .with_required_permissions(vec![PermissionKey::new("users.manage")]),
                MenuItem::leaf("admin-modules", "Modules", "/admin/modules")
                    .with_required_roles(vec![
                        Role::new(roles::ADMIN),
                        Role::new(roles::SUPER_ADMIN),
                    ]),
            ],
        ),
        MenuItem::leaf("settings", "Settings", "/settings"),
    ]
}
