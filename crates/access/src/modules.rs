//! Module access resolution.
//!
//! Computes the effective module list for a user by layering, in order:
//! role eligibility (hard stop), company enablement, user override, system
//! lock. A user-level disable is an intentional admin restriction and wins
//! over the company layer, lock included; the menu composer separately keeps
//! locked *entry points* visible.

use serde::Serialize;

use spendgate_core::Role;

use crate::catalog::{ModuleCatalog, ModuleType, SystemModule};
use crate::grants::UserModuleOverride;

/// A system module annotated with the user's effective state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleAccess {
    #[serde(flatten)]
    pub module: SystemModule,
    pub is_enabled: bool,
    pub has_access: bool,
}

/// Filters for [`resolve_user_modules`].
#[derive(Debug, Clone, Default)]
pub struct ModuleQuery {
    /// Include modules the user cannot currently use (role-ineligible
    /// modules are still never returned).
    pub include_disabled: bool,
    pub filter_by_type: Option<ModuleType>,
    pub filter_by_category: Option<String>,
}

/// Resolve the effective module list for one user.
///
/// Super-admins bypass company and user gating entirely and see every
/// role-eligible module as enabled.
pub fn resolve_user_modules(
    role: &Role,
    catalog: &ModuleCatalog,
    overrides: &[UserModuleOverride],
    query: &ModuleQuery,
) -> Vec<ModuleAccess> {
    catalog
        .modules()
        .iter()
        .filter(|module| module.role_eligible(role))
        .filter(|module| {
            query
                .filter_by_type
                .is_none_or(|t| module.module_type == t)
        })
        .filter(|module| {
            query
                .filter_by_category
                .as_deref()
                .is_none_or(|c| module.category.as_deref() == Some(c))
        })
        .map(|module| {
            let is_enabled = effective_enablement(role, catalog, overrides, module);
            ModuleAccess {
                module: module.clone(),
                is_enabled,
                // Role eligibility already passed; access tracks enablement.
                has_access: is_enabled,
            }
        })
        .filter(|access| query.include_disabled || (access.has_access && access.is_enabled))
        .collect()
}

fn effective_enablement(
    role: &Role,
    catalog: &ModuleCatalog,
    overrides: &[UserModuleOverride],
    module: &SystemModule,
) -> bool {
    if role.is_super_admin() {
        return true;
    }

    let company_enabled = catalog.company_enabled(module.id);

    match overrides.iter().find(|o| o.module_id == module.id) {
        // Disable always wins, lock included: data-level access honors the
        // explicit per-user restriction.
        Some(o) if !o.is_enabled => false,
        // Enable only re-affirms what the company layer already allows.
        Some(_) => company_enabled,
        None => company_enabled,
    }
}
