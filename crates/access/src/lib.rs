//! `spendgate-access` — permission & module access resolution engine.
//!
//! This crate is intentionally decoupled from HTTP and storage: the resolvers
//! are pure functions over a snapshot of policy data, and the only IO seam is
//! the [`AccessStore`] trait implemented by infrastructure adapters.

pub mod catalog;
pub mod context;
pub mod error;
pub mod grants;
pub mod modules;
pub mod resolver;
pub mod store;

pub use catalog::{CompanyModuleSetting, ModuleCatalog, ModuleType, SystemModule};
pub use context::AccessContext;
pub use error::{AccessError, AccessResult};
pub use grants::{
    PermissionCatalog, PermissionRecord, RolePermissionDefault, UserModuleOverride,
    UserPermissionGrant,
};
pub use modules::{resolve_user_modules, ModuleAccess, ModuleQuery};
pub use resolver::{
    check_multiple_permissions, check_permission, has_all, has_any, DecisionSource,
    PermissionDecision,
};
pub use store::{AccessSnapshot, AccessStore, StoreError, StoreResult};
