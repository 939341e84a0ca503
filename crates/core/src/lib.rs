//! `spendgate-core` — domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod error;
pub mod id;
pub mod permission;
pub mod role;

pub use error::{DomainError, DomainResult};
pub use id::{CompanyId, ModuleId, PermissionId, UserId};
pub use permission::PermissionKey;
pub use role::Role;
