//! Module catalog: the static set of system modules plus a company's
//! per-module enablement/lock flags.
//!
//! Raw store rows are normalized here into fixed lookup maps, so resolver
//! logic never sees duplicate rows or has to probe row shapes.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use spendgate_core::{CompanyId, ModuleId, Role};

/// Kind of a system module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModuleType {
    /// Baseline module every company ships with; always locked visible.
    Core,
    /// Elevated module reserved for administrative roles.
    Super,
    /// Optional module companies opt into.
    AddOn,
}

impl core::fmt::Display for ModuleType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ModuleType::Core => f.write_str("core"),
            ModuleType::Super => f.write_str("super"),
            ModuleType::AddOn => f.write_str("add-on"),
        }
    }
}

/// Static reference record for one system module.
///
/// Loaded once per session and cached indefinitely; never mutated at runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemModule {
    pub id: ModuleId,
    pub name: String,
    pub module_type: ModuleType,
    pub category: Option<String>,
    /// `None` or empty means "all roles".
    pub allowed_roles: Option<Vec<Role>>,
}

impl SystemModule {
    /// Role eligibility check. An absent or empty `allowed_roles` admits
    /// every role; a non-empty list is a hard allowlist.
    pub fn role_eligible(&self, role: &Role) -> bool {
        match &self.allowed_roles {
            None => true,
            Some(allowed) if allowed.is_empty() => true,
            Some(allowed) => allowed.contains(role),
        }
    }
}

/// Per-company enablement row for one module.
///
/// Never hard-deleted; disabling a module sets `is_enabled = false`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyModuleSetting {
    pub company_id: CompanyId,
    pub module_id: ModuleId,
    pub is_enabled: bool,
    /// Forces visibility regardless of company preference.
    pub is_locked_by_system: bool,
}

/// Normalized, per-company view of the module catalog.
///
/// Duplicate rows are collapsed (first occurrence wins) so downstream logic
/// works on exactly one record per module.
#[derive(Debug, Clone, Default)]
pub struct ModuleCatalog {
    modules: Vec<SystemModule>,
    by_id: HashMap<ModuleId, usize>,
    by_name: HashMap<String, ModuleId>,
    settings: HashMap<ModuleId, CompanyModuleSetting>,
}

impl ModuleCatalog {
    pub fn new(modules: Vec<SystemModule>, settings: Vec<CompanyModuleSetting>) -> Self {
        let mut catalog = Self::default();
        for module in modules {
            if catalog.by_id.contains_key(&module.id) {
                continue;
            }
            catalog.by_id.insert(module.id, catalog.modules.len());
            catalog.by_name.entry(module.name.clone()).or_insert(module.id);
            catalog.modules.push(module);
        }
        for setting in settings {
            catalog.settings.entry(setting.module_id).or_insert(setting);
        }
        catalog
    }

    pub fn modules(&self) -> &[SystemModule] {
        &self.modules
    }

    pub fn module(&self, id: ModuleId) -> Option<&SystemModule> {
        self.by_id.get(&id).map(|ix| &self.modules[*ix])
    }

    pub fn module_by_name(&self, name: &str) -> Option<&SystemModule> {
        self.by_name.get(name).and_then(|id| self.module(*id))
    }

    pub fn setting(&self, module_id: ModuleId) -> Option<&CompanyModuleSetting> {
        self.settings.get(&module_id)
    }

    /// Company-layer enablement: the setting row, with the system lock
    /// forcing `true`. A missing row means "not enabled".
    pub fn company_enabled(&self, module_id: ModuleId) -> bool {
        match self.settings.get(&module_id) {
            Some(s) => s.is_enabled || s.is_locked_by_system,
            None => false,
        }
    }

    /// Whether a module is locked visible: core modules are always locked,
    /// otherwise the company setting's system lock decides.
    pub fn is_locked(&self, module_id: ModuleId) -> bool {
        if let Some(module) = self.module(module_id) {
            if module.module_type == ModuleType::Core {
                return true;
            }
        }
        self.settings
            .get(&module_id)
            .is_some_and(|s| s.is_locked_by_system)
    }

    /// Company-level access check by module name.
    ///
    /// Unknown module names resolve to `false` (fail closed).
    pub fn company_module_access(&self, module_name: &str) -> bool {
        match self.module_by_name(module_name) {
            Some(module) => self.company_enabled(module.id),
            None => false,
        }
    }
}
