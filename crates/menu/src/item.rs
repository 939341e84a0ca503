//! Static menu tree and the composed output node.

use serde::{Deserialize, Serialize};

use spendgate_core::{ModuleId, PermissionKey, Role};

/// One node of the static declarative menu tree.
///
/// Leaves usually carry a `path`, parents usually carry `children`. The
/// association with a system module is an explicit `module_id`, never a
/// label match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItem {
    pub id: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module_id: Option<ModuleId>,
    /// Legacy role gate for nodes not yet migrated to permission checks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_roles: Option<Vec<Role>>,
    /// The user must hold at least one of these to see the node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_permissions: Option<Vec<PermissionKey>>,
    /// Node only makes sense inside a company scope.
    #[serde(default)]
    pub company_required: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<MenuItem>,
}

impl MenuItem {
    /// Leaf constructor; the builder-ish setters below cover the rest.
    pub fn leaf(id: impl Into<String>, label: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            path: Some(path.into()),
            module_id: None,
            required_roles: None,
            required_permissions: None,
            company_required: false,
            children: Vec::new(),
        }
    }

    pub fn group(id: impl Into<String>, label: impl Into<String>, children: Vec<MenuItem>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            path: None,
            module_id: None,
            required_roles: None,
            required_permissions: None,
            company_required: false,
            children,
        }
    }

    pub fn with_module(mut self, module_id: ModuleId) -> Self {
        self.module_id = Some(module_id);
        self
    }

    pub fn with_required_permissions(mut self, keys: Vec<PermissionKey>) -> Self {
        self.required_permissions = Some(keys);
        self
    }

    pub fn with_required_roles(mut self, roles: Vec<Role>) -> Self {
        self.required_roles = Some(roles);
        self
    }

    pub fn company_required(mut self) -> Self {
        self.company_required = true;
        self
    }
}

/// Which view the composer produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MenuMode {
    /// Hidden items are pruned (unless locked).
    Display,
    /// Hidden items are retained and flagged so they can be re-enabled.
    Editable,
}

/// Output node: the static item annotated with the resolved flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComposedMenuItem {
    pub id: String,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module_id: Option<ModuleId>,
    /// Locked visible: core module or company setting locked by the system.
    pub is_locked: bool,
    /// The user's saved hidden flag (meaningful in editable mode; a hidden
    /// unlocked node never survives display mode).
    pub is_hidden: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ComposedMenuItem>,
}
