//! The composition engine: reorder, annotate, filter.
//!
//! Pure over its inputs. The caller resolves permissions up front (one batch
//! check over [`required_permission_keys`]) and passes the granted set in, so
//! composition itself never performs IO and can be run once per view mode
//! on the same fetched state.

use std::collections::{HashMap, HashSet};

use spendgate_access::{ModuleCatalog, UserModuleOverride};
use spendgate_core::{CompanyId, PermissionKey, Role};

use crate::item::{ComposedMenuItem, MenuItem, MenuMode};
use crate::preferences::MenuItemPreference;

/// Resolved access state the composer filters against.
#[derive(Debug, Clone, Copy)]
pub struct MenuAccessView<'a> {
    pub role: &'a Role,
    pub company_id: Option<CompanyId>,
    pub catalog: &'a ModuleCatalog,
    pub overrides: &'a [UserModuleOverride],
    /// Keys the user holds, out of everything the tree requires.
    pub granted: &'a HashSet<PermissionKey>,
}

/// Every permission key any node of the tree requires, deduplicated in
/// first-seen order. Callers batch-check these once per composition.
pub fn required_permission_keys(tree: &[MenuItem]) -> Vec<PermissionKey> {
    let mut seen = HashSet::new();
    let mut keys = Vec::new();
    collect_keys(tree, &mut seen, &mut keys);
    keys
}

fn collect_keys(items: &[MenuItem], seen: &mut HashSet<PermissionKey>, out: &mut Vec<PermissionKey>) {
    for item in items {
        if let Some(required) = &item.required_permissions {
            for key in required {
                if seen.insert(key.clone()) {
                    out.push(key.clone());
                }
            }
        }
        collect_keys(&item.children, seen, out);
    }
}

/// Compose the final menu for one view mode.
///
/// Top-level siblings are emitted in preference order first (ids unknown to
/// the default tree are skipped, duplicates collapse), then the unlisted
/// defaults in their original order. Children keep the static order.
pub fn compose_menu(
    tree: &[MenuItem],
    view: &MenuAccessView<'_>,
    preferences: &[MenuItemPreference],
    mode: MenuMode,
) -> Vec<ComposedMenuItem> {
    let hidden: HashMap<&str, bool> = preferences
        .iter()
        .map(|p| (p.item_id.as_str(), p.is_hidden))
        .collect();

    reorder_top_level(tree, preferences)
        .into_iter()
        .filter_map(|item| filter_item(item, view, &hidden, mode))
        .collect()
}

fn reorder_top_level<'a>(
    tree: &'a [MenuItem],
    preferences: &[MenuItemPreference],
) -> Vec<&'a MenuItem> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut ordered = Vec::with_capacity(tree.len());

    for pref in preferences {
        if seen.contains(pref.item_id.as_str()) {
            continue;
        }
        if let Some(item) = tree.iter().find(|i| i.id == pref.item_id) {
            seen.insert(item.id.as_str());
            ordered.push(item);
        }
    }
    for item in tree {
        if !seen.contains(item.id.as_str()) {
            ordered.push(item);
        }
    }
    ordered
}

/// Recursive prune. `None` means the node (and its subtree) is gone from
/// this view. Lookup misses degrade to the conservative default for that
/// axis; composition never fails, it only shows less.
fn filter_item(
    item: &MenuItem,
    view: &MenuAccessView<'_>,
    hidden: &HashMap<&str, bool>,
    mode: MenuMode,
) -> Option<ComposedMenuItem> {
    let is_hidden = hidden.get(item.id.as_str()).copied().unwrap_or(false);
    let is_locked = item
        .module_id
        .is_some_and(|module_id| view.catalog.is_locked(module_id));

    if let Some(module_id) = item.module_id {
        // Navigable node in company scope: company must have the module
        // enabled. A lock forces visibility over the company layer, so a
        // locked node passes even without an enabled setting row.
        // Super-admins skip this gate entirely.
        if item.path.is_some()
            && view.company_id.is_some()
            && !view.role.is_super_admin()
            && !view.catalog.company_enabled(module_id)
            && !is_locked
        {
            return None;
        }

        // Explicit per-user disable hides the node, except a locked entry
        // point stays visible (lock wins for menu visibility only; module
        // access still honors the disable).
        if !is_locked
            && view
                .overrides
                .iter()
                .any(|o| o.module_id == module_id && !o.is_enabled)
        {
            return None;
        }

        // Module role allowlist. An unknown module_id stays eligible.
        if let Some(module) = view.catalog.module(module_id) {
            if !module.role_eligible(view.role) {
                return None;
            }
        }
    }

    // Hidden-by-preference only prunes the display view, and never a locked
    // node; the editable view keeps it so the user can re-enable it.
    if mode == MenuMode::Display && is_hidden && !is_locked {
        return None;
    }

    if item.company_required && view.company_id.is_none() {
        return None;
    }

    if let Some(required) = &item.required_permissions {
        if !required.is_empty() && !required.iter().any(|k| view.granted.contains(k)) {
            return None;
        }
    }

    if let Some(required) = &item.required_roles {
        if !required.is_empty() && !required.contains(view.role) {
            return None;
        }
    }

    let children: Vec<ComposedMenuItem> = item
        .children
        .iter()
        .filter_map(|child| filter_item(child, view, hidden, mode))
        .collect();
    if !item.children.is_empty() && children.is_empty() {
        return None;
    }

    Some(ComposedMenuItem {
        id: item.id.clone(),
        label: item.label.clone(),
        path: item.path.clone(),
        module_id: item.module_id,
        is_locked,
        is_hidden,
        children,
    })
}
