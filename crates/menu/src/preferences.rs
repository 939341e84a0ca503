//! User menu preferences: ordering overlay plus per-item hidden flags.
//!
//! Stored as one JSON document per user by the external store. List order IS
//! the user's desired top-level order; an id absent from the list means
//! "default position, not hidden".

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use spendgate_access::StoreResult;
use spendgate_core::UserId;

/// One preference entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItemPreference {
    pub item_id: String,
    #[serde(default)]
    pub is_hidden: bool,
}

impl MenuItemPreference {
    pub fn visible(item_id: impl Into<String>) -> Self {
        Self {
            item_id: item_id.into(),
            is_hidden: false,
        }
    }

    pub fn hidden(item_id: impl Into<String>) -> Self {
        Self {
            item_id: item_id.into(),
            is_hidden: true,
        }
    }
}

/// Normalize a stored preference document.
///
/// Legacy documents were a bare list of item ids; current documents are a
/// list of `{item_id, is_hidden}` objects. Entries that match neither shape
/// are dropped (conservative default: default position, not hidden), and a
/// document that is not a list at all normalizes to the empty overlay.
/// Preference damage must never stop a menu from rendering.
pub fn normalize_preference_document(document: &serde_json::Value) -> Vec<MenuItemPreference> {
    let Some(entries) = document.as_array() else {
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(|entry| match entry {
            serde_json::Value::String(id) => Some(MenuItemPreference::visible(id.clone())),
            serde_json::Value::Object(_) => {
                serde_json::from_value::<MenuItemPreference>(entry.clone()).ok()
            }
            _ => None,
        })
        .collect()
}

/// Persistence adapter for the per-user preference document.
#[async_trait]
pub trait PreferenceStore: Send + Sync {
    async fn load_preferences(&self, user_id: UserId) -> StoreResult<Vec<MenuItemPreference>>;

    async fn save_preferences(
        &self,
        user_id: UserId,
        preferences: Vec<MenuItemPreference>,
    ) -> StoreResult<()>;
}

#[async_trait]
impl<P> PreferenceStore for Arc<P>
where
    P: PreferenceStore + ?Sized,
{
    async fn load_preferences(&self, user_id: UserId) -> StoreResult<Vec<MenuItemPreference>> {
        (**self).load_preferences(user_id).await
    }

    async fn save_preferences(
        &self,
        user_id: UserId,
        preferences: Vec<MenuItemPreference>,
    ) -> StoreResult<()> {
        (**self).save_preferences(user_id, preferences).await
    }
}
