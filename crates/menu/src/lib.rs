//! `spendgate-menu` — menu composition over resolved access state.
//!
//! Reconciles a static declarative menu tree, the dynamic module/permission
//! state resolved by `spendgate-access`, and the user's saved order/hidden
//! preferences into a pruned, ordered tree. Two views come out of the same
//! inputs: `display` (hidden items removed) and `editable` (hidden items
//! retained but flagged, so the preference UI can offer re-enabling).

pub mod compose;
pub mod item;
pub mod preferences;

pub use compose::{compose_menu, required_permission_keys, MenuAccessView};
pub use item::{ComposedMenuItem, MenuItem, MenuMode};
pub use preferences::{normalize_preference_document, MenuItemPreference, PreferenceStore};
