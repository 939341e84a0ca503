//! Menu composition and preference endpoints.

use std::sync::Arc;

use axum::{
    extract::{Extension, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, put},
    Json, Router,
};
use serde::Deserialize;

use spendgate_menu::{normalize_preference_document, MenuMode};

use crate::app::AppState;
use crate::context::{CompanyContext, PrincipalContext};
use crate::errors;

pub fn router() -> Router {
    Router::new()
        .route("/", get(compose))
        .route("/preferences", put(save_preferences))
}

#[derive(Debug, Deserialize)]
struct ComposeQuery {
    mode: Option<String>,
}

/// GET /menu?mode=display|editable - Composed menu for the caller.
async fn compose(
    Extension(state): Extension<Arc<AppState>>,
    Extension(principal): Extension<PrincipalContext>,
    Extension(company): Extension<CompanyContext>,
    Query(query): Query<ComposeQuery>,
) -> axum::response::Response {
    let mode = match query.mode.as_deref() {
        None | Some("display") => MenuMode::Display,
        Some("editable") => MenuMode::Editable,
        Some(_) => {
            return errors::json_error(
                StatusCode::BAD_REQUEST,
                "invalid_mode",
                "mode must be one of: display, editable",
            );
        }
    };

    let ctx = principal.access_context(&company);
    let items = state.service.compose_menu(&ctx, &state.menu, mode).await;
    (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
}

#[derive(Debug, Deserialize)]
struct SavePreferencesBody {
    /// Accepted in either the current `{item_id, is_hidden}` shape or the
    /// legacy bare-id shape; normalized before persisting.
    preferences: serde_json::Value,
}

/// PUT /menu/preferences - Replace the caller's order/hidden overlay.
async fn save_preferences(
    Extension(state): Extension<Arc<AppState>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<SavePreferencesBody>,
) -> axum::response::Response {
    let preferences = normalize_preference_document(&body.preferences);
    match state
        .service
        .save_preferences(principal.user_id(), preferences)
        .await
    {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => errors::access_error_to_response(err),
    }
}
