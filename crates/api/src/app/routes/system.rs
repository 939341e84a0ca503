use axum::{extract::Extension, routing::get, Json, Router};

use crate::context::{CompanyContext, PrincipalContext};

pub fn router() -> Router {
    Router::new().route("/whoami", get(whoami))
}

/// GET /whoami - Echo the resolved identity (useful for gateway debugging).
async fn whoami(
    Extension(principal): Extension<PrincipalContext>,
    Extension(company): Extension<CompanyContext>,
) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "user_id": principal.user_id(),
        "role": principal.role(),
        "company_id": company.company_id(),
    }))
}
