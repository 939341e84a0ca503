use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use spendgate_access::AccessError;

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

/// Map engine errors onto the wire.
///
/// An authorization *violation* is a 403 with its own code, distinct from
/// a `granted=false` decision, which is a 200.
pub fn access_error_to_response(err: AccessError) -> axum::response::Response {
    match err {
        AccessError::Authorization(msg) => {
            json_error(StatusCode::FORBIDDEN, "authorization_violation", msg)
        }
        AccessError::Store(e) => {
            json_error(StatusCode::BAD_GATEWAY, "store_error", e.to_string())
        }
    }
}
