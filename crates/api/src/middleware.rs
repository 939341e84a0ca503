//! Identity extraction.
//!
//! Authentication itself is an external collaborator: the gateway validates
//! the session and forwards the identity as trusted headers. This middleware
//! only parses them into typed request contexts.

use core::str::FromStr;

use axum::{
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};

use spendgate_core::{CompanyId, Role, UserId};

use crate::context::{CompanyContext, PrincipalContext};

pub const USER_HEADER: &str = "x-user-id";
pub const ROLE_HEADER: &str = "x-user-role";
pub const COMPANY_HEADER: &str = "x-company-id";

pub async fn identity_middleware(
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let headers = req.headers();

    let user_id = header_value(headers, USER_HEADER)?
        .parse::<UserId>()
        .map_err(|_| StatusCode::UNAUTHORIZED)?;

    let role = header_value(headers, ROLE_HEADER)?;
    if role.is_empty() {
        return Err(StatusCode::UNAUTHORIZED);
    }
    let role = Role::new(role.to_string());

    let company_id = match headers.get(COMPANY_HEADER) {
        Some(raw) => {
            let raw = raw.to_str().map_err(|_| StatusCode::UNAUTHORIZED)?;
            Some(CompanyId::from_str(raw).map_err(|_| StatusCode::UNAUTHORIZED)?)
        }
        None => None,
    };

    req.extensions_mut()
        .insert(PrincipalContext::new(user_id, role));
    req.extensions_mut().insert(CompanyContext::new(company_id));

    Ok(next.run(req).await)
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Result<&'a str, StatusCode> {
    headers
        .get(name)
        .ok_or(StatusCode::UNAUTHORIZED)?
        .to_str()
        .map_err(|_| StatusCode::UNAUTHORIZED)
}
