//! Caller identity. Authentication happens at the gateway, which forwards the
//! verified user id and role as headers; this service trusts them.

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::http::ApiError;
use crate::limits::MAX_USER_ID_LEN;
use crate::model::{Requester, Role};

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

/// Resolve a role header value. Absent means `student`.
pub fn parse_role(value: Option<&str>) -> Result<Role, ApiError> {
    match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
        None | Some("") | Some("student") => Ok(Role::Student),
        Some("admin") => Ok(Role::Admin),
        Some(_) => Err(ApiError::Unauthorized("unknown role")),
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Requester {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or(ApiError::Unauthorized("authentication required"))?;
        if id.len() > MAX_USER_ID_LEN {
            return Err(ApiError::Unauthorized("user id too long"));
        }
        let role = parse_role(
            parts
                .headers
                .get(USER_ROLE_HEADER)
                .and_then(|v| v.to_str().ok()),
        )?;
        Ok(Requester::new(id, role))
    }
}
