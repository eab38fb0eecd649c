//! Principal extraction from request headers.
//!
//! Authentication itself (sessions, JWT validation) is an external
//! collaborator in front of this service; by the time a request arrives
//! here the identity headers are trusted. The extractor only translates
//! them into an explicit [`Principal`] value that handlers pass down —
//! nothing below the HTTP layer reads request state.

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use crate::domain::foundation::{TenantId, UserId};
use crate::domain::tenancy::{Principal, Role};

use super::ErrorResponse;

/// Header carrying the authenticated subject.
const USER_ID_HEADER: &str = "x-user-id";

/// Header carrying the principal's tenant id, absent for platform
/// accounts.
const TENANT_ID_HEADER: &str = "x-tenant-id";

/// Header carrying the principal's role.
const ROLE_HEADER: &str = "x-role";

/// Extractor producing the acting [`Principal`] for a request.
#[derive(Debug, Clone)]
pub struct RequestPrincipal(pub Principal);

/// Rejection for missing or malformed identity headers.
pub struct PrincipalRejection;

impl IntoResponse for PrincipalRejection {
    fn into_response(self) -> axum::response::Response {
        let error = ErrorResponse::new("AUTHENTICATION_REQUIRED", "Authentication is required");
        (StatusCode::UNAUTHORIZED, Json(error)).into_response()
    }
}

fn parse_role(raw: &str) -> Option<Role> {
    match raw {
        "super_admin" => Some(Role::SuperAdmin),
        "reseller" => Some(Role::Reseller),
        "technician" => Some(Role::Technician),
        "customer" => Some(Role::Customer),
        _ => None,
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for RequestPrincipal
where
    S: Send + Sync,
{
    type Rejection = PrincipalRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| UserId::new(s).ok())
            .ok_or(PrincipalRejection)?;

        let role = parts
            .headers
            .get(ROLE_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_role)
            .ok_or(PrincipalRejection)?;

        let tenant = match parts.headers.get(TENANT_ID_HEADER) {
            None => None,
            Some(value) => {
                let id = value
                    .to_str()
                    .ok()
                    .and_then(|s| s.parse::<i64>().ok())
                    .and_then(|n| TenantId::new(n).ok())
                    .ok_or(PrincipalRejection)?;
                Some(id)
            }
        };

        Ok(RequestPrincipal(Principal::new(user_id, tenant, role)))
    }
}
