use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{request::Parts, StatusCode},
};
use tracing::warn;
use uuid::Uuid;

use super::claims::{Claims, Role};
use super::jwt::JwtKeys;

/// Extracts and validates the bearer token, yielding the acting user's ID.
pub struct AuthUser(pub Uuid);

/// Same as [`AuthUser`] but additionally requires the ADMIN role.
pub struct AdminUser(pub Uuid);

fn bearer_claims<S>(parts: &Parts, state: &S) -> Result<Claims, (StatusCode, String)>
where
    JwtKeys: FromRef<S>,
{
    let keys = JwtKeys::from_ref(state);
    let auth = parts
        .headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or((
            StatusCode::UNAUTHORIZED,
            "Missing Authorization header".to_string(),
        ))?;

    let token = auth
        .strip_prefix("Bearer ")
        .or_else(|| auth.strip_prefix("bearer "))
        .ok_or((
            StatusCode::UNAUTHORIZED,
            "Invalid Authorization header".to_string(),
        ))?;

    keys.verify(token).map_err(|_| {
        warn!("invalid or expired token");
        (
            StatusCode::UNAUTHORIZED,
            "Invalid or expired token".to_string(),
        )
    })
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = (StatusCode, String);

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let claims = bearer_claims(parts, state)?;
        Ok(AuthUser(claims.sub))
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = (StatusCode, String);

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let claims = bearer_claims(parts, state)?;
        if claims.role != Role::Admin {
            return Err((StatusCode::FORBIDDEN, "Admin access required".to_string()));
        }
        Ok(AdminUser(claims.sub))
    }
}
