use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use tracing::debug;

use crate::db::{AccessTokenRepo, DbError};
use crate::error::ApiError;
use crate::server::AppState;

/// The caller, as resolved from a verified bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: String,
    pub token: String,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or_else(ApiError::unauthenticated)
    }
}

/// Rejects the request unless it carries a known, unexpired bearer token.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer(req.headers()).ok_or_else(ApiError::unauthenticated)?;

    let access = match state.db.get_token(&token).await {
        Ok(access) => access,
        Err(DbError::NotFound(_)) => {
            debug!("Unknown access token");
            return Err(ApiError::unauthenticated());
        }
        Err(e) => return Err(e.into()),
    };

    if let Some(ttl) = state.config.auth.token_ttl() {
        if access.is_expired(ttl, chrono::Utc::now()) {
            debug!(user_id = %access.userid, "Access token expired");
            state.db.delete_token(&token).await?;
            return Err(ApiError::Unauthorized("Token expired".to_string()));
        }
    }

    req.extensions_mut().insert(AuthUser {
        user_id: access.userid,
        token,
    });

    Ok(next.run(req).await)
}

/// `Authorization: Bearer <token>`, scheme matched case-insensitively.
pub fn extract_bearer(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    if token.is_empty() {
        return None;
    }
    Some(token.to_string())
}
