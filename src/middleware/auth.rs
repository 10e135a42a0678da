use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use std::sync::Arc;

use crate::{
    db::CacheKey,
    error::AppError,
    messages,
    models::User,
    routes::AppState,
    services::auth::{bearer_token, Claims, TokenScope},
};

/// Raw bearer token from the `Authorization` header, not yet verified
#[derive(Debug, Clone)]
pub struct BearerToken(pub String);

#[axum::async_trait]
impl<S: Send + Sync> FromRequestParts<S> for BearerToken {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(bearer_token)
            .map(|token| BearerToken(token.to_string()))
            .ok_or_else(|| AppError::Unauthorized(messages::NOT_VALIDATE_CREDENTIALS.to_string()))
    }
}

/// The authenticated account behind an access token
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user: User,
    pub claims: Claims,
}

#[axum::async_trait]
impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let BearerToken(token) = BearerToken::from_request_parts(parts, state).await?;
        let claims = state.auth.decode(&token, TokenScope::AccessToken)?;

        if state
            .cache
            .exists(&CacheKey::Blacklist(claims.jti.clone()))
            .await?
        {
            tracing::debug!(jti = %claims.jti, "Rejected revoked token");
            return Err(AppError::Unauthorized(messages::TOKEN_BLACKLISTED.to_string()));
        }

        let user = state.load_user(&claims.sub).await?;
        if !user.is_active {
            return Err(AppError::Unauthorized(messages::USER_NOT_ACTIVE.to_string()));
        }

        Ok(CurrentUser { user, claims })
    }
}
