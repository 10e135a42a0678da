use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware,
    routing::{get, post},
    Form, Json, Router,
};
use std::sync::Arc;
use validator::Validate;

use crate::{
    db::CacheKey,
    error::{AppError, AppResult},
    messages,
    middleware::{rate_limit::rate_limit_middleware, BearerToken, CurrentUser},
    models::{
        LoginForm, MessageResponse, RequestEmail, SignupRequest, SignupResponse, TokenResponse,
        User, UserResponse,
    },
    repository::users,
    routes::AppState,
    services::auth::{gravatar_url, hash_password, normalize_email, verify_password, TokenScope},
};

/// Auth routes, guarded by the per-client rate limit
pub fn routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/auth/confirmed_email/:token", get(confirmed_email))
        .route("/auth/request_email", post(request_email))
        .route("/auth/refresh_token", get(refresh_token))
        .route_layer(middleware::from_fn_with_state(state, rate_limit_middleware))
}

/// Issues a fresh token pair and stores the refresh token on the account
async fn issue_tokens(state: &AppState, user: &User) -> AppResult<TokenResponse> {
    let access_token = state.auth.create_access_token(&user.email)?;
    let refresh_token = state.auth.create_refresh_token(&user.email)?;

    users::update_refresh_token(&state.db_pool, user.id, Some(&refresh_token)).await?;
    state.invalidate_user(&user.email).await;

    Ok(TokenResponse::bearer(access_token, refresh_token))
}

/// Handler for account registration
pub async fn signup(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SignupRequest>,
) -> AppResult<(StatusCode, Json<SignupResponse>)> {
    body.validate()?;
    let email = normalize_email(&body.email);

    if users::get_user_by_email(&state.db_pool, &email)
        .await?
        .is_some()
    {
        return Err(AppError::Conflict(messages::ALREADY_EXISTS.to_string()));
    }

    let avatar = gravatar_url(&email);
    let password_hash = hash_password(body.password).await?;
    let user = users::create_user(
        &state.db_pool,
        &body.username,
        &email,
        &password_hash,
        Some(&avatar),
    )
    .await?;

    state.send_confirmation(&user.email, &user.username);

    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            user: UserResponse::new(&user, 0),
            detail: messages::SUCCESS_CREATE_USER.to_string(),
        }),
    ))
}

/// Handler for the password login form; `username` carries the email
pub async fn login(
    State(state): State<Arc<AppState>>,
    Form(form): Form<LoginForm>,
) -> AppResult<Json<TokenResponse>> {
    let user = users::get_user_by_email(&state.db_pool, &form.username)
        .await?
        .ok_or_else(|| AppError::Unauthorized(messages::INVALID_EMAIL.to_string()))?;

    if !user.is_active {
        return Err(AppError::Unauthorized(messages::USER_NOT_ACTIVE.to_string()));
    }
    if !user.confirmed_email {
        return Err(AppError::Unauthorized(messages::EMAIL_NOT_CONFIRMED.to_string()));
    }
    if !verify_password(form.password, user.password.clone()).await? {
        tracing::debug!(user_id = user.id, "Login with wrong password");
        return Err(AppError::Unauthorized(messages::INVALID_PASSWORD.to_string()));
    }

    let tokens = issue_tokens(&state, &user).await?;
    tracing::info!(user_id = user.id, "User logged in");

    Ok(Json(tokens))
}

/// Revokes the presented access token and the stored refresh token
pub async fn logout(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
) -> AppResult<Json<MessageResponse>> {
    state
        .cache
        .set_marker(
            &CacheKey::Blacklist(current.claims.jti.clone()),
            current.claims.remaining_secs(),
        )
        .await?;

    users::update_refresh_token(&state.db_pool, current.user.id, None).await?;
    state.invalidate_user(&current.user.email).await;

    tracing::info!(user_id = current.user.id, "User logged out");
    Ok(Json(MessageResponse::new(messages::USER_IS_LOGOUT)))
}

/// Handler for the link sent in the confirmation email
pub async fn confirmed_email(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
) -> AppResult<Json<MessageResponse>> {
    let email = state.auth.email_from_token(&token)?;

    let user = users::get_user_by_email(&state.db_pool, &email)
        .await?
        .ok_or_else(|| AppError::InvalidInput(messages::VERIFICATION_ERROR.to_string()))?;

    if user.confirmed_email {
        return Ok(Json(MessageResponse::new(messages::EMAIL_ALREADY_CONFIRMED)));
    }

    let user = users::confirm_email(&state.db_pool, user.id).await?;
    state.store_user(&user).await;

    tracing::info!(user_id = user.id, "Email confirmed");
    Ok(Json(MessageResponse::new(messages::EMAIL_CONFIRMED)))
}

/// Re-sends the confirmation email
pub async fn request_email(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RequestEmail>,
) -> AppResult<Json<MessageResponse>> {
    body.validate()?;

    let user = users::get_user_by_email(&state.db_pool, &body.email)
        .await?
        .ok_or_else(|| AppError::NotFound(messages::DOESNT_EXISTS.to_string()))?;

    if user.confirmed_email {
        return Ok(Json(MessageResponse::new(messages::EMAIL_ALREADY_CONFIRMED)));
    }

    state.send_confirmation(&user.email, &user.username);
    Ok(Json(MessageResponse::new(messages::CHECK_YOUR_EMAIL)))
}

/// Rotates both tokens for a valid refresh token
///
/// A refresh token that does not match the stored one is treated as
/// replayed: the stored token is cleared so the session has to log in again.
pub async fn refresh_token(
    State(state): State<Arc<AppState>>,
    BearerToken(token): BearerToken,
) -> AppResult<Json<TokenResponse>> {
    let claims = state.auth.decode(&token, TokenScope::RefreshToken)?;

    let user = users::get_user_by_email(&state.db_pool, &claims.sub)
        .await?
        .ok_or_else(|| AppError::Unauthorized(messages::NOT_VALIDATE_CREDENTIALS.to_string()))?;

    if user.refresh_token.as_deref() != Some(token.as_str()) {
        users::update_refresh_token(&state.db_pool, user.id, None).await?;
        state.invalidate_user(&user.email).await;
        tracing::warn!(user_id = user.id, "Refresh token mismatch, session cleared");
        return Err(AppError::Unauthorized(messages::INVALID_TOKEN.to_string()));
    }

    Ok(Json(issue_tokens(&state, &user).await?))
}
