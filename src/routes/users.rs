use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    routing::{get, patch, put},
    Json, Router,
};
use std::sync::Arc;
use validator::Validate;

use crate::{
    db::CacheKey,
    error::{AppError, AppResult},
    messages,
    middleware::CurrentUser,
    models::{MessageResponse, Role, RoleUpdate, User, UserResponse, UserUpdate},
    repository::{photos, users},
    routes::{photos::read_upload, AppState},
    services::{
        auth::{hash_password, normalize_email},
        photos::{destroy_photo_assets, store_avatar},
        roles::ADMIN_ONLY,
    },
};

const AVATAR_BODY_LIMIT: usize = 5 * 1024 * 1024;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/users/me", get(me))
        .route("/users/profile/:username", get(profile))
        .route(
            "/users/avatar",
            patch(update_avatar).layer(DefaultBodyLimit::max(AVATAR_BODY_LIMIT)),
        )
        .route("/users", put(update_account).delete(delete_account))
        .route("/users/", put(update_account).delete(delete_account))
        .route("/users/ban/:email", patch(ban_user))
        .route("/users/role/:email", patch(change_role))
}

async fn profile_response(state: &AppState, user: &User) -> AppResult<UserResponse> {
    let photos_count = users::count_photos(&state.db_pool, user.id).await?;
    Ok(UserResponse::new(user, photos_count))
}

/// Handler for the caller's own profile
pub async fn me(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
) -> AppResult<Json<UserResponse>> {
    Ok(Json(profile_response(&state, &current.user).await?))
}

/// Handler for another user's public profile
pub async fn profile(
    State(state): State<Arc<AppState>>,
    _current: CurrentUser,
    Path(username): Path<String>,
) -> AppResult<Json<UserResponse>> {
    let user = users::get_user_by_username(&state.db_pool, &username)
        .await?
        .ok_or_else(|| AppError::NotFound(messages::NOT_FOUND.to_string()))?;

    Ok(Json(profile_response(&state, &user).await?))
}

/// Handler for uploading a new avatar (multipart field `file`)
pub async fn update_avatar(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    multipart: Multipart,
) -> AppResult<Json<UserResponse>> {
    let upload = read_upload(multipart, "file").await?;
    let data = upload
        .file
        .ok_or_else(|| AppError::InvalidInput(messages::MISSING_IMAGE.to_string()))?;

    let avatar_url = store_avatar(state.media.as_ref(), data, &current.user.username).await?;
    let user = users::update_avatar(&state.db_pool, current.user.id, &avatar_url).await?;
    state.store_user(&user).await;

    tracing::info!(user_id = user.id, "Avatar updated");
    Ok(Json(profile_response(&state, &user).await?))
}

/// Handler for replacing the caller's username, email and password
pub async fn update_account(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Json(body): Json<UserUpdate>,
) -> AppResult<Json<UserResponse>> {
    body.validate()?;
    let email = normalize_email(&body.email);

    if email != current.user.email
        && users::get_user_by_email(&state.db_pool, &email)
            .await?
            .is_some()
    {
        return Err(AppError::Conflict(messages::ALREADY_EXISTS.to_string()));
    }

    let password_hash = hash_password(body.password).await?;
    let user = users::update_account(
        &state.db_pool,
        current.user.id,
        &body.username,
        &email,
        &password_hash,
    )
    .await?;

    if user.email != current.user.email {
        state.invalidate_user(&current.user.email).await;
    }
    state.store_user(&user).await;

    tracing::info!(user_id = user.id, "Account updated");
    Ok(Json(profile_response(&state, &user).await?))
}

/// Handler for deleting the caller's account and everything it owns
pub async fn delete_account(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
) -> AppResult<Json<UserResponse>> {
    let response = profile_response(&state, &current.user).await?;

    let owned = photos::public_ids_of_user(&state.db_pool, current.user.id).await?;
    users::delete_user(&state.db_pool, current.user.id).await?;
    state.invalidate_user(&current.user.email).await;

    for public_id in &owned {
        destroy_photo_assets(state.media.as_ref(), public_id).await;
    }
    if let Err(e) = state
        .cache
        .set_marker(
            &CacheKey::Blacklist(current.claims.jti.clone()),
            current.claims.remaining_secs(),
        )
        .await
    {
        tracing::warn!(error = %e, "Failed to revoke token of deleted account");
    }

    tracing::info!(user_id = current.user.id, photos = owned.len(), "Account deleted");
    Ok(Json(response))
}

/// Handler for banning an account (Administrator only)
pub async fn ban_user(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Path(email): Path<String>,
) -> AppResult<Json<MessageResponse>> {
    ADMIN_ONLY.check(&current.user)?;

    let target = users::get_user_by_email(&state.db_pool, &email)
        .await?
        .ok_or_else(|| AppError::NotFound(messages::DOESNT_EXISTS.to_string()))?;

    if !target.is_active {
        return Err(AppError::Conflict(messages::USER_ALREADY_NOT_ACTIVE.to_string()));
    }

    let banned = users::ban_user(&state.db_pool, target.id).await?;
    state.store_user(&banned).await;

    tracing::info!(admin_id = current.user.id, user_id = target.id, "User banned");
    Ok(Json(MessageResponse::new(messages::USER_BANNED)))
}

/// Handler for changing an account's role (Administrator only)
pub async fn change_role(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Path(email): Path<String>,
    Json(body): Json<RoleUpdate>,
) -> AppResult<Json<MessageResponse>> {
    ADMIN_ONLY.check(&current.user)?;

    let target = users::get_user_by_email(&state.db_pool, &email)
        .await?
        .ok_or_else(|| AppError::NotFound(messages::DOESNT_EXISTS.to_string()))?;

    if target.role == Role::Administrator {
        return Err(AppError::Forbidden(messages::ADMIN_ROLE_LOCKED.to_string()));
    }
    if target.role == body.role {
        return Err(AppError::Conflict(messages::USER_ROLE_EXISTS.to_string()));
    }

    let updated = users::set_role(&state.db_pool, target.id, body.role).await?;
    state.store_user(&updated).await;

    tracing::info!(
        admin_id = current.user.id,
        user_id = updated.id,
        role = %updated.role,
        "User role changed"
    );
    Ok(Json(MessageResponse::new(format!(
        "{} {}",
        messages::USER_CHANGE_ROLE_TO,
        updated.role
    ))))
}
