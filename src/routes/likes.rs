use axum::{
    extract::{Path, State},
    routing::{delete, post},
    Json, Router,
};
use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    messages,
    middleware::CurrentUser,
    models::LikeResponse,
    repository::{likes, users},
    routes::{photos::fetch_photo, AppState},
    services::roles::ADMIN_OR_MODERATOR,
};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/photos/:photo_id/like", post(like_photo).delete(dislike_photo))
        .route("/photos/:photo_id/likes/:email", delete(remove_user_like))
}

async fn like_response(state: &AppState, photo_id: i64) -> AppResult<Json<LikeResponse>> {
    let likes = likes::count_likes(&state.db_pool, photo_id).await?;
    Ok(Json(LikeResponse { photo_id, likes }))
}

/// Handler for liking someone else's photo
pub async fn like_photo(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Path(photo_id): Path<i64>,
) -> AppResult<Json<LikeResponse>> {
    let photo = fetch_photo(&state, photo_id).await?;
    if photo.user_id == current.user.id {
        return Err(AppError::InvalidInput(messages::CANNOT_LIKE_OWN.to_string()));
    }

    if !likes::add_like(&state.db_pool, photo_id, current.user.id).await? {
        return Err(AppError::Conflict(messages::ALREADY_LIKED.to_string()));
    }

    tracing::debug!(photo_id = photo_id, user_id = current.user.id, "Photo liked");
    like_response(&state, photo_id).await
}

/// Handler for withdrawing the caller's like
pub async fn dislike_photo(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Path(photo_id): Path<i64>,
) -> AppResult<Json<LikeResponse>> {
    fetch_photo(&state, photo_id).await?;

    if !likes::remove_like(&state.db_pool, photo_id, current.user.id).await? {
        return Err(AppError::NotFound(messages::LIKE_NOT_FOUND.to_string()));
    }

    tracing::debug!(photo_id = photo_id, user_id = current.user.id, "Photo disliked");
    like_response(&state, photo_id).await
}

/// Handler for removing another user's like (Administrator or Moderator)
pub async fn remove_user_like(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Path((photo_id, email)): Path<(i64, String)>,
) -> AppResult<Json<LikeResponse>> {
    ADMIN_OR_MODERATOR.check(&current.user)?;
    fetch_photo(&state, photo_id).await?;

    let liker = users::get_user_by_email(&state.db_pool, &email)
        .await?
        .ok_or_else(|| AppError::NotFound(messages::DOESNT_EXISTS.to_string()))?;

    if !likes::remove_like(&state.db_pool, photo_id, liker.id).await? {
        return Err(AppError::NotFound(messages::LIKE_NOT_FOUND.to_string()));
    }

    tracing::info!(
        photo_id = photo_id,
        moderator_id = current.user.id,
        user_id = liker.id,
        "Like removed by moderator"
    );
    like_response(&state, photo_id).await
}
