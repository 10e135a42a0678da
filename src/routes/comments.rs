use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use std::sync::Arc;
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    messages,
    middleware::CurrentUser,
    models::{Comment, CommentRequest},
    repository::{comments, photos},
    routes::AppState,
    services::roles::ADMIN_OR_MODERATOR,
};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/photos/:photo_id/comments",
            get(list_comments).post(create_comment),
        )
        .route(
            "/comments/:comment_id",
            get(get_comment).put(update_comment).delete(delete_comment),
        )
}

fn comment_not_found() -> AppError {
    AppError::NotFound(messages::COMM_NOT_FOUND.to_string())
}

async fn ensure_photo_exists(state: &AppState, photo_id: i64) -> AppResult<()> {
    photos::get_photo(&state.db_pool, photo_id)
        .await?
        .map(|_| ())
        .ok_or_else(|| AppError::NotFound(messages::NO_POST_ID.to_string()))
}

/// Handler for commenting on a photo
pub async fn create_comment(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Path(photo_id): Path<i64>,
    Json(body): Json<CommentRequest>,
) -> AppResult<(StatusCode, Json<Comment>)> {
    body.validate()?;
    ensure_photo_exists(&state, photo_id).await?;

    let comment = comments::create_comment(&state.db_pool, &body.text, current.user.id, photo_id).await?;
    tracing::debug!(comment_id = comment.id, photo_id = photo_id, "Comment created");

    Ok((StatusCode::CREATED, Json(comment)))
}

/// Handler listing a photo's comments, oldest first
pub async fn list_comments(
    State(state): State<Arc<AppState>>,
    _current: CurrentUser,
    Path(photo_id): Path<i64>,
) -> AppResult<Json<Vec<Comment>>> {
    ensure_photo_exists(&state, photo_id).await?;
    Ok(Json(comments::list_for_photo(&state.db_pool, photo_id).await?))
}

pub async fn get_comment(
    State(state): State<Arc<AppState>>,
    _current: CurrentUser,
    Path(comment_id): Path<i64>,
) -> AppResult<Json<Comment>> {
    comments::get_comment(&state.db_pool, comment_id)
        .await?
        .map(Json)
        .ok_or_else(comment_not_found)
}

/// Handler for editing a comment; only its author may
pub async fn update_comment(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Path(comment_id): Path<i64>,
    Json(body): Json<CommentRequest>,
) -> AppResult<Json<Comment>> {
    body.validate()?;

    let comment = comments::get_comment(&state.db_pool, comment_id)
        .await?
        .ok_or_else(comment_not_found)?;
    if comment.user_id != current.user.id {
        return Err(AppError::Forbidden(messages::PERMISSION_DENIED.to_string()));
    }

    comments::update_comment(&state.db_pool, comment_id, &body.text)
        .await?
        .map(Json)
        .ok_or_else(comment_not_found)
}

/// Handler for removing a comment (Administrator or Moderator)
pub async fn delete_comment(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Path(comment_id): Path<i64>,
) -> AppResult<Json<Comment>> {
    ADMIN_OR_MODERATOR.check(&current.user)?;

    let comment = comments::delete_comment(&state.db_pool, comment_id)
        .await?
        .ok_or_else(comment_not_found)?;

    tracing::info!(comment_id = comment.id, moderator_id = current.user.id, "Comment deleted");
    Ok(Json(comment))
}
