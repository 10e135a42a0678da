use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    messages,
    middleware::CurrentUser,
    models::{Pagination, Tag, TagRequest},
    repository::tags,
    routes::AppState,
    services::roles::ADMIN_ONLY,
};

const DEFAULT_PAGE_SIZE: i64 = 100;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/tags", post(create_tag))
        .route("/tags/", post(create_tag))
        .route("/tags/my", get(my_tags))
        .route("/tags/my/", get(my_tags))
        .route("/tags/all", get(all_tags))
        .route("/tags/all/", get(all_tags))
        .route("/tags/:tag_id", get(get_tag).put(update_tag).delete(delete_tag))
}

fn tag_not_found() -> AppError {
    AppError::NotFound(messages::NOT_FOUND.to_string())
}

fn normalized_title(body: &TagRequest) -> AppResult<String> {
    body.validate()?;
    let title = body.title.trim();
    if title.is_empty() {
        return Err(AppError::InvalidInput("Tag title must not be blank".to_string()));
    }
    Ok(title.to_string())
}

/// Handler for creating a tag owned by the caller
pub async fn create_tag(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Json(body): Json<TagRequest>,
) -> AppResult<(StatusCode, Json<Tag>)> {
    let title = normalized_title(&body)?;
    let tag = tags::create_tag(&state.db_pool, &title, current.user.id).await?;
    Ok((StatusCode::CREATED, Json(tag)))
}

/// Handler listing tags the caller created
pub async fn my_tags(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Query(page): Query<Pagination>,
) -> AppResult<Json<Vec<Tag>>> {
    let (skip, limit) = page.resolve(DEFAULT_PAGE_SIZE);
    Ok(Json(
        tags::list_user_tags(&state.db_pool, current.user.id, skip, limit).await?,
    ))
}

/// Handler listing every tag (Administrator only)
pub async fn all_tags(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Query(page): Query<Pagination>,
) -> AppResult<Json<Vec<Tag>>> {
    ADMIN_ONLY.check(&current.user)?;
    let (skip, limit) = page.resolve(DEFAULT_PAGE_SIZE);
    Ok(Json(tags::list_tags(&state.db_pool, skip, limit).await?))
}

pub async fn get_tag(
    State(state): State<Arc<AppState>>,
    _current: CurrentUser,
    Path(tag_id): Path<i64>,
) -> AppResult<Json<Tag>> {
    tags::get_tag(&state.db_pool, tag_id)
        .await?
        .map(Json)
        .ok_or_else(tag_not_found)
}

/// Handler for renaming a tag (Administrator only)
pub async fn update_tag(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Path(tag_id): Path<i64>,
    Json(body): Json<TagRequest>,
) -> AppResult<Json<Tag>> {
    ADMIN_ONLY.check(&current.user)?;
    let title = normalized_title(&body)?;

    let tag = tags::update_tag(&state.db_pool, tag_id, &title)
        .await?
        .ok_or_else(tag_not_found)?;

    tracing::info!(tag_id = tag.id, title = %tag.title, "Tag renamed");
    Ok(Json(tag))
}

/// Handler for deleting a tag (Administrator only)
pub async fn delete_tag(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Path(tag_id): Path<i64>,
) -> AppResult<Json<Tag>> {
    ADMIN_ONLY.check(&current.user)?;

    let tag = tags::delete_tag(&state.db_pool, tag_id)
        .await?
        .ok_or_else(tag_not_found)?;

    tracing::info!(tag_id = tag.id, title = %tag.title, "Tag deleted");
    Ok(Json(tag))
}
