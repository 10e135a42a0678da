use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::StatusCode,
    routing::get,
    Extension, Json, Router,
};
use chrono::Utc;
use std::sync::Arc;
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    messages,
    middleware::{request_id::RequestId, CurrentUser},
    models::{Pagination, PhotoRecord, PhotoResponse, PhotoSearch, PhotoUpdate, PhotoUpload, User},
    repository::{photos, tags},
    routes::AppState,
    services::{
        media::photo_public_id,
        photos::{check_image, destroy_photo_assets, store_photo},
        roles::{can_modify_photo, ADMIN_OR_MODERATOR},
        tags::parse_tag_titles,
    },
};

const PHOTO_BODY_LIMIT: usize = 20 * 1024 * 1024;
const DEFAULT_PAGE_SIZE: i64 = 10;

pub fn routes() -> Router<Arc<AppState>> {
    let collection = get(list_photos)
        .post(create_photo)
        .layer(DefaultBodyLimit::max(PHOTO_BODY_LIMIT));

    Router::new()
        .route("/photos", collection.clone())
        .route("/photos/", collection)
        .route("/photos/all", get(all_photos))
        .route("/photos/search", get(search_photos))
        .route(
            "/photos/:photo_id",
            get(get_photo).put(update_photo).delete(delete_photo),
        )
}

/// Fields of a multipart upload
#[derive(Debug, Default)]
pub struct UploadForm {
    pub file: Option<Vec<u8>>,
    pub description: Option<String>,
    pub tags: Vec<String>,
}

/// Reads a multipart body, taking the file from `file_field`
///
/// `tags` may repeat; each occurrence is kept for tag parsing.
pub async fn read_upload(mut multipart: Multipart, file_field: &str) -> AppResult<UploadForm> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidInput(e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if name == file_field {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::InvalidInput(e.body_text()))?;
            form.file = Some(bytes.to_vec());
            continue;
        }

        let text = field
            .text()
            .await
            .map_err(|e| AppError::InvalidInput(e.body_text()))?;
        match name.as_str() {
            "description" => form.description = Some(text),
            "tags" => form.tags.push(text),
            _ => tracing::debug!(field = %name, "Ignoring unknown multipart field"),
        }
    }

    Ok(form)
}

/// Loads a photo or fails with 404
pub async fn fetch_photo(state: &AppState, photo_id: i64) -> AppResult<PhotoRecord> {
    photos::get_photo(&state.db_pool, photo_id)
        .await?
        .ok_or_else(|| AppError::NotFound(messages::PHOTO_NOT_FOUND.to_string()))
}

/// Loads a photo the caller owns; anyone else's photo is reported missing
pub async fn fetch_own_photo(state: &AppState, photo_id: i64, user: &User) -> AppResult<PhotoRecord> {
    let photo = fetch_photo(state, photo_id).await?;
    if photo.user_id != user.id {
        return Err(AppError::NotFound(messages::PHOTO_NOT_FOUND.to_string()));
    }
    Ok(photo)
}

async fn photo_response(state: &AppState, record: PhotoRecord) -> AppResult<PhotoResponse> {
    let mut responses = photos::with_tags(&state.db_pool, vec![record]).await?;
    responses
        .pop()
        .ok_or_else(|| AppError::NotFound(messages::PHOTO_NOT_FOUND.to_string()))
}

/// Stores the photo row and its tags in one transaction
async fn save_photo(
    state: &AppState,
    user: &User,
    image_url: &str,
    description: Option<&str>,
    public_id: &str,
    titles: &[String],
) -> AppResult<i64> {
    let mut tx = state.db_pool.begin().await?;
    let photo_id = photos::insert_photo(&mut tx, user.id, image_url, description, public_id).await?;
    let photo_tags = tags::find_or_create_tags(&mut tx, titles, user.id).await?;
    tags::attach_tags(&mut tx, photo_id, &photo_tags).await?;
    tx.commit().await?;
    Ok(photo_id)
}

/// Handler for uploading a photo (multipart `image`, `description`, `tags`)
pub async fn create_photo(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    current: CurrentUser,
    multipart: Multipart,
) -> AppResult<(StatusCode, Json<PhotoResponse>)> {
    let form = read_upload(multipart, "image").await?;
    let titles = parse_tag_titles(&form.tags)?;
    let fields = PhotoUpload::new(form.description.as_deref());
    fields.validate()?;
    let data = form
        .file
        .ok_or_else(|| AppError::InvalidInput(messages::MISSING_IMAGE.to_string()))?;
    check_image(&data)?;

    let user = &current.user;
    let public_id = photo_public_id(&user.email, user.id, Utc::now().timestamp());

    tracing::info!(
        request_id = %request_id,
        user_id = user.id,
        bytes = data.len(),
        tags = titles.len(),
        "Uploading photo"
    );

    let image_url = store_photo(state.media.as_ref(), data, &public_id).await?;
    let description = fields.description.as_deref();

    let photo_id = match save_photo(&state, user, &image_url, description, &public_id, &titles).await {
        Ok(id) => id,
        Err(e) => {
            if let Err(cleanup) = state.media.destroy(&public_id).await {
                tracing::warn!(error = %cleanup, public_id = %public_id, "Failed to remove orphaned upload");
            }
            return Err(e);
        }
    };

    let record = fetch_photo(&state, photo_id).await?;
    Ok((StatusCode::CREATED, Json(photo_response(&state, record).await?)))
}

/// Handler listing the caller's photos; administrators see every photo
pub async fn list_photos(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Query(page): Query<Pagination>,
) -> AppResult<Json<Vec<PhotoResponse>>> {
    let (skip, limit) = page.resolve(DEFAULT_PAGE_SIZE);
    let owner = if current.user.is_admin() {
        None
    } else {
        Some(current.user.id)
    };

    let records = photos::list_photos(&state.db_pool, owner, skip, limit).await?;
    Ok(Json(photos::with_tags(&state.db_pool, records).await?))
}

/// Handler listing every user's photos, newest first
pub async fn all_photos(
    State(state): State<Arc<AppState>>,
    _current: CurrentUser,
    Query(page): Query<Pagination>,
) -> AppResult<Json<Vec<PhotoResponse>>> {
    let (skip, limit) = page.resolve(DEFAULT_PAGE_SIZE);
    let records = photos::list_photos(&state.db_pool, None, skip, limit).await?;
    Ok(Json(photos::with_tags(&state.db_pool, records).await?))
}

/// Handler for searching by description, tag and (for staff) owner
pub async fn search_photos(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Query(search): Query<PhotoSearch>,
) -> AppResult<Json<Vec<PhotoResponse>>> {
    if search.username().is_some() {
        ADMIN_OR_MODERATOR.check(&current.user)?;
    }

    let (skip, limit) = search.pagination().resolve(DEFAULT_PAGE_SIZE);
    let records = photos::search_photos(&state.db_pool, &search, skip, limit).await?;
    Ok(Json(photos::with_tags(&state.db_pool, records).await?))
}

/// Handler for a single photo; only administrators see other users' photos
pub async fn get_photo(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Path(photo_id): Path<i64>,
) -> AppResult<Json<PhotoResponse>> {
    let record = if current.user.is_admin() {
        fetch_photo(&state, photo_id).await?
    } else {
        fetch_own_photo(&state, photo_id, &current.user).await?
    };

    Ok(Json(photo_response(&state, record).await?))
}

/// Handler for editing the description and replacing tags
pub async fn update_photo(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Path(photo_id): Path<i64>,
    Json(body): Json<PhotoUpdate>,
) -> AppResult<Json<PhotoResponse>> {
    body.validate()?;
    let titles = parse_tag_titles(&body.tags)?;

    let record = fetch_photo(&state, photo_id).await?;
    if !can_modify_photo(&current.user, record.user_id) {
        return Err(AppError::Forbidden(messages::PERMISSION_DENIED.to_string()));
    }

    let mut tx = state.db_pool.begin().await?;
    photos::update_description(&mut tx, photo_id, body.description.as_deref()).await?;
    if !titles.is_empty() {
        let photo_tags = tags::find_or_create_tags(&mut tx, &titles, current.user.id).await?;
        tags::replace_photo_tags(&mut tx, photo_id, &photo_tags).await?;
    }
    tx.commit().await?;

    tracing::info!(photo_id = photo_id, user_id = current.user.id, "Photo updated");

    let record = fetch_photo(&state, photo_id).await?;
    Ok(Json(photo_response(&state, record).await?))
}

/// Handler for deleting a photo and all its media assets
pub async fn delete_photo(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Path(photo_id): Path<i64>,
) -> AppResult<Json<PhotoResponse>> {
    let record = fetch_photo(&state, photo_id).await?;
    if !can_modify_photo(&current.user, record.user_id) {
        return Err(AppError::Forbidden(messages::PERMISSION_DENIED.to_string()));
    }

    let public_id = record.public_id.clone();
    let response = photo_response(&state, record).await?;

    photos::delete_photo(&state.db_pool, photo_id).await?;
    let failures = destroy_photo_assets(state.media.as_ref(), &public_id).await;

    tracing::info!(
        photo_id = photo_id,
        user_id = current.user.id,
        asset_failures = failures,
        "Photo deleted"
    );
    Ok(Json(response))
}
