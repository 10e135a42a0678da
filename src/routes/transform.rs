use axum::{
    extract::{Path, State},
    routing::post,
    Extension, Json, Router,
};
use std::sync::Arc;
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    messages,
    middleware::{request_id::RequestId, CurrentUser},
    models::{PhotoLinkTransform, PhotoResponse, PhotoTransformResponse, TransformBody},
    repository::photos,
    routes::{photos::fetch_own_photo, AppState},
    services::{
        media::{qr_public_id, transformed_qr_public_id},
        photos::{publish_qr, publish_transform},
        transform::build_chain,
    },
};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/photos/:photo_id/transform", post(transform_photo))
        .route("/photos/:photo_id/qr", post(photo_qr))
        .route("/photos/:photo_id/transform/qr", post(transformed_photo_qr))
}

/// Handler for rendering a transformed copy of the caller's photo
pub async fn transform_photo(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    current: CurrentUser,
    Path(photo_id): Path<i64>,
    Json(body): Json<TransformBody>,
) -> AppResult<Json<PhotoTransformResponse>> {
    body.validate()?;
    let photo = fetch_own_photo(&state, photo_id, &current.user).await?;

    let chain = build_chain(&body);
    tracing::info!(
        request_id = %request_id,
        photo_id = photo_id,
        steps = chain.len(),
        "Transforming photo"
    );

    let url = publish_transform(state.media.as_ref(), &photo.public_id, &chain).await?;
    photos::set_image_transform(&state.db_pool, photo_id, &url).await?;

    Ok(Json(PhotoTransformResponse {
        id: photo_id,
        image_transform: url,
        detail: messages::TRANSFORM_SUCCESS.to_string(),
    }))
}

/// Handler for a QR code pointing at the original photo
pub async fn photo_qr(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Path(photo_id): Path<i64>,
) -> AppResult<Json<PhotoResponse>> {
    let photo = fetch_own_photo(&state, photo_id, &current.user).await?;

    let qr_url = publish_qr(
        state.media.as_ref(),
        &photo.image_url,
        &qr_public_id(&photo.public_id),
    )
    .await?;
    photos::set_qr_transform(&state.db_pool, photo_id, &qr_url).await?;

    tracing::info!(photo_id = photo_id, "QR code created");

    photos::get_photo_response(&state.db_pool, photo_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(messages::PHOTO_NOT_FOUND.to_string()))
}

/// Handler for a QR code pointing at the transformed rendition
pub async fn transformed_photo_qr(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Path(photo_id): Path<i64>,
) -> AppResult<Json<PhotoLinkTransform>> {
    let photo = fetch_own_photo(&state, photo_id, &current.user).await?;
    let image_transform = photo
        .image_transform
        .ok_or_else(|| AppError::InvalidInput(messages::NO_TRANSFORMED_IMAGE.to_string()))?;

    let qr_transform = publish_qr(
        state.media.as_ref(),
        &image_transform,
        &transformed_qr_public_id(&photo.public_id),
    )
    .await?;
    photos::set_qr_transform(&state.db_pool, photo_id, &qr_transform).await?;

    tracing::info!(photo_id = photo_id, "QR code for transformed image created");
    Ok(Json(PhotoLinkTransform {
        image_transform,
        qr_transform,
    }))
}
