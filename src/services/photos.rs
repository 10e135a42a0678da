//! Media-side work for photos: storing uploads, publishing transformed
//! renditions and QR codes, and cleaning up every derived asset.

use image::ImageFormat;

use crate::{
    error::{AppError, AppResult},
    messages,
    services::{
        media::{self, MediaStore},
        qr::qr_png,
        transform::{TransformParam, TransformStep},
    },
};

/// Side of the square thumbnails used for QR codes and avatars
pub const THUMBNAIL_SIDE: u32 = 250;

fn fill_step() -> TransformStep {
    TransformStep::new().with(TransformParam::Crop, "fill")
}

fn thumbnail_step() -> TransformStep {
    fill_step()
        .with(TransformParam::Height, THUMBNAIL_SIDE.to_string())
        .with(TransformParam::Width, THUMBNAIL_SIDE.to_string())
}

/// Rejects anything that is not a PNG, JPEG, WEBP or GIF image
pub fn check_image(data: &[u8]) -> AppResult<ImageFormat> {
    if data.is_empty() {
        return Err(AppError::InvalidInput(messages::MISSING_IMAGE.to_string()));
    }
    match image::guess_format(data) {
        Ok(format @ (ImageFormat::Png | ImageFormat::Jpeg | ImageFormat::WebP | ImageFormat::Gif)) => {
            Ok(format)
        }
        _ => Err(AppError::InvalidInput(messages::UNSUPPORTED_IMAGE.to_string())),
    }
}

/// Uploads a new photo and returns its fill delivery URL
pub async fn store_photo(store: &dyn MediaStore, data: Vec<u8>, public_id: &str) -> AppResult<String> {
    check_image(&data)?;
    let asset = store.upload(data, public_id).await?;
    Ok(store.delivery_url(&asset.public_id, &[fill_step()], None, Some(asset.version)))
}

/// Uploads an avatar and returns its thumbnail URL
pub async fn store_avatar(store: &dyn MediaStore, data: Vec<u8>, username: &str) -> AppResult<String> {
    check_image(&data)?;
    let asset = store.upload(data, &media::avatar_public_id(username)).await?;
    Ok(store.delivery_url(&asset.public_id, &[thumbnail_step()], None, Some(asset.version)))
}

/// Asks the media service to store the rendition described by `chain`
///
/// Returns the delivery URL of the rendition, computed from the original.
pub async fn publish_transform(
    store: &dyn MediaStore,
    photo_public_id: &str,
    chain: &[TransformStep],
) -> AppResult<String> {
    if chain.is_empty() {
        return Err(AppError::InvalidInput(messages::NO_TRANSFORMATION.to_string()));
    }

    let url = store.delivery_url(photo_public_id, chain, Some("png"), None);
    store
        .upload_remote(&url, &media::transformed_public_id(photo_public_id))
        .await?;

    tracing::info!(
        public_id = %photo_public_id,
        steps = chain.len(),
        "Published transformed image"
    );
    Ok(url)
}

/// Encodes `target_url` as a QR code, stores it under `qr_public_id` and
/// returns the thumbnail URL of the stored code
pub async fn publish_qr(store: &dyn MediaStore, target_url: &str, qr_public_id: &str) -> AppResult<String> {
    let data = target_url.to_string();
    let png = tokio::task::spawn_blocking(move || qr_png(&data))
        .await
        .map_err(|e| AppError::Internal(format!("QR task failed: {}", e)))??;

    let asset = store.upload(png, qr_public_id).await?;
    Ok(store.delivery_url(
        &asset.public_id,
        &[thumbnail_step()],
        Some("png"),
        Some(asset.version),
    ))
}

/// Destroys a photo and every asset derived from it
///
/// Failures are logged and counted, never returned; most photos have no
/// QR code or rendition to delete.
pub async fn destroy_photo_assets(store: &dyn MediaStore, photo_public_id: &str) -> usize {
    let mut failures = 0;
    for public_id in media::derived_public_ids(photo_public_id) {
        if let Err(e) = store.destroy(&public_id).await {
            failures += 1;
            tracing::warn!(
                error = %e,
                public_id = %public_id,
                provider = store.name(),
                "Failed to destroy media asset"
            );
        }
    }
    failures
}
