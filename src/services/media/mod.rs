//! Media storage abstraction
//!
//! Photos, QR codes and transformed renditions live in an external media
//! service. Handlers and services talk to it only through [`MediaStore`], so
//! the backing provider can be swapped (or stubbed in tests).

use serde::{Deserialize, Serialize};

use crate::{error::AppResult, services::transform::TransformStep};

pub mod cloudinary;

pub use cloudinary::CloudinaryStore;

/// Folder holding QR codes that point at original photos
pub const QR_FOLDER: &str = "PhotoshareApp_qrcode";
/// Folder holding transformed renditions and their QR codes
pub const TRANSFORM_FOLDER: &str = "PhotoshareApp_tr";
/// Folder holding user avatars
pub const AVATAR_FOLDER: &str = "PhotoshareApp_avatars";

/// An asset stored by the media service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadedAsset {
    pub public_id: String,
    pub version: u64,
    pub secure_url: String,
}

/// Trait for media storage providers
///
/// Public ids may contain `/`, which places the asset in a folder.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait MediaStore: Send + Sync {
    /// Uploads raw image bytes, overwriting any asset with the same id
    async fn upload(&self, data: Vec<u8>, public_id: &str) -> AppResult<UploadedAsset>;

    /// Asks the provider to fetch and store the image found at `url`
    async fn upload_remote(&self, url: &str, public_id: &str) -> AppResult<UploadedAsset>;

    /// Removes an asset; missing assets are not an error
    async fn destroy(&self, public_id: &str) -> AppResult<()>;

    /// Builds a delivery URL applying the given transformation chain
    fn delivery_url(
        &self,
        public_id: &str,
        steps: &[TransformStep],
        format: Option<&'static str>,
        version: Option<u64>,
    ) -> String;

    /// Provider name for logging and debugging
    fn name(&self) -> &'static str;
}

/// Public id for a freshly uploaded photo
pub fn photo_public_id(email: &str, user_id: i64, timestamp: i64) -> String {
    format!("{}_{}_{}", email, user_id, timestamp)
}

/// Public id of the QR code that encodes a photo's URL
pub fn qr_public_id(photo_public_id: &str) -> String {
    format!("{}/{}_qr", QR_FOLDER, photo_public_id)
}

/// Public id of a photo's transformed rendition
pub fn transformed_public_id(photo_public_id: &str) -> String {
    format!("{}/{}", TRANSFORM_FOLDER, photo_public_id)
}

/// Public id of the QR code that encodes a transformed rendition's URL
pub fn transformed_qr_public_id(photo_public_id: &str) -> String {
    format!("{}/{}_qr", TRANSFORM_FOLDER, photo_public_id)
}

/// Public id of a user's avatar
pub fn avatar_public_id(username: &str) -> String {
    format!("{}/{}", AVATAR_FOLDER, username)
}

/// Every asset derived from a photo, the original included
pub fn derived_public_ids(photo_public_id: &str) -> Vec<String> {
    vec![
        photo_public_id.to_string(),
        qr_public_id(photo_public_id),
        transformed_public_id(photo_public_id),
        transformed_qr_public_id(photo_public_id),
    ]
}
