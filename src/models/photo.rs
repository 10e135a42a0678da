use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::TagResponse;

/// A photo row joined with its owner's username and like count
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PhotoRecord {
    pub id: i64,
    pub image_url: String,
    pub description: Option<String>,
    pub public_id: String,
    pub image_transform: Option<String>,
    pub qr_transform: Option<String>,
    pub user_id: i64,
    pub photo_owner: String,
    pub likes: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhotoResponse {
    pub id: i64,
    pub image_url: String,
    pub image_transform: Option<String>,
    pub qr_transform: Option<String>,
    pub likes: i64,
    pub description: String,
    pub photo_owner: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub tags: Vec<TagResponse>,
}

impl PhotoResponse {
    pub fn new(record: PhotoRecord, tags: Vec<TagResponse>) -> Self {
        Self {
            id: record.id,
            image_url: record.image_url,
            image_transform: record.image_transform,
            qr_transform: record.qr_transform,
            likes: record.likes,
            description: record.description.unwrap_or_default(),
            photo_owner: record.photo_owner,
            created_at: record.created_at,
            updated_at: record.updated_at,
            tags,
        }
    }
}

/// Edit of a photo; absent fields are left unchanged
#[derive(Debug, Default, Deserialize, Validate)]
pub struct PhotoUpdate {
    #[validate(length(max = 500))]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Text fields of a multipart photo upload
#[derive(Debug, Default, Validate)]
pub struct PhotoUpload {
    #[validate(length(max = 500))]
    pub description: Option<String>,
}

impl PhotoUpload {
    /// Trims the description and drops it when blank
    pub fn new(description: Option<&str>) -> Self {
        Self {
            description: description
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(String::from),
        }
    }
}

/// `skip`/`limit` query parameters
#[derive(Debug, Default, Deserialize)]
pub struct Pagination {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

impl Pagination {
    pub const MAX_LIMIT: i64 = 100;

    /// Returns `(offset, limit)` with negative values and oversized limits clamped
    pub fn resolve(&self, default_limit: i64) -> (i64, i64) {
        let skip = self.skip.unwrap_or(0).max(0);
        let limit = self
            .limit
            .unwrap_or(default_limit)
            .clamp(1, Self::MAX_LIMIT);
        (skip, limit)
    }
}

/// Query parameters of the photo search endpoint
#[derive(Debug, Default, Deserialize)]
pub struct PhotoSearch {
    pub description: Option<String>,
    pub tag: Option<String>,
    pub username: Option<String>,
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

impl PhotoSearch {
    fn non_blank(value: &Option<String>) -> Option<&str> {
        value.as_deref().map(str::trim).filter(|v| !v.is_empty())
    }

    pub fn description(&self) -> Option<&str> {
        Self::non_blank(&self.description)
    }

    pub fn tag(&self) -> Option<&str> {
        Self::non_blank(&self.tag)
    }

    pub fn username(&self) -> Option<&str> {
        Self::non_blank(&self.username)
    }

    pub fn pagination(&self) -> Pagination {
        Pagination {
            skip: self.skip,
            limit: self.limit,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PhotoTransformResponse {
    pub id: i64,
    pub image_transform: String,
    pub detail: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PhotoLinkTransform {
    pub image_transform: String,
    pub qr_transform: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LikeResponse {
    pub photo_id: i64,
    pub likes: i64,
}
