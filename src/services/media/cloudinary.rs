/// Cloudinary media provider
///
/// Uploads and deletions go through the signed REST API; delivery URLs are
/// built locally and never require a request.
///
/// API Flow:
/// 1. Upload: POST {api}/{cloud}/image/upload (multipart, signed)
/// 2. Destroy: POST {api}/{cloud}/image/destroy (form, signed)
/// 3. Delivery: {cdn}/{cloud}/image/upload/{transformations}/v{version}/{public_id}.{format}
use chrono::Utc;
use reqwest::{multipart, Client as HttpClient};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

use crate::{
    config::Config,
    error::{AppError, AppResult},
    services::{
        media::{MediaStore, UploadedAsset},
        transform::{chain_to_path, TransformStep},
    },
};

#[derive(Clone)]
pub struct CloudinaryStore {
    http_client: HttpClient,
    cloud_name: String,
    api_key: String,
    api_secret: String,
    api_url: String,
    delivery_url: String,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    public_id: String,
    version: u64,
    secure_url: String,
}

#[derive(Debug, Deserialize)]
struct DestroyResponse {
    result: String,
}

/// Signs request parameters: sorted `key=value` pairs joined by `&`, followed
/// by the API secret, hashed with SHA-256
pub fn sign_params(params: &BTreeMap<&str, String>, api_secret: &str) -> String {
    let to_sign = params
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha256::new();
    hasher.update(to_sign.as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}

impl CloudinaryStore {
    pub fn new(
        cloud_name: String,
        api_key: String,
        api_secret: String,
        api_url: String,
        delivery_url: String,
    ) -> Self {
        Self {
            http_client: HttpClient::new(),
            cloud_name,
            api_key,
            api_secret,
            api_url: api_url.trim_end_matches('/').to_string(),
            delivery_url: delivery_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.cloudinary_name.clone(),
            config.cloudinary_api_key.clone(),
            config.cloudinary_api_secret.clone(),
            config.cloudinary_api_url.clone(),
            config.cloudinary_delivery_url.clone(),
        )
    }

    fn endpoint(&self, action: &str) -> String {
        format!("{}/{}/image/{}", self.api_url, self.cloud_name, action)
    }

    /// Parameters common to all signed calls, with the signature attached
    fn signed(&self, mut params: BTreeMap<&'static str, String>) -> BTreeMap<&'static str, String> {
        params.insert("timestamp", Utc::now().timestamp().to_string());
        let signature = sign_params(&params, &self.api_secret);
        params.insert("signature", signature);
        params.insert("api_key", self.api_key.clone());
        params
    }

    async fn send_upload(&self, file: multipart::Part, public_id: &str) -> AppResult<UploadedAsset> {
        let mut params = BTreeMap::new();
        params.insert("public_id", public_id.to_string());
        params.insert("overwrite", "true".to_string());

        let mut form = multipart::Form::new().part("file", file);
        for (key, value) in self.signed(params) {
            form = form.text(key, value);
        }

        let response = self
            .http_client
            .post(self.endpoint("upload"))
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::MediaService(format!(
                "Cloudinary upload returned status {}: {}",
                status, body
            )));
        }

        let uploaded: UploadResponse = response.json().await?;

        tracing::info!(
            public_id = %uploaded.public_id,
            version = uploaded.version,
            "Uploaded asset to Cloudinary"
        );

        Ok(UploadedAsset {
            public_id: uploaded.public_id,
            version: uploaded.version,
            secure_url: uploaded.secure_url,
        })
    }
}

#[async_trait::async_trait]
impl MediaStore for CloudinaryStore {
    async fn upload(&self, data: Vec<u8>, public_id: &str) -> AppResult<UploadedAsset> {
        let part = multipart::Part::bytes(data).file_name("upload");
        self.send_upload(part, public_id).await
    }

    async fn upload_remote(&self, url: &str, public_id: &str) -> AppResult<UploadedAsset> {
        let part = multipart::Part::text(url.to_string());
        self.send_upload(part, public_id).await
    }

    async fn destroy(&self, public_id: &str) -> AppResult<()> {
        let mut params = BTreeMap::new();
        params.insert("public_id", public_id.to_string());
        params.insert("invalidate", "true".to_string());

        let response = self
            .http_client
            .post(self.endpoint("destroy"))
            .form(&self.signed(params))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::MediaService(format!(
                "Cloudinary destroy returned status {}: {}",
                status, body
            )));
        }

        let destroyed: DestroyResponse = response.json().await?;
        tracing::debug!(public_id = %public_id, result = %destroyed.result, "Cloudinary destroy");

        Ok(())
    }

    fn delivery_url(
        &self,
        public_id: &str,
        steps: &[TransformStep],
        format: Option<&'static str>,
        version: Option<u64>,
    ) -> String {
        let mut url = format!("{}/{}/image/upload", self.delivery_url, self.cloud_name);

        if !steps.is_empty() {
            url.push('/');
            url.push_str(&chain_to_path(steps));
        }
        if let Some(version) = version {
            url.push_str(&format!("/v{}", version));
        }

        url.push('/');
        url.push_str(public_id);

        if let Some(format) = format {
            url.push('.');
            url.push_str(format);
        }

        url
    }

    fn name(&self) -> &'static str {
        "cloudinary"
    }
}
