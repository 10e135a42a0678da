use sqlx::PgPool;
use std::sync::Arc;

use crate::{
    cached,
    config::Config,
    db::{Cache, CacheKey},
    error::{AppError, AppResult},
    messages,
    models::User,
    repository::users,
    services::{auth::AuthService, email::EmailService, media::MediaStore},
};

/// Shared application state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub cache: Cache,
    pub media: Arc<dyn MediaStore>,
    pub auth: AuthService,
    pub email: Option<EmailService>,
    pub config: Arc<Config>,
}

impl AppState {
    /// Loads an account by email, going through the user cache
    pub async fn load_user(&self, email: &str) -> AppResult<User> {
        cached!(
            self.cache,
            CacheKey::User(email.to_string()),
            self.config.user_cache_ttl_seconds,
            async {
                users::get_user_by_email(&self.db_pool, email)
                    .await?
                    .ok_or_else(|| AppError::Unauthorized(messages::NOT_VALIDATE_CREDENTIALS.to_string()))
            }
        )
    }

    /// Writes the current row of an account to the cache, replacing any
    /// older copy a concurrent request may have queued
    pub async fn store_user(&self, user: &User) {
        let key = CacheKey::User(user.email.clone());
        if let Err(e) = self
            .cache
            .set(&key, user, self.config.user_cache_ttl_seconds)
            .await
        {
            tracing::warn!(error = %e, user_id = user.id, "Failed to refresh cached user");
            self.invalidate_user(&user.email).await;
        }
    }

    /// Drops the cached copy of an account after its row changed
    pub async fn invalidate_user(&self, email: &str) {
        if let Err(e) = self.cache.invalidate(&CacheKey::User(email.to_string())).await {
            tracing::warn!(error = %e, email = %email, "Failed to invalidate cached user");
        }
    }

    /// Issues an email token and sends the confirmation link without
    /// holding up the response
    pub fn send_confirmation(&self, email: &str, username: &str) {
        let Some(mailer) = self.email.clone() else {
            tracing::info!(email = %email, "Email disabled, confirmation not sent");
            return;
        };

        let token = match self.auth.create_email_token(email) {
            Ok(token) => token,
            Err(e) => {
                tracing::error!(error = %e, email = %email, "Failed to issue email token");
                return;
            }
        };

        let email = email.to_string();
        let username = username.to_string();
        tokio::spawn(async move {
            if let Err(e) = mailer.send_confirmation(&email, &username, &token).await {
                tracing::error!(error = %e, email = %email, "Failed to send confirmation email");
            }
        });
    }
}
