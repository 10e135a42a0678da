use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::{
    config::Config,
    error::{AppError, AppResult},
    messages,
};

/// What a token may be used for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenScope {
    AccessToken,
    RefreshToken,
    EmailToken,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Account email
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
    /// Unique token id, used for revocation
    pub jti: String,
    pub scope: TokenScope,
}

impl Claims {
    /// Seconds until expiry, never negative
    pub fn remaining_secs(&self) -> u64 {
        (self.exp - Utc::now().timestamp()).max(0) as u64
    }
}

/// Issues and verifies HS256 tokens for every scope
#[derive(Clone)]
pub struct AuthService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
    email_ttl: Duration,
}

impl AuthService {
    pub fn new(secret: &str, access_ttl: Duration, refresh_ttl: Duration, email_ttl: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            access_ttl,
            refresh_ttl,
            email_ttl,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            &config.secret_key,
            Duration::minutes(config.access_token_ttl_minutes),
            Duration::days(config.refresh_token_ttl_days),
            Duration::days(config.email_token_ttl_days),
        )
    }

    fn create_token(&self, email: &str, scope: TokenScope, ttl: Duration) -> AppResult<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: email.to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            jti: Uuid::new_v4().to_string(),
            scope,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("Token encoding failed: {}", e)))
    }

    pub fn create_access_token(&self, email: &str) -> AppResult<String> {
        self.create_token(email, TokenScope::AccessToken, self.access_ttl)
    }

    pub fn create_refresh_token(&self, email: &str) -> AppResult<String> {
        self.create_token(email, TokenScope::RefreshToken, self.refresh_ttl)
    }

    pub fn create_email_token(&self, email: &str) -> AppResult<String> {
        self.create_token(email, TokenScope::EmailToken, self.email_ttl)
    }

    /// Verifies signature, expiry and scope
    pub fn decode(&self, token: &str, expected: TokenScope) -> AppResult<Claims> {
        let validation = Validation::new(Algorithm::HS256);
        let data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            tracing::debug!(error = %e, scope = ?expected, "Token rejected");
            AppError::Unauthorized(messages::NOT_VALIDATE_CREDENTIALS.to_string())
        })?;

        if data.claims.scope != expected {
            return Err(AppError::Unauthorized(messages::INVALID_SCOPE.to_string()));
        }

        Ok(data.claims)
    }

    /// Extracts the email from a confirmation link token
    pub fn email_from_token(&self, token: &str) -> AppResult<String> {
        self.decode(token, TokenScope::EmailToken)
            .map(|claims| claims.sub)
            .map_err(|_| AppError::InvalidInput(messages::FAIL_EMAIL_VERIFICATION.to_string()))
    }
}

/// Hashes a password with bcrypt on the blocking pool
pub async fn hash_password(password: String) -> AppResult<String> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, bcrypt::DEFAULT_COST))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
        .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
}

/// Checks a password against a stored bcrypt hash
pub async fn verify_password(password: String, hash: String) -> AppResult<bool> {
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
        .or(Ok(false))
}

/// Canonical form in which emails are stored and looked up
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Gravatar image URL for an email (SHA-256 of the normalized address)
pub fn gravatar_url(email: &str) -> String {
    let normalized = normalize_email(email);
    let digest = Sha256::digest(normalized.as_bytes());
    format!("https://www.gravatar.com/avatar/{}", hex::encode(digest))
}

/// Pulls the token out of an `Authorization: Bearer <token>` header value
pub fn bearer_token(header_value: &str) -> Option<&str> {
    let (scheme, token) = header_value.split_once(' ')?;
    if scheme.eq_ignore_ascii_case("bearer") && !token.trim().is_empty() {
        Some(token.trim())
    } else {
        None
    }
}
