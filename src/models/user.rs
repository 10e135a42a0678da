use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use validator::Validate;

/// Access level of an account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role")]
pub enum Role {
    User,
    Moderator,
    Administrator,
}

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "User"),
            Role::Moderator => write!(f, "Moderator"),
            Role::Administrator => write!(f, "Administrator"),
        }
    }
}

/// A row of the `users` table
///
/// Also the payload cached in Redis for authenticated requests, so it must
/// stay serializable. Never return it from a handler; use [`UserResponse`].
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password: String,
    pub avatar: Option<String>,
    pub role: Role,
    pub refresh_token: Option<String>,
    pub confirmed_email: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Administrator
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub avatar: Option<String>,
    pub role: Role,
    pub photos_count: i64,
    pub created_at: DateTime<Utc>,
}

impl UserResponse {
    pub fn new(user: &User, photos_count: i64) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            avatar: user.avatar.clone(),
            role: user.role,
            photos_count,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct SignupRequest {
    #[validate(length(min = 5, max = 16))]
    pub username: String,
    #[validate(email, length(max = 200))]
    pub email: String,
    #[validate(length(min = 6, max = 20))]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct SignupResponse {
    pub user: UserResponse,
    pub detail: String,
}

/// OAuth2 password-flow form; `username` carries the email
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
}

impl TokenResponse {
    pub fn bearer(access_token: String, refresh_token: String) -> Self {
        Self {
            access_token,
            refresh_token,
            token_type: "bearer".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct RequestEmail {
    #[validate(email)]
    pub email: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UserUpdate {
    #[validate(email, length(max = 200))]
    pub email: String,
    #[validate(length(min = 3, max = 50))]
    pub username: String,
    #[validate(length(min = 6, max = 20))]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RoleUpdate {
    pub role: Role,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
