use sqlx::{PgPool, Postgres};

use crate::{
    error::{AppError, AppResult},
    messages,
    models::{Role, User},
    repository::is_unique_violation,
};

const USER_COLUMNS: &str = "id, username, email, password, avatar, role, refresh_token, \
                            confirmed_email, is_active, created_at";

/// Advisory lock key serializing account creation
const CREATE_USER_LOCK: i64 = 0x7068_6f74_6f73;

pub async fn get_user_by_email(db_pool: &PgPool, email: &str) -> AppResult<Option<User>> {
    let user = sqlx::query_as::<Postgres, User>(&format!(
        "SELECT {} FROM users WHERE lower(email) = lower($1)",
        USER_COLUMNS
    ))
    .bind(email)
    .fetch_optional(db_pool)
    .await?;

    Ok(user)
}

pub async fn get_user_by_username(db_pool: &PgPool, username: &str) -> AppResult<Option<User>> {
    let user = sqlx::query_as::<Postgres, User>(&format!(
        "SELECT {} FROM users WHERE username = $1 ORDER BY id LIMIT 1",
        USER_COLUMNS
    ))
    .bind(username)
    .fetch_optional(db_pool)
    .await?;

    Ok(user)
}

/// Inserts a new account
///
/// The very first account becomes an Administrator, every later one a User.
/// Inserts hold a transaction-scoped advisory lock so two concurrent first
/// signups cannot both see an empty table.
pub async fn create_user(
    db_pool: &PgPool,
    username: &str,
    email: &str,
    password_hash: &str,
    avatar: Option<&str>,
) -> AppResult<User> {
    let mut tx = db_pool.begin().await?;
    sqlx::query("SELECT pg_advisory_xact_lock($1)")
        .bind(CREATE_USER_LOCK)
        .execute(&mut *tx)
        .await?;

    let result = sqlx::query_as::<Postgres, User>(&format!(
        r#"
        INSERT INTO users (username, email, password, avatar, role)
        VALUES (
            $1, $2, $3, $4,
            CASE WHEN EXISTS (SELECT 1 FROM users)
                THEN 'User'::user_role
                ELSE 'Administrator'::user_role
            END
        )
        RETURNING {}
        "#,
        USER_COLUMNS
    ))
    .bind(username)
    .bind(email)
    .bind(password_hash)
    .bind(avatar)
    .fetch_one(&mut *tx)
    .await;

    match result {
        Ok(user) => {
            tx.commit().await?;
            tracing::info!(user_id = user.id, email = %user.email, role = %user.role, "Created user");
            Ok(user)
        }
        Err(e) if is_unique_violation(&e) => {
            Err(AppError::Conflict(messages::ALREADY_EXISTS.to_string()))
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn update_refresh_token(
    db_pool: &PgPool,
    user_id: i64,
    refresh_token: Option<&str>,
) -> AppResult<()> {
    sqlx::query("UPDATE users SET refresh_token = $1 WHERE id = $2")
        .bind(refresh_token)
        .bind(user_id)
        .execute(db_pool)
        .await?;

    Ok(())
}

pub async fn confirm_email(db_pool: &PgPool, user_id: i64) -> AppResult<User> {
    let user = sqlx::query_as::<Postgres, User>(&format!(
        "UPDATE users SET confirmed_email = TRUE WHERE id = $1 RETURNING {}",
        USER_COLUMNS
    ))
    .bind(user_id)
    .fetch_one(db_pool)
    .await?;

    Ok(user)
}

pub async fn update_avatar(db_pool: &PgPool, user_id: i64, avatar: &str) -> AppResult<User> {
    let user = sqlx::query_as::<Postgres, User>(&format!(
        "UPDATE users SET avatar = $1 WHERE id = $2 RETURNING {}",
        USER_COLUMNS
    ))
    .bind(avatar)
    .bind(user_id)
    .fetch_one(db_pool)
    .await?;

    Ok(user)
}

/// Replaces the account's username, email and password hash
pub async fn update_account(
    db_pool: &PgPool,
    user_id: i64,
    username: &str,
    email: &str,
    password_hash: &str,
) -> AppResult<User> {
    let result = sqlx::query_as::<Postgres, User>(&format!(
        "UPDATE users SET username = $1, email = $2, password = $3 WHERE id = $4 RETURNING {}",
        USER_COLUMNS
    ))
    .bind(username)
    .bind(email)
    .bind(password_hash)
    .bind(user_id)
    .fetch_one(db_pool)
    .await;

    match result {
        Ok(user) => Ok(user),
        Err(e) if is_unique_violation(&e) => {
            Err(AppError::Conflict(messages::ALREADY_EXISTS.to_string()))
        }
        Err(e) => Err(e.into()),
    }
}

/// Deletes an account together with its photos, tags and comments
pub async fn delete_user(db_pool: &PgPool, user_id: i64) -> AppResult<()> {
    sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(user_id)
        .execute(db_pool)
        .await?;

    Ok(())
}

/// Deactivates an account and drops its refresh token
pub async fn ban_user(db_pool: &PgPool, user_id: i64) -> AppResult<User> {
    let user = sqlx::query_as::<Postgres, User>(&format!(
        "UPDATE users SET is_active = FALSE, refresh_token = NULL WHERE id = $1 RETURNING {}",
        USER_COLUMNS
    ))
    .bind(user_id)
    .fetch_one(db_pool)
    .await?;

    Ok(user)
}

pub async fn set_role(db_pool: &PgPool, user_id: i64, role: Role) -> AppResult<User> {
    let user = sqlx::query_as::<Postgres, User>(&format!(
        "UPDATE users SET role = $1 WHERE id = $2 RETURNING {}",
        USER_COLUMNS
    ))
    .bind(role)
    .bind(user_id)
    .fetch_one(db_pool)
    .await?;

    Ok(user)
}

pub async fn count_photos(db_pool: &PgPool, user_id: i64) -> AppResult<i64> {
    let count = sqlx::query_scalar::<Postgres, i64>("SELECT COUNT(*) FROM photos WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(db_pool)
        .await?;

    Ok(count)
}
