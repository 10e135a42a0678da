use sqlx::{PgPool, Postgres};

use crate::error::AppResult;

/// Records a like; returns false if the user already liked the photo
pub async fn add_like(db_pool: &PgPool, photo_id: i64, user_id: i64) -> AppResult<bool> {
    let result = sqlx::query(
        r#"
        INSERT INTO photo_likes (photo_id, user_id)
        VALUES ($1, $2)
        ON CONFLICT (photo_id, user_id) DO NOTHING
        "#,
    )
    .bind(photo_id)
    .bind(user_id)
    .execute(db_pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Removes a like; returns false if there was none
pub async fn remove_like(db_pool: &PgPool, photo_id: i64, user_id: i64) -> AppResult<bool> {
    let result = sqlx::query("DELETE FROM photo_likes WHERE photo_id = $1 AND user_id = $2")
        .bind(photo_id)
        .bind(user_id)
        .execute(db_pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn count_likes(db_pool: &PgPool, photo_id: i64) -> AppResult<i64> {
    let count = sqlx::query_scalar::<Postgres, i64>(
        "SELECT COUNT(*) FROM photo_likes WHERE photo_id = $1",
    )
    .bind(photo_id)
    .fetch_one(db_pool)
    .await?;

    Ok(count)
}
