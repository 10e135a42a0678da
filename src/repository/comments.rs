use sqlx::{PgPool, Postgres};

use crate::{error::AppResult, models::Comment};

const COMMENT_COLUMNS: &str = "id, text, user_id, photo_id, created_at, updated_at";

pub async fn create_comment(db_pool: &PgPool, text: &str, user_id: i64, photo_id: i64) -> AppResult<Comment> {
    let comment = sqlx::query_as::<Postgres, Comment>(&format!(
        "INSERT INTO comments (text, user_id, photo_id) VALUES ($1, $2, $3) RETURNING {}",
        COMMENT_COLUMNS
    ))
    .bind(text)
    .bind(user_id)
    .bind(photo_id)
    .fetch_one(db_pool)
    .await?;

    Ok(comment)
}

/// Comments on a photo, oldest first
pub async fn list_for_photo(db_pool: &PgPool, photo_id: i64) -> AppResult<Vec<Comment>> {
    let comments = sqlx::query_as::<Postgres, Comment>(&format!(
        "SELECT {} FROM comments WHERE photo_id = $1 ORDER BY created_at, id",
        COMMENT_COLUMNS
    ))
    .bind(photo_id)
    .fetch_all(db_pool)
    .await?;

    Ok(comments)
}

pub async fn get_comment(db_pool: &PgPool, comment_id: i64) -> AppResult<Option<Comment>> {
    let comment = sqlx::query_as::<Postgres, Comment>(&format!(
        "SELECT {} FROM comments WHERE id = $1",
        COMMENT_COLUMNS
    ))
    .bind(comment_id)
    .fetch_optional(db_pool)
    .await?;

    Ok(comment)
}

pub async fn update_comment(db_pool: &PgPool, comment_id: i64, text: &str) -> AppResult<Option<Comment>> {
    let comment = sqlx::query_as::<Postgres, Comment>(&format!(
        "UPDATE comments SET text = $1, updated_at = NOW() WHERE id = $2 RETURNING {}",
        COMMENT_COLUMNS
    ))
    .bind(text)
    .bind(comment_id)
    .fetch_optional(db_pool)
    .await?;

    Ok(comment)
}

pub async fn delete_comment(db_pool: &PgPool, comment_id: i64) -> AppResult<Option<Comment>> {
    let comment = sqlx::query_as::<Postgres, Comment>(&format!(
        "DELETE FROM comments WHERE id = $1 RETURNING {}",
        COMMENT_COLUMNS
    ))
    .bind(comment_id)
    .fetch_optional(db_pool)
    .await?;

    Ok(comment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{
        photos,
        test_support::{create_test_db_pool, unique},
        users,
    };

    #[tokio::test]
    #[ignore = "requires a running PostgreSQL"]
    async fn test_comment_lifecycle() {
        let db_pool = create_test_db_pool().await;
        let user = users::create_user(&db_pool, "talker", &format!("{}@example.com", unique("c")), "hash", None)
            .await
            .unwrap();
        let mut conn = db_pool.acquire().await.unwrap();
        let photo_id = photos::insert_photo(&mut conn, user.id, "https://cdn.test/p", Some("sea"), "p")
            .await
            .unwrap();
        drop(conn);

        let first = create_comment(&db_pool, "first", user.id, photo_id).await.unwrap();
        let second = create_comment(&db_pool, "second", user.id, photo_id).await.unwrap();
        assert!(first.updated_at.is_none());

        let listed = list_for_photo(&db_pool, photo_id).await.unwrap();
        assert_eq!(listed.iter().map(|c| c.id).collect::<Vec<_>>(), vec![first.id, second.id]);

        let edited = update_comment(&db_pool, first.id, "edited").await.unwrap().unwrap();
        assert_eq!(edited.text, "edited");
        assert!(edited.updated_at.is_some());

        assert!(delete_comment(&db_pool, second.id).await.unwrap().is_some());
        assert!(get_comment(&db_pool, second.id).await.unwrap().is_none());

        users::delete_user(&db_pool, user.id).await.unwrap();
    }
}
